// 该文件是 Jiangbei （江北东风） 项目的一部分。
// src/detect.rs - 检测结果与后处理管线
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
  labels::LabelTable,
  model::{Network, NormalizedFrame},
  tensor::{DecodeError, PredTensor},
};

pub mod decode;
pub mod nms;
pub mod rescale;

/// 默认置信度阈值
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// 检测结果。
///
/// 边界框统一使用角点形式 (xmin, xmax, ymin, ymax)：
/// 宽度沿 x 轴，高度沿 y 轴，解码时从中心形式一次性转换，
/// 之后所有阶段不再变换表示形式。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  /// 类别名称
  pub label: String,
  /// 物体置信度，(0, 1]
  pub confidence: f32,
  pub xmin: f32,
  pub xmax: f32,
  pub ymin: f32,
  pub ymax: f32,
}

impl Detection {
  /// 将边界框裁剪到图像范围 [0, dim-1]，上报或绘制前调用
  pub fn clamp_to(&self, width: u32, height: u32) -> Detection {
    Detection {
      label: self.label.clone(),
      confidence: self.confidence,
      xmin: self.xmin.clamp(0.0, width as f32 - 1.0),
      xmax: self.xmax.clamp(0.0, width as f32 - 1.0),
      ymin: self.ymin.clamp(0.0, height as f32 - 1.0),
      ymax: self.ymax.clamp(0.0, height as f32 - 1.0),
    }
  }
}

/// 后处理管线: 解码 → 非极大值抑制 → 坐标缩放。
///
/// 组合顺序固定，抑制必须在单一坐标系（模型输入空间）内完成
/// 之后再缩放到原图空间。
pub fn postprocess(
  tensors: &[PredTensor],
  labels: &LabelTable,
  input_size: u32,
  orig_size: (u32, u32),
  threshold: f32,
  max_overlap: f32,
) -> Result<Vec<Detection>, DecodeError> {
  let boxes = decode::decode(tensors, labels, input_size, threshold)?;
  let boxes = nms::suppress(boxes, max_overlap);
  let boxes = rescale::rescale(boxes, input_size, orig_size);
  debug!("后处理完成，共 {} 个检测框", boxes.len());
  Ok(boxes)
}

#[derive(Error, Debug)]
pub enum PipelineError<E> {
  #[error("模型推理失败: {0}")]
  Network(E),
  #[error("预测解码失败: {0}")]
  Decode(#[from] DecodeError),
}

/// 完整检测管线：预处理 → 推理 → 后处理。
///
/// 推理能力在构造时注入，管线本身不持有全局状态，
/// 每次调用都是独立的纯计算。
pub struct Pipeline<N> {
  network: N,
  labels: LabelTable,
  threshold: f32,
  max_overlap: f32,
}

impl<N: Network> Pipeline<N> {
  pub fn new(network: N, labels: LabelTable) -> Self {
    Pipeline {
      network,
      labels,
      threshold: DEFAULT_THRESHOLD,
      max_overlap: nms::DEFAULT_MAX_OVERLAP,
    }
  }

  /// 置信度阈值 (0.0 - 1.0)，严格大于才保留
  pub fn with_threshold(mut self, threshold: f32) -> Self {
    self.threshold = threshold;
    self
  }

  /// NMS IoU 阈值 (0.0 - 1.0)
  pub fn with_max_overlap(mut self, max_overlap: f32) -> Self {
    self.max_overlap = max_overlap;
    self
  }

  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }

  /// 对一张图像执行完整检测，返回原图坐标系下的检测框
  pub fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, PipelineError<N::Error>> {
    let orig_size = image.dimensions();
    let input_size = self.network.input_size();

    debug!("预处理图像: {:?} -> {}x{}", orig_size, input_size, input_size);
    let frame = NormalizedFrame::from_image(image, input_size);

    let tensors = self
      .network
      .forward(&frame)
      .map_err(PipelineError::Network)?;

    let boxes = postprocess(
      &tensors,
      &self.labels,
      input_size,
      orig_size,
      self.threshold,
      self.max_overlap,
    )?;

    Ok(boxes)
  }
}
