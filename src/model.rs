// 该文件是 Jiangbei （江北东风） 项目的一部分。
// src/model.rs - 模型推理接口与输入预处理
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::RgbImage;
use image::imageops::FilterType;

use crate::tensor::PredTensor;

/// 默认模型输入尺寸
pub const DEFAULT_INPUT_SIZE: u32 = 512;

/// 归一化的模型输入帧: size × size, NHWC, 像素值 [0, 1]
#[derive(Debug, Clone)]
pub struct NormalizedFrame {
  size: u32,
  data: Box<[f32]>,
}

impl NormalizedFrame {
  /// 缩放到模型输入尺寸（正方形）并将像素归一化到 [0, 1]
  pub fn from_image(image: &RgbImage, size: u32) -> Self {
    let resized = image::imageops::resize(image, size, size, FilterType::Triangle);
    let data = resized
      .into_raw()
      .into_iter()
      .map(|v| v as f32 / 255.0)
      .collect();

    NormalizedFrame { size, data }
  }

  pub fn size(&self) -> u32 {
    self.size
  }

  pub fn as_nhwc(&self) -> &[f32] {
    &self.data
  }
}

/// 推理能力接口，由具体后端实现并在构造管线时注入。
///
/// 后端加载权重、执行前向传播，对本库而言是不透明函数：
/// 输入归一化帧，输出三个尺度的原始预测张量（粗到细）。
/// 实现的构造函数负责显式初始化，失败时返回自身的加载错误。
pub trait Network {
  type Error: std::error::Error + Send + Sync + 'static;

  /// 模型输入边长（像素）
  fn input_size(&self) -> u32;

  fn forward(&self, frame: &NormalizedFrame) -> Result<Vec<PredTensor>, Self::Error>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalized_frame_has_unit_range() {
    let mut image = RgbImage::new(100, 60);
    for pixel in image.pixels_mut() {
      *pixel = image::Rgb([255, 128, 0]);
    }

    let frame = NormalizedFrame::from_image(&image, 32);
    assert_eq!(frame.size(), 32);
    assert_eq!(frame.as_nhwc().len(), 32 * 32 * 3);
    assert!(frame.as_nhwc().iter().all(|&v| (0.0..=1.0).contains(&v)));
    // 纯色图像缩放后仍为同一颜色
    assert!((frame.as_nhwc()[0] - 1.0).abs() < 1e-6);
    assert!(frame.as_nhwc()[2].abs() < 1e-6);
  }
}
