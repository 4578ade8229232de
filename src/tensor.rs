// 该文件是 Jiangbei （江北东风） 项目的一部分。
// src/tensor.rs - 原始预测张量
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::anchors::{ANCHORS_PER_SCALE, ENTRY_LEN, NUM_SCALES};

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("预测张量数量错误: 期望 {NUM_SCALES}, 实际 {0}")]
  ScaleCount(usize),
  #[error("张量通道深度无效: 期望 {expected}, 实际 {actual}")]
  ChannelDepth { expected: usize, actual: usize },
  #[error("张量数据长度不匹配: 期望 {expected}, 实际 {actual}")]
  DataLength { expected: usize, actual: usize },
  #[error("网格 ({x}, {y}) 锚框 {anchor} 的置信度为 NaN")]
  NanConfidence { x: usize, y: usize, anchor: usize },
}

/// 单尺度原始预测张量，按 (cell_x, cell_y, channel) 索引。
///
/// 通道空间划分为 3 个连续的锚框块，每块 85 个值
/// （4 回归 + 1 物体置信度 + 80 类别分数）。
/// 构造时校验形状，之后的索引访问不再检查。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawPredTensor")]
pub struct PredTensor {
  cells_x: usize,
  cells_y: usize,
  channels: usize,
  data: Box<[f32]>,
}

/// 反序列化用的未校验形式
#[derive(Deserialize)]
struct RawPredTensor {
  cells_x: usize,
  cells_y: usize,
  channels: usize,
  data: Vec<f32>,
}

impl TryFrom<RawPredTensor> for PredTensor {
  type Error = DecodeError;

  fn try_from(raw: RawPredTensor) -> Result<Self, Self::Error> {
    PredTensor::new(raw.cells_x, raw.cells_y, raw.channels, raw.data)
  }
}

impl PredTensor {
  pub fn new(
    cells_x: usize,
    cells_y: usize,
    channels: usize,
    data: Vec<f32>,
  ) -> Result<Self, DecodeError> {
    let expected_channels = ANCHORS_PER_SCALE * ENTRY_LEN;
    if channels != expected_channels {
      return Err(DecodeError::ChannelDepth {
        expected: expected_channels,
        actual: channels,
      });
    }

    let expected_len = cells_x * cells_y * channels;
    if data.len() != expected_len {
      return Err(DecodeError::DataLength {
        expected: expected_len,
        actual: data.len(),
      });
    }

    Ok(PredTensor {
      cells_x,
      cells_y,
      channels,
      data: data.into_boxed_slice(),
    })
  }

  pub fn cells_x(&self) -> usize {
    self.cells_x
  }

  pub fn cells_y(&self) -> usize {
    self.cells_y
  }

  pub fn channels(&self) -> usize {
    self.channels
  }

  #[inline]
  pub fn get(&self, cell_x: usize, cell_y: usize, channel: usize) -> f32 {
    self.data[(cell_x * self.cells_y + cell_y) * self.channels + channel]
  }
}
