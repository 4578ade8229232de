// 该文件是 Jiangbei （江北东风） 项目的一部分。
// src/detect/decode.rs - 预测张量解码
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use tracing::debug;

use crate::{
  anchors::{ANCHORS, ANCHORS_PER_SCALE, ENTRY_LEN, NUM_CLASSES, NUM_SCALES},
  labels::LabelTable,
  tensor::{DecodeError, PredTensor},
};

use super::Detection;

#[inline]
pub(crate) fn sigmoid(x: f32) -> f32 {
  1.0 / (1.0 + (-x).exp())
}

/// 将三个尺度的原始预测张量解码为候选检测框。
///
/// 输出位于模型输入坐标系，角点形式。每个网格单元、每个锚框块
/// 独立解码：物体置信度取 sigmoid，严格大于阈值才保留；
/// 框中心 = 单元尺寸 × (单元坐标 + sigmoid(偏移))；
/// 框尺寸 = 锚框先验 × exp(回归值)；类别取 80 路分数的最大者。
/// 候选列表可能包含重复检测，由后续 NMS 去重。
pub fn decode(
  tensors: &[PredTensor],
  labels: &LabelTable,
  input_size: u32,
  threshold: f32,
) -> Result<Vec<Detection>, DecodeError> {
  if tensors.len() != NUM_SCALES {
    return Err(DecodeError::ScaleCount(tensors.len()));
  }

  let mut boxes = Vec::new();

  for (scale_idx, pred) in tensors.iter().enumerate() {
    let cell_size_x = input_size as f32 / pred.cells_x() as f32;
    let cell_size_y = input_size as f32 / pred.cells_y() as f32;

    for anchor_idx in 0..ANCHORS_PER_SCALE {
      let base = anchor_idx * ENTRY_LEN;
      let (anchor_w, anchor_h) = ANCHORS[scale_idx][anchor_idx];

      for cell_x in 0..pred.cells_x() {
        for cell_y in 0..pred.cells_y() {
          let raw_objectness = pred.get(cell_x, cell_y, base + 4);
          if raw_objectness.is_nan() {
            return Err(DecodeError::NanConfidence {
              x: cell_x,
              y: cell_y,
              anchor: anchor_idx,
            });
          }

          let confidence = sigmoid(raw_objectness);
          if confidence <= threshold {
            continue;
          }

          // 中心点：网格坐标加 sigmoid 偏移，再乘单元像素尺寸
          let x = cell_size_x * (cell_x as f32 + sigmoid(pred.get(cell_x, cell_y, base)));
          let y = cell_size_y * (cell_y as f32 + sigmoid(pred.get(cell_x, cell_y, base + 1)));

          // 尺寸：锚框先验乘 exp 回归值，宽对应 x 轴，高对应 y 轴
          let w = anchor_w * pred.get(cell_x, cell_y, base + 2).exp();
          let h = anchor_h * pred.get(cell_x, cell_y, base + 3).exp();

          let mut best_class = 0usize;
          let mut best_score = f32::MIN;
          for class_id in 0..NUM_CLASSES {
            let score = pred.get(cell_x, cell_y, base + 5 + class_id);
            if score > best_score {
              best_score = score;
              best_class = class_id;
            }
          }

          boxes.push(Detection {
            label: labels.name(best_class).to_string(),
            confidence,
            xmin: x - w / 2.0,
            xmax: x + w / 2.0,
            ymin: y - h / 2.0,
            ymax: y + h / 2.0,
          });
        }
      }
    }
  }

  debug!("解码得到 {} 个候选框", boxes.len());
  Ok(boxes)
}

#[cfg(test)]
mod tests {
  use super::*;

  const CHANNELS: usize = ANCHORS_PER_SCALE * ENTRY_LEN;
  const EPS: f32 = 1e-4;

  fn zero_tensor(cells: usize) -> Vec<f32> {
    vec![0.0; cells * cells * CHANNELS]
  }

  fn tensor_from(cells: usize, data: Vec<f32>) -> PredTensor {
    PredTensor::new(cells, cells, CHANNELS, data).unwrap()
  }

  /// 三个全零尺度张量，网格从粗到细
  fn zero_scales() -> Vec<PredTensor> {
    [2, 4, 8]
      .into_iter()
      .map(|cells| tensor_from(cells, zero_tensor(cells)))
      .collect()
  }

  fn channel_index(cells: usize, cell_x: usize, cell_y: usize, channel: usize) -> usize {
    (cell_x * cells + cell_y) * CHANNELS + channel
  }

  #[test]
  fn all_zero_tensors_decode_to_nothing() {
    // sigmoid(0) = 0.5，不严格大于默认阈值 0.5
    let boxes = decode(&zero_scales(), &LabelTable::coco(), 512, 0.5).unwrap();
    assert!(boxes.is_empty());
  }

  #[test]
  fn channel_to_box_edge_mapping_is_pinned() {
    // 尺度 0（最粗），2x2 网格，单元尺寸 512/2 = 256，锚框 0 = (116, 90)。
    // 单元 (1, 0)：tx = ty = 0 → sigmoid = 0.5，
    // 中心 = (256 * 1.5, 256 * 0.5) = (384, 128)；
    // tw = th = 0 → exp = 1，宽 116 高 90。
    let mut data = zero_tensor(2);
    data[channel_index(2, 1, 0, 4)] = 3.0;
    data[channel_index(2, 1, 0, 5 + 2)] = 1.0; // 类别 2 = car

    let mut scales = zero_scales();
    scales[0] = tensor_from(2, data);

    let boxes = decode(&scales, &LabelTable::coco(), 512, 0.5).unwrap();
    assert_eq!(boxes.len(), 1);

    let b = &boxes[0];
    assert_eq!(b.label, "car");
    assert!((b.confidence - sigmoid(3.0)).abs() < EPS);
    assert!((b.xmin - (384.0 - 58.0)).abs() < EPS);
    assert!((b.xmax - (384.0 + 58.0)).abs() < EPS);
    assert!((b.ymin - (128.0 - 45.0)).abs() < EPS);
    assert!((b.ymax - (128.0 + 45.0)).abs() < EPS);
  }

  #[test]
  fn size_regression_uses_anchor_and_exp() {
    // 尺度 2（最细）锚框 1 = (16, 30)，tw = th = ln(2) → 尺寸翻倍
    let cells = 8usize;
    let mut data = zero_tensor(cells);
    let base = ENTRY_LEN; // 锚框 1
    data[channel_index(cells, 0, 0, base + 2)] = 2.0f32.ln();
    data[channel_index(cells, 0, 0, base + 3)] = 2.0f32.ln();
    data[channel_index(cells, 0, 0, base + 4)] = 5.0;

    let mut scales = zero_scales();
    scales[2] = tensor_from(cells, data);

    let boxes = decode(&scales, &LabelTable::coco(), 512, 0.5).unwrap();
    assert_eq!(boxes.len(), 1);

    let b = &boxes[0];
    assert!(((b.xmax - b.xmin) - 32.0).abs() < EPS);
    assert!(((b.ymax - b.ymin) - 60.0).abs() < EPS);
  }

  #[test]
  fn threshold_is_strictly_greater() {
    // raw = 0 → sigmoid = 0.5，等于阈值时排除
    let boxes = decode(&zero_scales(), &LabelTable::coco(), 512, 0.5).unwrap();
    assert!(boxes.is_empty());

    // 略高于阈值时保留
    let mut data = zero_tensor(2);
    data[channel_index(2, 0, 0, 4)] = 0.01;
    let mut scales = zero_scales();
    scales[0] = tensor_from(2, data);

    let boxes = decode(&scales, &LabelTable::coco(), 512, 0.5).unwrap();
    assert_eq!(boxes.len(), 1);
  }

  #[test]
  fn wrong_scale_count_is_decode_error() {
    let scales = vec![tensor_from(2, zero_tensor(2))];
    let result = decode(&scales, &LabelTable::coco(), 512, 0.5);
    assert!(matches!(result, Err(DecodeError::ScaleCount(1))));
  }

  #[test]
  fn nan_objectness_is_decode_error() {
    let mut data = zero_tensor(2);
    data[channel_index(2, 1, 1, ENTRY_LEN * 2 + 4)] = f32::NAN;
    let mut scales = zero_scales();
    scales[0] = tensor_from(2, data);

    let result = decode(&scales, &LabelTable::coco(), 512, 0.5);
    assert!(matches!(
      result,
      Err(DecodeError::NanConfidence { x: 1, y: 1, anchor: 2 })
    ));
  }
}
