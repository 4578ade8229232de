// 该文件是 Jiangbei （江北东风） 项目的一部分。
// src/detect/rescale.rs - 坐标缩放
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use super::Detection;

/// 将检测框从模型输入坐标系线性缩放到原图坐标系。
///
/// 水平与垂直方向独立缩放（原图不一定是正方形），
/// 纯逐字段线性变换，不重排也不丢弃检测框。
pub fn rescale(boxes: Vec<Detection>, input_size: u32, orig_size: (u32, u32)) -> Vec<Detection> {
  let scale_x = orig_size.0 as f32 / input_size as f32;
  let scale_y = orig_size.1 as f32 / input_size as f32;

  boxes
    .into_iter()
    .map(|b| Detection {
      xmin: b.xmin * scale_x,
      xmax: b.xmax * scale_x,
      ymin: b.ymin * scale_y,
      ymax: b.ymax * scale_y,
      ..b
    })
    .collect()
}
