// 该文件是 Jiangbei （江北东风） 项目的一部分。
// src/detect/nms.rs - 非极大值抑制
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use tracing::debug;

use super::Detection;

/// 默认 NMS IoU 阈值
pub const DEFAULT_MAX_OVERLAP: f32 = 0.25;

/// 矩形面积，退化或翻转的矩形面积为 0
fn area(xmin: f32, xmax: f32, ymin: f32, ymax: f32) -> f32 {
  (xmax - xmin).max(0.0) * (ymax - ymin).max(0.0)
}

/// 交并比。交集为轴对齐相交矩形的面积，
/// 负宽高按零面积处理，因此不相交的框 IoU 恰好为 0。
pub fn overlap(a: &Detection, b: &Detection) -> f32 {
  let ixmin = a.xmin.max(b.xmin);
  let ixmax = a.xmax.min(b.xmax);
  let iymin = a.ymin.max(b.ymin);
  let iymax = a.ymax.min(b.ymax);

  let area_a = area(a.xmin, a.xmax, a.ymin, a.ymax);
  let area_b = area(b.xmin, b.xmax, b.ymin, b.ymax);
  let area_in = area(ixmin, ixmax, iymin, iymax);

  area_in / (area_a + area_b - area_in)
}

/// 非极大值抑制。
///
/// 先按 (置信度, xmax) 降序排序，xmax 仅作为相同置信度时的
/// 确定性次键。随后每轮取出队首加入结果，并用过滤重建剩余列表，
/// 丢弃与队首 IoU 严格大于 max_overlap 的候选框。
/// 复杂度 O(n²)，单图请求的候选数量级为数十，足够。
pub fn suppress(mut boxes: Vec<Detection>, max_overlap: f32) -> Vec<Detection> {
  boxes.sort_by(|a, b| {
    b.confidence
      .total_cmp(&a.confidence)
      .then(b.xmax.total_cmp(&a.xmax))
  });

  let before = boxes.len();
  let mut kept = Vec::new();
  let mut remaining = boxes;

  while !remaining.is_empty() {
    let best = remaining.remove(0);
    remaining = remaining
      .into_iter()
      .filter(|other| overlap(&best, other) <= max_overlap)
      .collect();
    kept.push(best);
  }

  debug!("NMS: {} 个候选框保留 {} 个", before, kept.len());
  kept
}
