// 该文件是 Jiangbei （江北东风） 项目的一部分。
// src/anchors.rs - 锚框先验数据
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

/// 检测尺度数量
pub const NUM_SCALES: usize = 3;

/// 每个尺度的锚框数量
pub const ANCHORS_PER_SCALE: usize = 3;

/// 类别数量（COCO 数据集）
pub const NUM_CLASSES: usize = 80;

/// 每个锚框块的通道数: 4 回归 + 1 物体置信度 + 80 类别
pub const ENTRY_LEN: usize = 5 + NUM_CLASSES;

/// YOLOv3 锚框先验 (宽, 高)，模型输入像素单位。
/// 外层顺序从最粗网格（大物体）到最细网格（小物体），
/// 与网络输出的三个尺度一一对应。纯常量数据，无运行时计算。
pub const ANCHORS: [[(f32, f32); ANCHORS_PER_SCALE]; NUM_SCALES] = [
  [(116.0, 90.0), (156.0, 198.0), (373.0, 326.0)],
  [(30.0, 61.0), (62.0, 45.0), (59.0, 119.0)],
  [(10.0, 13.0), (16.0, 30.0), (33.0, 23.0)],
];
