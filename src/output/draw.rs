// 该文件是 Jiangbei （江北东风） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use ab_glyph::{FontRef, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use thiserror::Error;

use crate::detect::Detection;

// 矩形颜色盘，按标签首次出现的顺序轮换
const PALETTE: [[u8; 3]; 9] = [
  [255, 0, 0],    // 红
  [0, 0, 255],    // 蓝
  [0, 128, 0],    // 绿
  [128, 0, 128],  // 紫
  [255, 165, 0],  // 橙
  [255, 255, 0],  // 黄
  [165, 42, 42],  // 棕
  [255, 192, 203],// 粉
  [128, 128, 128],// 灰
];

const BOX_THICKNESS: i32 = 5;
const LABEL_FONT_SIZE: f32 = 15.0;

#[derive(Error, Debug)]
pub enum AnnotateError {
  #[error("字体加载失败: {0}")]
  FontError(ab_glyph::InvalidFont),
}

/// 检测结果标注器。
///
/// 在原图上为每个检测框绘制矩形边框，并在框上方写
/// `标签-置信度%` 文本。字体可选，未提供字体时只画框。
pub struct Annotator<'a> {
  font: Option<FontRef<'a>>,
  font_size: f32,
  thickness: i32,
}

impl Default for Annotator<'_> {
  fn default() -> Self {
    Annotator {
      font: None,
      font_size: LABEL_FONT_SIZE,
      thickness: BOX_THICKNESS,
    }
  }
}

impl<'a> Annotator<'a> {
  pub fn new() -> Self {
    Self::default()
  }

  /// 加载 TTF/OTF 字体数据用于标签文本
  pub fn with_font(mut self, font_data: &'a [u8]) -> Result<Self, AnnotateError> {
    let font = FontRef::try_from_slice(font_data).map_err(AnnotateError::FontError)?;
    self.font = Some(font);
    Ok(self)
  }

  /// 在图像上绘制所有检测框与标签
  pub fn annotate(&self, image: &mut RgbImage, boxes: &[Detection]) {
    let (width, height) = image.dimensions();

    // 颜色按标签分配，首次出现的顺序决定色序
    let mut seen_labels: Vec<&str> = Vec::new();
    for b in boxes {
      if !seen_labels.contains(&b.label.as_str()) {
        seen_labels.push(b.label.as_str());
      }
    }

    for b in boxes {
      let d = b.clamp_to(width, height);
      let label_idx = seen_labels
        .iter()
        .position(|&l| l == d.label)
        .unwrap_or(0);
      let color = Rgb(PALETTE[label_idx % PALETTE.len()]);

      self.draw_box(image, &d, color);
      if let Some(font) = &self.font {
        self.draw_label(image, &d, color, font);
      }
    }
  }

  fn draw_box(&self, image: &mut RgbImage, d: &Detection, color: Rgb<u8>) {
    let (width, height) = (image.width() as i32, image.height() as i32);

    let xmin = d.xmin.floor() as i32;
    let ymin = d.ymin.floor() as i32;
    let xmax = d.xmax.ceil() as i32;
    let ymax = d.ymax.ceil() as i32;

    // 向内收缩绘制 thickness 层空心矩形
    for t in 0..self.thickness {
      let x0 = (xmin + t).clamp(0, width - 1);
      let y0 = (ymin + t).clamp(0, height - 1);
      let x1 = (xmax - t).clamp(0, width - 1);
      let y1 = (ymax - t).clamp(0, height - 1);

      if x1 <= x0 || y1 <= y0 {
        break;
      }

      let rect = Rect::at(x0, y0).of_size((x1 - x0) as u32, (y1 - y0) as u32);
      draw_hollow_rect_mut(image, rect, color);
    }
  }

  fn draw_label(&self, image: &mut RgbImage, d: &Detection, color: Rgb<u8>, font: &FontRef) {
    let text = format!("{}-{:.1}%", d.label, d.confidence * 100.0);

    let size = self.font_size.min(image.height() as f32 / 40.0);
    let scale = PxScale::from(size);

    // 文本位于框上方，贴边时压到框内
    let text_x = (d.xmin.floor() as i32).max(0);
    let text_y = ((d.ymin - size).floor() as i32).max(0);

    draw_text_mut(image, color, text_x, text_y, scale, font, &text);
  }
}
