// 该文件是 Jiangbei （江北东风） 项目的一部分。
// src/main.rs - 离线标注工具
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::fs::File;
use std::io::BufReader;

use anyhow::{Context, Result};
use clap::Parser;
use image::ImageReader;

use jiangbei::{
  detect::{self, nms},
  labels::LabelTable,
  model::DEFAULT_INPUT_SIZE,
  output::Annotator,
  tensor::PredTensor,
};

/// Jiangbei 离线标注工具：读取原始预测张量与原图，
/// 执行解码、非极大值抑制与坐标缩放，输出标注图像
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// 输入图片路径
  #[arg(long, value_name = "FILE")]
  image: String,

  /// 原始预测张量 JSON 文件（3 个尺度，粗到细）
  #[arg(long, value_name = "FILE")]
  preds: String,

  /// 输出图片路径
  #[arg(long, value_name = "OUTPUT")]
  output: String,

  /// 标签文件路径（一行一个类别名，缺省为内置 COCO 80 类）
  #[arg(long, value_name = "FILE")]
  labels: Option<String>,

  /// 标签字体文件（缺省时只画框不写标签）
  #[arg(long, value_name = "FILE")]
  font: Option<String>,

  /// 模型输入尺寸
  #[arg(long, default_value_t = DEFAULT_INPUT_SIZE, value_name = "SIZE")]
  size: u32,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = detect::DEFAULT_THRESHOLD, value_name = "THRESHOLD")]
  confidence: f32,

  /// NMS IoU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = nms::DEFAULT_MAX_OVERLAP, value_name = "THRESHOLD")]
  max_overlap: f32,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();
  let args = Args::parse();

  println!("Jiangbei 检测标注工具");
  println!("====================");
  println!("输入图片: {}", args.image);
  println!("预测张量: {}", args.preds);
  println!("输出文件: {}", args.output);
  println!("置信度阈值: {}", args.confidence);
  println!("NMS 阈值: {}", args.max_overlap);
  println!();

  let labels = match &args.labels {
    Some(path) => LabelTable::from_path(path)?,
    None => LabelTable::coco(),
  };

  let image = ImageReader::open(&args.image)
    .with_context(|| format!("无法打开图片: {}", args.image))?
    .decode()
    .with_context(|| format!("无法解码图片: {}", args.image))?
    .into_rgb8();
  let orig_size = image.dimensions();

  let preds_file =
    File::open(&args.preds).with_context(|| format!("无法打开预测文件: {}", args.preds))?;
  let tensors: Vec<PredTensor> = serde_json::from_reader(BufReader::new(preds_file))
    .with_context(|| format!("无法解析预测文件: {}", args.preds))?;

  println!("开始后处理...");
  let boxes = detect::postprocess(
    &tensors,
    &labels,
    args.size,
    orig_size,
    args.confidence,
    args.max_overlap,
  )?;

  println!("检测到 {} 个物体", boxes.len());
  for b in &boxes {
    let d = b.clamp_to(orig_size.0, orig_size.1);
    println!(
      "  - {}: {:.1}% at ({:.0}, {:.0}) - ({:.0}, {:.0})",
      d.label,
      d.confidence * 100.0,
      d.xmin,
      d.ymin,
      d.xmax,
      d.ymax
    );
  }

  let font_data = match &args.font {
    Some(path) => {
      Some(std::fs::read(path).with_context(|| format!("无法读取字体文件: {}", path))?)
    }
    None => None,
  };

  let annotator = match &font_data {
    Some(data) => Annotator::new().with_font(data)?,
    None => Annotator::new(),
  };

  let mut annotated = image;
  let clamped: Vec<_> = boxes
    .iter()
    .map(|b| b.clamp_to(orig_size.0, orig_size.1))
    .collect();
  annotator.annotate(&mut annotated, &clamped);

  annotated
    .save(&args.output)
    .with_context(|| format!("无法保存输出图片: {}", args.output))?;

  println!();
  println!("处理完成!");
  println!("输出文件: {}", args.output);

  Ok(())
}
