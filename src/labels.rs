// 该文件是 Jiangbei （江北东风） 项目的一部分。
// src/labels.rs - 类别标签表
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("标签文件读取失败: {0}")]
  IoError(std::io::Error),
  #[error("标签列表为空")]
  EmptyLabels,
}

impl From<std::io::Error> for ConfigError {
  fn from(err: std::io::Error) -> Self {
    ConfigError::IoError(err)
  }
}

/// 类别标签表。
///
/// 行号 i 对应预测张量中第 i 个类别通道，顺序敏感。
/// 启动时加载一次，之后只读。
#[derive(Debug, Clone)]
pub struct LabelTable {
  names: Box<[String]>,
}

impl LabelTable {
  /// 从行分隔的文本读取标签，一行一个类别名
  pub fn from_reader(reader: impl BufRead) -> Result<Self, ConfigError> {
    let mut names = Vec::new();
    for line in reader.lines() {
      let line = line?;
      let name = line.trim_end();
      if !name.is_empty() {
        names.push(name.to_string());
      }
    }

    if names.is_empty() {
      return Err(ConfigError::EmptyLabels);
    }

    Ok(LabelTable {
      names: names.into_boxed_slice(),
    })
  }

  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    info!("加载标签文件: {}", path.as_ref().display());
    let file = std::fs::File::open(path)?;
    Self::from_reader(BufReader::new(file))
  }

  /// 内置 COCO 80 类标签表
  pub fn coco() -> Self {
    static COCO_CLASSES: &str = include_str!("../assets/coco_classes.txt");
    Self::from_reader(std::io::Cursor::new(COCO_CLASSES)).expect("内置 COCO 标签表无效")
  }

  pub fn name(&self, class_id: usize) -> &str {
    self
      .names
      .get(class_id)
      .map(String::as_str)
      .unwrap_or("unknown")
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}
