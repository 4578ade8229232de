// 该文件是 Jiangbei （江北东风） 项目的一部分。
// src/serve.rs - HTTP 推理服务
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

use std::io::Cursor;
use std::sync::Arc;

use axum::{
  Json, Router,
  extract::{Multipart, State},
  http::StatusCode,
  routing::post,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{ImageFormat, RgbImage};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::{
  detect::{Detection, Pipeline, PipelineError},
  model::Network,
  output::Annotator,
};

/// POST /predict 的响应体
#[derive(Debug, Serialize)]
pub struct PredictResponse {
  /// base64 编码的标注后 PNG 图像
  pub data: String,
  /// 原图尺寸 (宽, 高)
  pub size: (u32, u32),
  /// 原图坐标系下的检测框，已裁剪到图像范围
  pub boxes: Vec<Detection>,
}

/// 服务状态：检测管线与标注器，请求间只读共享
pub struct AppState<N> {
  pub pipeline: Pipeline<N>,
  pub annotator: Annotator<'static>,
}

pub fn router<N>(state: Arc<AppState<N>>) -> Router
where
  N: Network + Send + Sync + 'static,
{
  Router::new()
    .route("/predict", post(predict::<N>))
    .with_state(state)
}

/// 绑定地址并运行推理服务
pub async fn serve<N>(addr: &str, state: Arc<AppState<N>>) -> anyhow::Result<()>
where
  N: Network + Send + Sync + 'static,
{
  let listener = tokio::net::TcpListener::bind(addr).await?;
  info!("推理服务监听于 http://{}", addr);
  axum::serve(listener, router(state)).await?;
  Ok(())
}

async fn predict<N>(
  State(state): State<Arc<AppState<N>>>,
  multipart: Multipart,
) -> Result<Json<PredictResponse>, (StatusCode, String)>
where
  N: Network + Send + Sync,
{
  let image = read_image_field(multipart).await?;
  let (width, height) = image.dimensions();
  debug!("收到图像: {}x{}", width, height);

  // 每个请求独立执行一次管线，无跨请求状态
  let boxes = state.pipeline.detect(&image).map_err(|err| match err {
    PipelineError::Decode(e) => {
      error!("预测解码失败: {}", e);
      (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
    }
    PipelineError::Network(e) => {
      error!("模型推理失败: {}", e);
      (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
  })?;

  let boxes: Vec<Detection> = boxes.iter().map(|b| b.clamp_to(width, height)).collect();
  info!("检测到 {} 个物体", boxes.len());

  let mut annotated = image;
  state.annotator.annotate(&mut annotated, &boxes);

  let mut png = Vec::new();
  annotated
    .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
    .map_err(|e| {
      error!("标注图像编码失败: {}", e);
      (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

  Ok(Json(PredictResponse {
    data: BASE64.encode(&png),
    size: (width, height),
    boxes,
  }))
}

/// 从 multipart 表单中取出 `image` 字段并解码为 RGB 图像
async fn read_image_field(
  mut multipart: Multipart,
) -> Result<RgbImage, (StatusCode, String)> {
  while let Some(field) = multipart.next_field().await.map_err(|e| {
    (StatusCode::BAD_REQUEST, format!("表单解析失败: {}", e))
  })? {
    if field.name() != Some("image") {
      continue;
    }

    let bytes = field.bytes().await.map_err(|e| {
      (StatusCode::BAD_REQUEST, format!("读取图像字段失败: {}", e))
    })?;

    let image = image::load_from_memory(&bytes).map_err(|e| {
      (StatusCode::BAD_REQUEST, format!("图像解码失败: {}", e))
    })?;

    return Ok(image.into_rgb8());
  }

  Err((
    StatusCode::BAD_REQUEST,
    "缺少 image 字段".to_string(),
  ))
}
