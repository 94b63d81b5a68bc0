use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum_auth::{AuthBearer, Rejection};
use axum_typed_multipart::TypedMultipart;
use indicatif::ProgressBar;
use log::info;

use super::error::{AppError, Result};
use super::state::AppState;
use super::types::*;
use crate::config::SearchOptions;
use crate::maintainer::ReindexReport;
use crate::metrics;

/// 搜索外观相似的商品
#[utoipa::path(
    post,
    path = "/search",
    request_body(content = SearchForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = SearchResponse),
        (status = 400, description = "上传的图片无法读取或解码"),
    )
)]
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    data: TypedMultipart<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    let TypedMultipart(SearchRequest { file, count }) = data;
    if file.contents.is_empty() {
        return Err(AppError::BadRequest("上传的图片为空".to_string()));
    }

    info!("正在搜索上传图片: {:?}", file.metadata.file_name);

    let opts = SearchOptions { count: count.unwrap_or(state.search.count), ..state.search };
    let (hash, results) = state.catalog.search(file.contents.to_vec(), &opts).await?;
    let image_ref = state.catalog.save_upload(&state.upload_dir, &file.contents).await?;

    Ok(Json(SearchResponse {
        query: QueryInfo { image_ref, fingerprint: hash.to_hex() },
        results,
    }))
}

/// 为所有缺少指纹的商品计算指纹
#[utoipa::path(
    post,
    path = "/reindex",
    responses(
        (status = 200, body = ReindexReport),
        (status = 401, description = "鉴权失败"),
    ),
    security(("token" = []))
)]
pub async fn reindex_handler(
    State(state): State<Arc<AppState>>,
    auth: std::result::Result<AuthBearer, Rejection>,
) -> Result<Json<ReindexReport>> {
    // blake3::Hash 的比较是常数时间的
    let authorized = auth.is_ok_and(|AuthBearer(token)| {
        blake3::hash(token.as_bytes()) == blake3::hash(state.token.as_bytes())
    });
    if !authorized {
        return Err(AppError::Unauthorized);
    }
    info!("开始重建索引");
    let report = state.catalog.reindex(&ProgressBar::hidden()).await?;
    Ok(Json(report))
}

/// prometheus 指标
#[utoipa::path(get, path = "/metrics", responses((status = 200, body = String)))]
pub async fn metrics_handler() -> String {
    metrics::gather()
}
