//! Media download handlers / 媒体文件下载接口
//!
//! Looks the file path up by id, then streams it from the media directory.
//! Missing row or missing file is a 404 with a structured body, matching the
//! error contract of the JSON endpoints.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::state::AppState;
use knowledgebox_backend::config;
use knowledgebox_backend::utils::{attachment_disposition, media_file_path};

/// GET /sounds/download/:id
pub async fn download_sound(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response, (StatusCode, Json<Value>)> {
    serve_media(&state, "sounds", id).await
}

/// GET /images/download/:id
pub async fn download_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response, (StatusCode, Json<Value>)> {
    serve_media(&state, "images", id).await
}

async fn serve_media(
    state: &AppState,
    table: &'static str,
    id: i64,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let not_found = || {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Data not found"})),
        )
    };

    let query = format!("SELECT file FROM {} WHERE id = ?", table);
    let file: Option<(String,)> = sqlx::query_as(&query)
        .bind(id)
        .fetch_optional(&state.db)
        .await
        .map_err(|e| {
            tracing::error!("media lookup failed: {}", e);
            not_found()
        })?;
    let (file,) = file.ok_or_else(not_found)?;

    let media_dir = config::config().get_media_dir();
    let path = media_file_path(&media_dir, &file).ok_or_else(|| {
        tracing::warn!("rejected media path {:?}", file);
        not_found()
    })?;

    let reader = tokio::fs::File::open(&path).await.map_err(|_| {
        tracing::warn!("media file missing on disk: {:?}", path);
        (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "File not found"})),
        )
    })?;

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download")
        .to_string();
    let content_type = mime_guess::from_path(&path).first_or_octet_stream();

    let stream = ReaderStream::new(reader);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_DISPOSITION, attachment_disposition(&filename))
        .body(Body::from_stream(stream))
        .map_err(|e| {
            tracing::error!("failed to build media response: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal server error"})),
            )
        })
}
