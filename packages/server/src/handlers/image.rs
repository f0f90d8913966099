use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use common::ContentHash;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect};
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::entity::restaurant;
use crate::error::{AppError, ErrorBody};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/{hash}",
    tag = "Images",
    operation_id = "getImage",
    summary = "Download a restaurant image",
    description = "Streams an image by its SHA-256 content hash. Images are immutable, so \
        responses carry a strong ETag and long-lived caching; If-None-Match yields 304.",
    params(("hash" = String, Path, description = "SHA-256 content hash (64 hex characters)")),
    responses(
        (status = 200, description = "Image content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 400, description = "Malformed hash (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers), fields(hash = %hash))]
pub async fn get_image(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let content_hash: ContentHash = hash.parse()?;
    let hex = content_hash.to_hex();

    // Only images that some restaurant still references are served.
    let content_type: Option<String> = restaurant::Entity::find()
        .select_only()
        .column(restaurant::Column::ImageContentType)
        .filter(restaurant::Column::ImageHash.eq(&hex))
        .into_tuple::<Option<String>>()
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".into()))?;

    let etag_value = format!("\"{hex}\"");
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && (val == etag_value || val == "*")
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let reader = state.images.get_stream(&content_hash).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            content_type.as_deref().unwrap_or("application/octet-stream"),
        )
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
