use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::models::BookImg;
use crate::error::AppResult;
use crate::routes::auth::AdminUser;
use crate::routes::{ApiJson, ApiPath};
use crate::state::AppState;
use crate::validation;

#[derive(Debug, Deserialize, Serialize)]
pub struct ImageRequest {
    pub url: String,
}

/// POST /api/books/{id}/images
pub async fn add_image(
    _admin: AdminUser,
    State(state): State<AppState>,
    ApiPath(book_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<ImageRequest>,
) -> AppResult<(StatusCode, Json<BookImg>)> {
    let url = validation::image_url(&payload.url)?;
    let created = state.catalog.add_image(book_id, url).await?;
    tracing::info!(book_id, image_id = created.id, "Image attached");
    Ok((StatusCode::CREATED, Json(created)))
}

/// DELETE /api/images/{id}
pub async fn delete_image(
    _admin: AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    state.catalog.delete_image(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
