use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::models::{Book, SavedBook, User, UserPatch};
use crate::error::AppResult;
use crate::routes::auth::{hash_password, AuthUser};
use crate::routes::{ApiJson, ApiPath, ApiQuery, PageEnvelope, PageQuery};
use crate::state::AppState;
use crate::store::StoreError;
use crate::validation::{self, ValidationError};

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateMeRequest {
    pub password: Option<String>,
    pub img_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SaveBookRequest {
    pub book_id: i64,
}

/// GET /api/users/me
pub async fn me(auth: AuthUser, State(state): State<AppState>) -> AppResult<Json<User>> {
    let user = state
        .users
        .get_user(auth.user_id)
        .await?
        .ok_or(StoreError::not_found("user", auth.user_id))?;
    Ok(Json(user))
}

/// PATCH /api/users/me
pub async fn update_me(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UpdateMeRequest>,
) -> AppResult<Json<User>> {
    if payload.password.is_none() && payload.img_url.is_none() {
        return Err(ValidationError::new("body", "no fields to update").into());
    }
    let img_url = payload
        .img_url
        .as_deref()
        .map(validation::image_url)
        .transpose()?;
    let password_hash = match payload.password {
        Some(password) => {
            validation::password(&password)?;
            Some(hash_password(password, state.config.bcrypt_cost).await?)
        }
        None => None,
    };

    let user = state
        .users
        .update_user(auth.user_id, UserPatch { password_hash, img_url })
        .await?;
    tracing::info!(user_id = user.id, "Profile updated");
    Ok(Json(user))
}

/// DELETE /api/users/me
pub async fn delete_me(auth: AuthUser, State(state): State<AppState>) -> AppResult<StatusCode> {
    state.users.delete_user(auth.user_id).await?;
    tracing::info!(user_id = auth.user_id, "Account deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/me/saved-books
pub async fn list_saved_books(
    auth: AuthUser,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> AppResult<Json<PageEnvelope<Book>>> {
    let page = query.resolve()?;
    let books = state
        .users
        .list_saved_books(auth.user_id, page, state.composer.per_page())
        .await?;
    Ok(Json(PageEnvelope::new(books, &state.config.public_base_url, &uri)))
}

/// POST /api/users/me/saved-books
pub async fn save_book(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SaveBookRequest>,
) -> AppResult<(StatusCode, Json<SavedBook>)> {
    let book_id = validation::positive_id("book_id", payload.book_id)?;
    let saved = state.users.save_book(auth.user_id, book_id).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// DELETE /api/users/me/saved-books/{book_id}
pub async fn unsave_book(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(book_id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    state.users.unsave_book(auth.user_id, book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
