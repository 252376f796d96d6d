use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::models::{Book, BookPatch, NewBook};
use crate::error::AppResult;
use crate::routes::auth::AdminUser;
use crate::routes::{ApiJson, ApiPath, ApiQuery, PageEnvelope, PageQuery};
use crate::search::BookQuery;
use crate::state::AppState;
use crate::store::StoreError;
use crate::validation::{self, ValidationError, ValidationResult};

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateBookRequest {
    pub name: String,
    pub price: Decimal,
    pub author: String,
    pub release_year: i32,
    pub kind_id: i64,
    pub genre_id: i64,
    pub keywords: Vec<String>,
    pub images: Vec<String>,
}

impl CreateBookRequest {
    pub fn into_new_book(self) -> ValidationResult<NewBook> {
        Ok(NewBook {
            name: validation::book_name(&self.name)?,
            price: validation::price(self.price)?,
            author: validation::author(&self.author)?,
            release_year: validation::release_year(self.release_year)?,
            kind_id: validation::positive_id("kind_id", self.kind_id)?,
            genre_id: validation::positive_id("genre_id", self.genre_id)?,
            keywords: validation::keywords(&self.keywords)?,
            images: validation::images(&self.images)?,
        })
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateBookRequest {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub author: Option<String>,
    pub release_year: Option<i32>,
    pub kind_id: Option<i64>,
    pub genre_id: Option<i64>,
}

impl UpdateBookRequest {
    pub fn into_patch(self) -> ValidationResult<BookPatch> {
        let patch = BookPatch {
            name: self.name.as_deref().map(validation::book_name).transpose()?,
            price: self.price.map(validation::price).transpose()?,
            author: self.author.as_deref().map(validation::author).transpose()?,
            release_year: self.release_year.map(validation::release_year).transpose()?,
            kind_id: self
                .kind_id
                .map(|id| validation::positive_id("kind_id", id))
                .transpose()?,
            genre_id: self
                .genre_id
                .map(|id| validation::positive_id("genre_id", id))
                .transpose()?,
        };
        if patch.is_empty() {
            return Err(ValidationError::new("body", "no fields to update"));
        }
        Ok(patch)
    }
}

/// GET /api/books
pub async fn list_books(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> AppResult<Json<PageEnvelope<Book>>> {
    let page = query.resolve()?;
    let books = state
        .catalog
        .paginate_books(&BookQuery::all(), page, state.composer.per_page())
        .await?;
    Ok(Json(PageEnvelope::new(books, &state.config.public_base_url, &uri)))
}

/// GET /api/books/{id}
pub async fn get_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Book>> {
    let book = state
        .catalog
        .get_book(id)
        .await?
        .ok_or(StoreError::not_found("book", id))?;
    Ok(Json(book))
}

/// POST /api/books
pub async fn create_book(
    _admin: AdminUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateBookRequest>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let book = state.catalog.create_book(payload.into_new_book()?).await?;
    tracing::info!(book_id = book.id, "Book created: {}", book.name);
    Ok((StatusCode::CREATED, Json(book)))
}

/// PATCH /api/books/{id}
pub async fn update_book(
    _admin: AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateBookRequest>,
) -> AppResult<Json<Book>> {
    let book = state.catalog.update_book(id, payload.into_patch()?).await?;
    tracing::info!(book_id = book.id, "Book updated");
    Ok(Json(book))
}

/// DELETE /api/books/{id}
pub async fn delete_book(
    _admin: AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    state.catalog.delete_book(id).await?;
    tracing::info!(book_id = id, "Book deleted");
    Ok(StatusCode::NO_CONTENT)
}
