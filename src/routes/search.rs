//! `GET|POST /api/books/search`: criteria DTO at the edge, composition in
//! [`crate::search::QueryComposer`].

use axum::{
    extract::{OriginalUri, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::models::Book;
use crate::error::AppResult;
use crate::routes::{resolve_page, ApiJson, ApiQuery, PageEnvelope, PageQuery};
use crate::search::{SearchCriteria, SearchResult};
use crate::state::AppState;
use crate::validation::{self, ValidationError, ValidationResult};

/// Search filters as sent by clients, in the query string or a JSON body.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SearchParams {
    pub text: Option<String>,
    pub kind_id: Option<i64>,
    pub genre_id: Option<i64>,
    pub release_year: Option<i32>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub page: Option<u32>,
}

impl SearchParams {
    pub fn criteria(&self) -> ValidationResult<SearchCriteria> {
        let min_price = self
            .min_price
            .map(|p| validation::search_price("min_price", p))
            .transpose()?;
        let max_price = self
            .max_price
            .map(|p| validation::search_price("max_price", p))
            .transpose()?;
        if let (Some(min), Some(max)) = (min_price, max_price) {
            if min > max {
                return Err(ValidationError::new(
                    "min_price",
                    "must not be greater than max_price",
                ));
            }
        }

        Ok(SearchCriteria {
            text: self.text.as_deref().map(validation::search_text).transpose()?,
            kind_id: self
                .kind_id
                .map(|id| validation::positive_id("kind_id", id))
                .transpose()?,
            genre_id: self
                .genre_id
                .map(|id| validation::positive_id("genre_id", id))
                .transpose()?,
            release_year: self.release_year.map(validation::search_year).transpose()?,
            min_price,
            max_price,
        })
    }
}

/// Validated criteria as query parameters, in the order GET accepts them.
fn criteria_query(criteria: &SearchCriteria) -> Vec<(String, String)> {
    let mut query = Vec::new();
    let mut push = |key: &str, value: Option<String>| {
        if let Some(value) = value {
            query.push((key.to_string(), value));
        }
    };
    push("text", criteria.text.clone().filter(|text| !text.is_empty()));
    push("kind_id", criteria.kind_id.map(|id| id.to_string()));
    push("genre_id", criteria.genre_id.map(|id| id.to_string()));
    push("release_year", criteria.release_year.map(|year| year.to_string()));
    push("min_price", criteria.min_price.map(|price| price.to_string()));
    push("max_price", criteria.max_price.map(|price| price.to_string()));
    query
}

async fn run_search(
    state: &AppState,
    criteria: &SearchCriteria,
    page: u32,
) -> AppResult<SearchResult> {
    let result = state.composer.search(criteria, page).await?;
    tracing::debug!(
        kind = ?result.kind,
        genre = ?result.genre,
        total = result.page.total,
        "book search composed"
    );
    Ok(result)
}

/// GET /api/books/search?text=&kind_id=&genre_id=&release_year=&min_price=&max_price=&page=
pub async fn search_get(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> AppResult<Json<PageEnvelope<Book>>> {
    let criteria = params.criteria()?;
    let page = resolve_page(params.page)?;
    let result = run_search(&state, &criteria, page).await?;
    Ok(Json(PageEnvelope::new(result.page, &state.config.public_base_url, &uri)))
}

/// POST /api/books/search with the filters as JSON. `?page=` wins over a
/// `page` field in the body. Page links carry the filters as GET parameters.
pub async fn search_post(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(query): ApiQuery<PageQuery>,
    ApiJson(params): ApiJson<SearchParams>,
) -> AppResult<Json<PageEnvelope<Book>>> {
    let criteria = params.criteria()?;
    let page = resolve_page(query.page.or(params.page))?;
    let result = run_search(&state, &criteria, page).await?;
    Ok(Json(PageEnvelope::with_query(
        result.page,
        &state.config.public_base_url,
        uri.path(),
        &criteria_query(&criteria),
    )))
}
