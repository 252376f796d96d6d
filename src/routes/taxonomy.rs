//! Book kinds and genres share one set of handlers; the router for each
//! carries its [`Taxonomy`] as a request extension.

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::models::TaxonomyTerm;
use crate::error::AppResult;
use crate::routes::auth::AdminUser;
use crate::routes::{ApiJson, ApiPath};
use crate::state::AppState;
use crate::store::{StoreError, Taxonomy};
use crate::validation;

#[derive(Debug, Deserialize, Serialize)]
pub struct TermRequest {
    pub name: String,
}

fn base_path(taxonomy: Taxonomy) -> &'static str {
    match taxonomy {
        Taxonomy::Kind => "/api/book-kinds",
        Taxonomy::Genre => "/api/book-genres",
    }
}

pub fn router(taxonomy: Taxonomy) -> Router<AppState> {
    let base = base_path(taxonomy);
    Router::new()
        .route(base, get(list_terms).post(create_term))
        .route(
            &format!("{base}/{{id}}"),
            get(get_term).patch(rename_term).delete(delete_term),
        )
        .layer(Extension(taxonomy))
}

pub async fn list_terms(
    Extension(taxonomy): Extension<Taxonomy>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<TaxonomyTerm>>> {
    Ok(Json(state.taxonomy.list_terms(taxonomy).await?))
}

pub async fn get_term(
    Extension(taxonomy): Extension<Taxonomy>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<TaxonomyTerm>> {
    let term = state
        .taxonomy
        .get_term(taxonomy, id)
        .await?
        .ok_or(StoreError::not_found(taxonomy.entity(), id))?;
    Ok(Json(term))
}

pub async fn create_term(
    _admin: AdminUser,
    Extension(taxonomy): Extension<Taxonomy>,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<TermRequest>,
) -> AppResult<(StatusCode, Json<TaxonomyTerm>)> {
    let name = validation::term_name(&payload.name)?;
    let term = state.taxonomy.create_term(taxonomy, name).await?;
    tracing::info!(id = term.id, "{} created: {}", taxonomy.entity(), term.name);
    Ok((StatusCode::CREATED, Json(term)))
}

pub async fn rename_term(
    _admin: AdminUser,
    Extension(taxonomy): Extension<Taxonomy>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<TermRequest>,
) -> AppResult<Json<TaxonomyTerm>> {
    let name = validation::term_name(&payload.name)?;
    Ok(Json(state.taxonomy.rename_term(taxonomy, id, name).await?))
}

pub async fn delete_term(
    _admin: AdminUser,
    Extension(taxonomy): Extension<Taxonomy>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    state.taxonomy.delete_term(taxonomy, id).await?;
    tracing::info!(id, "{} deleted", taxonomy.entity());
    Ok(StatusCode::NO_CONTENT)
}
