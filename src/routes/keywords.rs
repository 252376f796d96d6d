use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::models::BookKeyword;
use crate::error::AppResult;
use crate::routes::auth::AdminUser;
use crate::routes::{ApiJson, ApiPath};
use crate::state::AppState;
use crate::validation;

#[derive(Debug, Deserialize, Serialize)]
pub struct KeywordRequest {
    pub keyword: String,
}

/// POST /api/books/{id}/keywords
pub async fn add_keyword(
    _admin: AdminUser,
    State(state): State<AppState>,
    ApiPath(book_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<KeywordRequest>,
) -> AppResult<(StatusCode, Json<BookKeyword>)> {
    let keyword = validation::keyword(&payload.keyword)?;
    let created = state.catalog.add_keyword(book_id, keyword).await?;
    tracing::info!(book_id, keyword_id = created.id, "Keyword added");
    Ok((StatusCode::CREATED, Json(created)))
}

/// DELETE /api/keywords/{id}
pub async fn delete_keyword(
    _admin: AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    state.catalog.delete_keyword(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::create_app;
    use crate::test_support::{admin_token, fixture_state, send};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_add_keyword_normalizes_and_rejects_duplicates() {
        let state = fixture_state().await;
        let token = admin_token(&state).await;

        let (status, body) = send(
            create_app(state.clone()),
            "POST",
            "/api/books/1/keywords",
            Some(&token),
            Some(json!({ "keyword": "  Clássico " })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["keyword"], "clássico");
        assert_eq!(body["book_id"], 1);

        let (status, _) = send(
            create_app(state.clone()),
            "POST",
            "/api/books/1/keywords",
            Some(&token),
            Some(json!({ "keyword": "CLÁSSICO" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(
            create_app(state),
            "POST",
            "/api/books/1/keywords",
            Some(&token),
            Some(json!({ "keyword": "x!" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_keyword_on_missing_book_is_not_found() {
        let state = fixture_state().await;
        let token = admin_token(&state).await;
        let (status, _) = send(
            create_app(state),
            "POST",
            "/api/books/42/keywords",
            Some(&token),
            Some(json!({ "keyword": "aventura" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_last_keyword_cannot_be_deleted() {
        let state = fixture_state().await;
        let token = admin_token(&state).await;
        let book = state.catalog.get_book(1).await.unwrap().unwrap();
        let only = book.keywords[0].id;

        let (status, _) = send(
            create_app(state.clone()),
            "DELETE",
            &format!("/api/keywords/{only}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, added) = send(
            create_app(state.clone()),
            "POST",
            "/api/books/1/keywords",
            Some(&token),
            Some(json!({ "keyword": "aviação" })),
        )
        .await;
        let (status, _) = send(
            create_app(state),
            "DELETE",
            &format!("/api/keywords/{}", added["id"]),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
