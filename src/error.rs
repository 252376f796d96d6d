//! HTTP-facing error type shared by every handler.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::search::SearchError;
use crate::store::StoreError;
use crate::validation::ValidationError;

pub type AppResult<T> = Result<T, AppError>;

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("{}{}", .error, .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct AppError {
    pub status: StatusCode,
    pub error: String,
    pub message: Option<String>,
}

impl AppError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    pub fn unauthorized(error: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, error)
    }

    pub fn forbidden(error: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, error)
    }

    pub fn not_found(error: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, error)
    }

    pub fn conflict(error: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, error)
    }

    pub fn rate_limited(error: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, error)
    }

    pub fn internal(error: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }

    pub fn unavailable(error: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, error)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.error,
                message: self.message,
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => {
                Self::not_found("Not found").with_message(err.to_string())
            }
            StoreError::Conflict(message) => Self::conflict("Conflict").with_message(message),
            StoreError::Database(e) => {
                tracing::error!(error = ?e, "database operation failed");
                Self::internal("Database error")
            }
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::bad_request("Invalid request").with_message(err.to_string())
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::UnknownReference { .. } => {
                Self::not_found("Not found").with_message(err.to_string())
            }
            SearchError::Store(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_statuses() {
        let not_found: AppError = StoreError::NotFound {
            entity: "book",
            id: 4,
        }
        .into();
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);
        assert_eq!(not_found.message.as_deref(), Some("book 4 not found"));

        let conflict: AppError = StoreError::Conflict("taken".into()).into();
        assert_eq!(conflict.status, StatusCode::CONFLICT);

        let db: AppError = StoreError::Database(sqlx::Error::RowNotFound).into();
        assert_eq!(db.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(db.message.is_none());
    }

    #[test]
    fn test_display_joins_error_and_message() {
        let err = AppError::conflict("Conflict").with_message("Book already saved");
        assert_eq!(err.to_string(), "Conflict: Book already saved");
        assert_eq!(AppError::unauthorized("Unauthorized").to_string(), "Unauthorized");
    }

    #[test]
    fn test_error_response_omits_empty_message() {
        let body = ErrorResponse {
            error: "Not found".to_string(),
            message: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"error":"Not found"}"#);
    }
}
