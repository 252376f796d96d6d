/**
 * Routes Module
 * API route handlers
 */
use serde::Deserialize;

use crate::validation::{ValidationError, ValidationResult};

pub mod auth;
pub mod books;
pub mod envelope;
pub mod extract;
pub mod health;
pub mod images;
pub mod keywords;
pub mod search;
pub mod taxonomy;
pub mod upload;
pub mod users;

pub use crate::error::ErrorResponse;
pub use envelope::PageEnvelope;
pub use extract::{ApiJson, ApiPath, ApiQuery};

/// `?page=` on listing endpoints; defaults to the first page.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

impl PageQuery {
    pub fn resolve(&self) -> ValidationResult<u32> {
        resolve_page(self.page)
    }
}

pub fn resolve_page(page: Option<u32>) -> ValidationResult<u32> {
    match page {
        None => Ok(1),
        Some(0) => Err(ValidationError::new("page", "must be a positive integer")),
        Some(page) => Ok(page),
    }
}
