//! Field rules applied to request bodies before they reach a store.

use chrono::{Datelike, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashSet;

use crate::store::MAX_BOOK_IMAGES;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;

pub const MIN_RELEASE_YEAR: i32 = 1000;
pub const MAX_URL_LEN: usize = 255;
pub const MAX_SEARCH_TEXT_LEN: usize = 100;

lazy_static::lazy_static! {
    /// Letters (diacritics included), digits and spaces
    static ref KEYWORD_REGEX: Regex = Regex::new(r"^[\p{L}\p{N} ]{3,20}$").unwrap();

    static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9_.-]{3,30}$").unwrap();
}

/// Largest price storable in `NUMERIC(6, 2)`.
pub fn max_price() -> Decimal {
    Decimal::new(999_999, 2)
}

fn bounded_text(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> ValidationResult<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min || len > max {
        return Err(ValidationError::new(
            field,
            format!("must be between {min} and {max} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn book_name(value: &str) -> ValidationResult<String> {
    bounded_text("name", value, 1, 100)
}

pub fn author(value: &str) -> ValidationResult<String> {
    bounded_text("author", value, 1, 100)
}

pub fn price(value: Decimal) -> ValidationResult<Decimal> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::new("price", "must be greater than zero"));
    }
    if value.normalize().scale() > 2 {
        return Err(ValidationError::new("price", "must have at most 2 decimal places"));
    }
    if value > max_price() {
        return Err(ValidationError::new("price", format!("must not exceed {}", max_price())));
    }
    Ok(value.round_dp(2))
}

pub fn release_year(value: i32) -> ValidationResult<i32> {
    let current = Utc::now().year();
    if !(MIN_RELEASE_YEAR..=current).contains(&value) {
        return Err(ValidationError::new(
            "release_year",
            format!("must be between {MIN_RELEASE_YEAR} and {current}"),
        ));
    }
    Ok(value)
}

pub fn positive_id(field: &'static str, value: i64) -> ValidationResult<i64> {
    if value <= 0 {
        return Err(ValidationError::new(field, "must be a positive integer"));
    }
    Ok(value)
}

/// Trim and lowercase a kind or genre name.
pub fn term_name(value: &str) -> ValidationResult<String> {
    let normalized = bounded_text("name", value, 2, 50)?.to_lowercase();
    Ok(normalized)
}

pub fn keyword(value: &str) -> ValidationResult<String> {
    let normalized = value.trim().to_lowercase();
    if !KEYWORD_REGEX.is_match(&normalized) {
        return Err(ValidationError::new(
            "keyword",
            "must be 3 to 20 letters, digits or spaces",
        ));
    }
    Ok(normalized)
}

/// Normalize keywords, dropping duplicates while keeping first-seen order.
pub fn keywords(values: &[String]) -> ValidationResult<Vec<String>> {
    if values.is_empty() {
        return Err(ValidationError::new("keywords", "at least one keyword is required"));
    }
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(values.len());
    for value in values {
        let k = keyword(value)?;
        if seen.insert(k.clone()) {
            normalized.push(k);
        }
    }
    Ok(normalized)
}

pub fn image_url(value: &str) -> ValidationResult<String> {
    let url = value.trim();
    if url.is_empty() || url.len() > MAX_URL_LEN || url.chars().any(char::is_whitespace) {
        return Err(ValidationError::new(
            "url",
            format!("must be a non-empty URL of at most {MAX_URL_LEN} characters"),
        ));
    }
    Ok(url.to_string())
}

pub fn images(values: &[String]) -> ValidationResult<Vec<String>> {
    if values.is_empty() || values.len() > MAX_BOOK_IMAGES {
        return Err(ValidationError::new(
            "images",
            format!("between 1 and {MAX_BOOK_IMAGES} images are required"),
        ));
    }
    let mut seen = HashSet::new();
    let mut urls = Vec::with_capacity(values.len());
    for value in values {
        let url = image_url(value)?;
        if !seen.insert(url.clone()) {
            return Err(ValidationError::new("images", format!("duplicate image {url}")));
        }
        urls.push(url);
    }
    Ok(urls)
}

pub fn username(value: &str) -> ValidationResult<String> {
    let trimmed = value.trim();
    if !USERNAME_REGEX.is_match(trimmed) {
        return Err(ValidationError::new(
            "username",
            "must be 3 to 30 letters, digits, '.', '_' or '-'",
        ));
    }
    Ok(trimmed.to_string())
}

pub fn password(value: &str) -> ValidationResult<()> {
    let len = value.chars().count();
    if !(8..=128).contains(&len) {
        return Err(ValidationError::new(
            "password",
            "must be between 8 and 128 characters",
        ));
    }
    Ok(())
}

pub fn search_text(value: &str) -> ValidationResult<String> {
    let trimmed = value.trim();
    if trimmed.chars().count() > MAX_SEARCH_TEXT_LEN {
        return Err(ValidationError::new(
            "text",
            format!("must be at most {MAX_SEARCH_TEXT_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn search_price(field: &'static str, value: Decimal) -> ValidationResult<Decimal> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::new(field, "must be greater than zero"));
    }
    Ok(value)
}

pub fn search_year(value: i32) -> ValidationResult<i32> {
    if value <= 0 {
        return Err(ValidationError::new("release_year", "must be a positive integer"));
    }
    Ok(value)
}
