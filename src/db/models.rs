//! Database Models - structs representing database tables (used by sqlx/serde).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// Book kind or genre: a normalized, unique name referenced by many books.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct TaxonomyTerm {
    pub id: i64,
    pub name: String,
}

pub type BookKind = TaxonomyTerm;
pub type BookGenre = TaxonomyTerm;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct BookKeyword {
    pub id: i64,
    pub book_id: i64,
    pub keyword: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct BookImg {
    pub id: i64,
    pub book_id: i64,
    pub url: String,
}

/// Book model. Keywords and images are loaded separately and ordered by id.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    pub author: String,
    pub release_year: i32,
    pub kind_id: i64,
    pub genre_id: i64,
    #[sqlx(skip)]
    pub keywords: Vec<BookKeyword>,
    #[sqlx(skip)]
    pub images: Vec<BookImg>,
}

/// New book for insertion. Keywords are already normalized.
#[derive(Debug, Clone)]
pub struct NewBook {
    pub name: String,
    pub price: Decimal,
    pub author: String,
    pub release_year: i32,
    pub kind_id: i64,
    pub genre_id: i64,
    pub keywords: Vec<String>,
    pub images: Vec<String>,
}

/// Partial book update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct BookPatch {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub author: Option<String>,
    pub release_year: Option<i32>,
    pub kind_id: Option<i64>,
    pub genre_id: Option<i64>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.author.is_none()
            && self.release_year.is_none()
            && self.kind_id.is_none()
            && self.genre_id.is_none()
    }

    pub fn apply_to(&self, book: &mut Book) {
        if let Some(name) = &self.name {
            book.name = name.clone();
        }
        if let Some(price) = self.price {
            book.price = price;
        }
        if let Some(author) = &self.author {
            book.author = author.clone();
        }
        if let Some(year) = self.release_year {
            book.release_year = year;
        }
        if let Some(kind_id) = self.kind_id {
            book.kind_id = kind_id;
        }
        if let Some(genre_id) = self.genre_id {
            book.genre_id = genre_id;
        }
    }
}

/// User model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub img_url: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// New user for insertion
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub img_url: Option<String>,
    pub role: String,
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub password_hash: Option<String>,
    pub img_url: Option<String>,
}

/// Refresh token model
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl RefreshToken {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SavedBook {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
}
