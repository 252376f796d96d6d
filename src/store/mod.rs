//! Persistence seams.
//!
//! Handlers and the search composer only see these traits. [`PgStore`] is the
//! production backend; [`MemoryStore`] backs the test-suite and database-less
//! development runs. Both enforce the same catalog invariants.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::models::{
    Book, BookImg, BookKeyword, BookPatch, NewBook, NewUser, RefreshToken, SavedBook,
    TaxonomyTerm, User, UserPatch,
};
use crate::search::{BookQuery, Page};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Maximum number of images a book may carry.
pub const MAX_BOOK_IMAGES: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{0}")]
    Conflict(String),

    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Book kinds and genres share one shape and one set of rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Taxonomy {
    Kind,
    Genre,
}

impl Taxonomy {
    pub fn entity(self) -> &'static str {
        match self {
            Taxonomy::Kind => "book kind",
            Taxonomy::Genre => "book genre",
        }
    }

    pub(crate) fn table(self) -> &'static str {
        match self {
            Taxonomy::Kind => "book_kinds",
            Taxonomy::Genre => "book_genres",
        }
    }

    pub(crate) fn book_column(self) -> &'static str {
        match self {
            Taxonomy::Kind => "kind_id",
            Taxonomy::Genre => "genre_id",
        }
    }
}

/// Existence checks the search runs before filtering on a foreign key.
#[async_trait]
pub trait ReferenceValidator: Send + Sync {
    async fn book_kind_exists(&self, id: i64) -> StoreResult<bool>;
    async fn book_genre_exists(&self, id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_book(&self, id: i64) -> StoreResult<Option<Book>>;

    /// Run `query` and return the requested 1-based page.
    async fn paginate_books(
        &self,
        query: &BookQuery,
        page: u32,
        per_page: u32,
    ) -> StoreResult<Page<Book>>;

    /// Rejects an unknown kind/genre, a case-insensitively duplicate name and
    /// an image URL already in use.
    async fn create_book(&self, book: NewBook) -> StoreResult<Book>;

    async fn update_book(&self, id: i64, patch: BookPatch) -> StoreResult<Book>;

    /// Removes the book together with its keywords, images and saved entries.
    async fn delete_book(&self, id: i64) -> StoreResult<()>;

    async fn add_keyword(&self, book_id: i64, keyword: String) -> StoreResult<BookKeyword>;

    /// Rejects removal of a book's last keyword.
    async fn delete_keyword(&self, id: i64) -> StoreResult<()>;

    /// Rejects a sixth image and a URL already in use.
    async fn add_image(&self, book_id: i64, url: String) -> StoreResult<BookImg>;

    /// Rejects removal of a book's last image.
    async fn delete_image(&self, id: i64) -> StoreResult<()>;
}

#[async_trait]
pub trait TaxonomyStore: Send + Sync {
    async fn list_terms(&self, taxonomy: Taxonomy) -> StoreResult<Vec<TaxonomyTerm>>;
    async fn get_term(&self, taxonomy: Taxonomy, id: i64) -> StoreResult<Option<TaxonomyTerm>>;
    /// `name` must already be normalized.
    async fn create_term(&self, taxonomy: Taxonomy, name: String) -> StoreResult<TaxonomyTerm>;
    async fn rename_term(
        &self,
        taxonomy: Taxonomy,
        id: i64,
        name: String,
    ) -> StoreResult<TaxonomyTerm>;
    /// Rejected while any book references the term.
    async fn delete_term(&self, taxonomy: Taxonomy, id: i64) -> StoreResult<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    /// Usernames compare case-insensitively.
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn get_user(&self, id: i64) -> StoreResult<Option<User>>;
    async fn update_user(&self, id: i64, patch: UserPatch) -> StoreResult<User>;
    /// Removes the user together with saved books and refresh tokens.
    async fn delete_user(&self, id: i64) -> StoreResult<()>;

    async fn store_refresh_token(
        &self,
        user_id: i64,
        token_hash: String,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;
    async fn find_refresh_token(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>>;
    async fn revoke_refresh_token(&self, token_hash: &str) -> StoreResult<()>;
    async fn revoke_user_tokens(&self, user_id: i64) -> StoreResult<()>;

    /// Rejects an unknown book and a pair that is already saved.
    async fn save_book(&self, user_id: i64, book_id: i64) -> StoreResult<SavedBook>;
    async fn unsave_book(&self, user_id: i64, book_id: i64) -> StoreResult<()>;
    /// Saved books in the order they were saved.
    async fn list_saved_books(
        &self,
        user_id: i64,
        page: u32,
        per_page: u32,
    ) -> StoreResult<Page<Book>>;
}

/// Everything a full backend provides.
pub trait Backend: CatalogStore + TaxonomyStore + UserStore + ReferenceValidator {}

impl<T> Backend for T where T: CatalogStore + TaxonomyStore + UserStore + ReferenceValidator {}
