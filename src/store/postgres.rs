//! PostgreSQL backend.
//!
//! Uniqueness and referential rules live in the schema (`db::run_migrations`);
//! the pre-checks here exist to turn the common violations into readable
//! conflict messages before the database raises them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;

use super::{
    CatalogStore, ReferenceValidator, StoreError, StoreResult, Taxonomy, TaxonomyStore, UserStore,
    MAX_BOOK_IMAGES,
};
use crate::db::models::{
    Book, BookImg, BookKeyword, BookPatch, NewBook, NewUser, RefreshToken, SavedBook,
    TaxonomyTerm, User, UserPatch,
};
use crate::search::pagination::page_offset;
use crate::search::{BookOrder, BookQuery, Page, Predicate, PredicateSet};

const BOOK_COLUMNS: &str = "b.id, b.name, b.price, b.author, b.release_year, b.kind_id, b.genre_id";
const USER_COLUMNS: &str = "id, username, password_hash, img_url, role, created_at";

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Map constraint violations to `Conflict`, everything else to `Database`.
fn constraint_error(err: sqlx::Error, message: &str) -> StoreError {
    let code = err
        .as_database_error()
        .and_then(|e| e.code())
        .map(|c| c.into_owned());
    match code.as_deref() {
        Some(UNIQUE_VIOLATION) | Some(FOREIGN_KEY_VIOLATION) => StoreError::conflict(message),
        _ => StoreError::Database(err),
    }
}

/// Escape `LIKE` wildcards so user text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Append ` WHERE ...` for the predicate set to a query over `books b`.
pub(crate) fn push_predicates(builder: &mut QueryBuilder<'_, Postgres>, predicates: &PredicateSet) {
    builder.push(" WHERE TRUE");
    for predicate in predicates.iter() {
        match predicate {
            Predicate::Text(text) => {
                let pattern = format!("%{}%", escape_like(text));
                builder
                    .push(" AND (b.name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" ESCAPE '\\' OR b.author ILIKE ")
                    .push_bind(pattern)
                    .push(
                        " ESCAPE '\\' OR EXISTS (SELECT 1 FROM book_keywords k \
                         WHERE k.book_id = b.id AND LOWER(k.keyword) = LOWER(",
                    )
                    .push_bind(text.clone())
                    .push(")))");
            }
            Predicate::KindId(id) => {
                builder.push(" AND b.kind_id = ").push_bind(*id);
            }
            Predicate::GenreId(id) => {
                builder.push(" AND b.genre_id = ").push_bind(*id);
            }
            Predicate::ReleaseYear(year) => {
                builder.push(" AND b.release_year = ").push_bind(*year);
            }
            Predicate::MinPrice(min) => {
                builder.push(" AND b.price >= ").push_bind(*min);
            }
            Predicate::MaxPrice(max) => {
                builder.push(" AND b.price <= ").push_bind(*max);
            }
        }
    }
}

fn push_order(builder: &mut QueryBuilder<'_, Postgres>, order: BookOrder) {
    match order {
        BookOrder::IdAsc => builder.push(" ORDER BY b.id ASC"),
    };
}

fn page_query(query: &BookQuery, page: u32, per_page: u32) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {BOOK_COLUMNS} FROM books b"));
    push_predicates(&mut builder, &query.predicates);
    push_order(&mut builder, query.order);
    builder
        .push(" LIMIT ")
        .push_bind(i64::from(per_page))
        .push(" OFFSET ")
        .push_bind(page_offset(page, per_page) as i64);
    builder
}

fn count_query(query: &BookQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM books b");
    push_predicates(&mut builder, &query.predicates);
    builder
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Load keywords and images for `books` in two round-trips.
    async fn attach_children(&self, books: &mut [Book]) -> StoreResult<()> {
        if books.is_empty() {
            return Ok(());
        }
        let ids: Vec<i64> = books.iter().map(|b| b.id).collect();
        let index: HashMap<i64, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let keywords = sqlx::query_as::<_, BookKeyword>(
            "SELECT id, book_id, keyword FROM book_keywords WHERE book_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let images = sqlx::query_as::<_, BookImg>(
            "SELECT id, book_id, url FROM book_images WHERE book_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        for keyword in keywords {
            if let Some(&i) = index.get(&keyword.book_id) {
                books[i].keywords.push(keyword);
            }
        }
        for image in images {
            if let Some(&i) = index.get(&image.book_id) {
                books[i].images.push(image);
            }
        }
        Ok(())
    }

    async fn require_book(&self, id: i64) -> StoreResult<Book> {
        self.get_book(id)
            .await?
            .ok_or_else(|| StoreError::not_found("book", id))
    }
}

async fn term_exists(
    tx: &mut Transaction<'_, Postgres>,
    taxonomy: Taxonomy,
    id: i64,
) -> StoreResult<bool> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)", taxonomy.table());
    Ok(sqlx::query_scalar::<_, bool>(&sql)
        .bind(id)
        .fetch_one(&mut **tx)
        .await?)
}

async fn ensure_term(
    tx: &mut Transaction<'_, Postgres>,
    taxonomy: Taxonomy,
    id: i64,
) -> StoreResult<()> {
    if term_exists(tx, taxonomy, id).await? {
        Ok(())
    } else {
        Err(StoreError::not_found(taxonomy.entity(), id))
    }
}

fn term_name_taken_sql(taxonomy: Taxonomy) -> String {
    format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE name = $1 AND id IS DISTINCT FROM $2)",
        taxonomy.table()
    )
}

/// Whether another term of `taxonomy` already uses `name`. `except` skips
/// the term being renamed.
async fn term_name_taken(
    pool: &PgPool,
    taxonomy: Taxonomy,
    name: &str,
    except: Option<i64>,
) -> StoreResult<bool> {
    Ok(sqlx::query_scalar::<_, bool>(&term_name_taken_sql(taxonomy))
        .bind(name)
        .bind(except)
        .fetch_one(pool)
        .await?)
}

async fn book_name_taken(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
    except: Option<i64>,
) -> StoreResult<bool> {
    Ok(sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM books \
         WHERE LOWER(name) = LOWER($1) AND id IS DISTINCT FROM $2)",
    )
    .bind(name)
    .bind(except)
    .fetch_one(&mut **tx)
    .await?)
}

async fn image_url_taken(tx: &mut Transaction<'_, Postgres>, url: &str) -> StoreResult<bool> {
    Ok(
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM book_images WHERE url = $1)")
            .bind(url)
            .fetch_one(&mut **tx)
            .await?,
    )
}

/// Lock the parent row so child counts cannot change under a check.
async fn lock_book(tx: &mut Transaction<'_, Postgres>, id: i64) -> StoreResult<()> {
    let found = sqlx::query_scalar::<_, i64>("SELECT id FROM books WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    found
        .map(|_| ())
        .ok_or_else(|| StoreError::not_found("book", id))
}

#[async_trait]
impl ReferenceValidator for PgStore {
    async fn book_kind_exists(&self, id: i64) -> StoreResult<bool> {
        Ok(
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM book_kinds WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn book_genre_exists(&self, id: i64) -> StoreResult<bool> {
        Ok(
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM book_genres WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?,
        )
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn get_book(&self, id: i64) -> StoreResult<Option<Book>> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books b WHERE b.id = $1");
        let Some(book) = sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        let mut books = [book];
        self.attach_children(&mut books).await?;
        let [book] = books;
        Ok(Some(book))
    }

    async fn paginate_books(
        &self,
        query: &BookQuery,
        page: u32,
        per_page: u32,
    ) -> StoreResult<Page<Book>> {
        let total: i64 = count_query(query)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;
        let mut books: Vec<Book> = page_query(query, page, per_page)
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;
        self.attach_children(&mut books).await?;
        Ok(Page::new(books, total.max(0) as u64, page, per_page))
    }

    async fn create_book(&self, book: NewBook) -> StoreResult<Book> {
        if book.keywords.is_empty() {
            return Err(StoreError::conflict("A book needs at least one keyword"));
        }
        if book.images.is_empty() || book.images.len() > MAX_BOOK_IMAGES {
            return Err(StoreError::conflict(format!(
                "A book needs between 1 and {MAX_BOOK_IMAGES} images"
            )));
        }

        let mut tx = self.pool.begin().await?;

        ensure_term(&mut tx, Taxonomy::Kind, book.kind_id).await?;
        ensure_term(&mut tx, Taxonomy::Genre, book.genre_id).await?;
        if book_name_taken(&mut tx, &book.name, None).await? {
            return Err(StoreError::conflict("A book with this name already exists"));
        }
        for url in &book.images {
            if image_url_taken(&mut tx, url).await? {
                return Err(StoreError::conflict(format!("Image URL already in use: {url}")));
            }
        }

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO books (name, price, author, release_year, kind_id, genre_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&book.name)
        .bind(book.price)
        .bind(&book.author)
        .bind(book.release_year)
        .bind(book.kind_id)
        .bind(book.genre_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| constraint_error(e, "A book with this name already exists"))?;

        for keyword in &book.keywords {
            sqlx::query("INSERT INTO book_keywords (book_id, keyword) VALUES ($1, $2)")
                .bind(id)
                .bind(keyword)
                .execute(&mut *tx)
                .await
                .map_err(|e| constraint_error(e, "Duplicate keyword"))?;
        }
        for url in &book.images {
            sqlx::query("INSERT INTO book_images (book_id, url) VALUES ($1, $2)")
                .bind(id)
                .bind(url)
                .execute(&mut *tx)
                .await
                .map_err(|e| constraint_error(e, "Image URL already in use"))?;
        }

        tx.commit().await?;
        tracing::info!(book_id = id, name = %book.name, "book created");

        self.require_book(id).await
    }

    async fn update_book(&self, id: i64, patch: BookPatch) -> StoreResult<Book> {
        let mut tx = self.pool.begin().await?;

        lock_book(&mut tx, id).await?;
        if let Some(kind_id) = patch.kind_id {
            ensure_term(&mut tx, Taxonomy::Kind, kind_id).await?;
        }
        if let Some(genre_id) = patch.genre_id {
            ensure_term(&mut tx, Taxonomy::Genre, genre_id).await?;
        }
        if let Some(name) = &patch.name {
            if book_name_taken(&mut tx, name, Some(id)).await? {
                return Err(StoreError::conflict("A book with this name already exists"));
            }
        }

        sqlx::query(
            r#"
            UPDATE books
            SET name = COALESCE($1, name),
                price = COALESCE($2, price),
                author = COALESCE($3, author),
                release_year = COALESCE($4, release_year),
                kind_id = COALESCE($5, kind_id),
                genre_id = COALESCE($6, genre_id)
            WHERE id = $7
            "#,
        )
        .bind(&patch.name)
        .bind(patch.price)
        .bind(&patch.author)
        .bind(patch.release_year)
        .bind(patch.kind_id)
        .bind(patch.genre_id)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| constraint_error(e, "A book with this name already exists"))?;

        tx.commit().await?;

        self.require_book(id).await
    }

    async fn delete_book(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("book", id));
        }
        tracing::info!(book_id = id, "book deleted");
        Ok(())
    }

    async fn add_keyword(&self, book_id: i64, keyword: String) -> StoreResult<BookKeyword> {
        let mut tx = self.pool.begin().await?;
        lock_book(&mut tx, book_id).await?;

        let created = sqlx::query_as::<_, BookKeyword>(
            "INSERT INTO book_keywords (book_id, keyword) VALUES ($1, $2) \
             RETURNING id, book_id, keyword",
        )
        .bind(book_id)
        .bind(&keyword)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| constraint_error(e, "The book already has this keyword"))?;

        tx.commit().await?;
        Ok(created)
    }

    async fn delete_keyword(&self, id: i64) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let book_id =
            sqlx::query_scalar::<_, i64>("SELECT book_id FROM book_keywords WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| StoreError::not_found("book keyword", id))?;
        lock_book(&mut tx, book_id).await?;

        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM book_keywords WHERE book_id = $1")
                .bind(book_id)
                .fetch_one(&mut *tx)
                .await?;
        if remaining <= 1 {
            return Err(StoreError::conflict("A book must keep at least one keyword"));
        }

        sqlx::query("DELETE FROM book_keywords WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn add_image(&self, book_id: i64, url: String) -> StoreResult<BookImg> {
        let mut tx = self.pool.begin().await?;
        lock_book(&mut tx, book_id).await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_images WHERE book_id = $1")
            .bind(book_id)
            .fetch_one(&mut *tx)
            .await?;
        if count as usize >= MAX_BOOK_IMAGES {
            return Err(StoreError::conflict(format!(
                "A book cannot have more than {MAX_BOOK_IMAGES} images"
            )));
        }
        if image_url_taken(&mut tx, &url).await? {
            return Err(StoreError::conflict(format!("Image URL already in use: {url}")));
        }

        let created = sqlx::query_as::<_, BookImg>(
            "INSERT INTO book_images (book_id, url) VALUES ($1, $2) RETURNING id, book_id, url",
        )
        .bind(book_id)
        .bind(&url)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| constraint_error(e, "Image URL already in use"))?;

        tx.commit().await?;
        Ok(created)
    }

    async fn delete_image(&self, id: i64) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let book_id = sqlx::query_scalar::<_, i64>("SELECT book_id FROM book_images WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found("book image", id))?;
        lock_book(&mut tx, book_id).await?;

        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM book_images WHERE book_id = $1")
                .bind(book_id)
                .fetch_one(&mut *tx)
                .await?;
        if remaining <= 1 {
            return Err(StoreError::conflict("A book must keep at least one image"));
        }

        sqlx::query("DELETE FROM book_images WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl TaxonomyStore for PgStore {
    async fn list_terms(&self, taxonomy: Taxonomy) -> StoreResult<Vec<TaxonomyTerm>> {
        let sql = format!("SELECT id, name FROM {} ORDER BY id", taxonomy.table());
        Ok(sqlx::query_as::<_, TaxonomyTerm>(&sql).fetch_all(&self.pool).await?)
    }

    async fn get_term(&self, taxonomy: Taxonomy, id: i64) -> StoreResult<Option<TaxonomyTerm>> {
        let sql = format!("SELECT id, name FROM {} WHERE id = $1", taxonomy.table());
        Ok(sqlx::query_as::<_, TaxonomyTerm>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_term(&self, taxonomy: Taxonomy, name: String) -> StoreResult<TaxonomyTerm> {
        let message = format!("{} '{}' already exists", taxonomy.entity(), name);
        if term_name_taken(&self.pool, taxonomy, &name, None).await? {
            return Err(StoreError::conflict(message));
        }

        let sql = format!(
            "INSERT INTO {} (name) VALUES ($1) RETURNING id, name",
            taxonomy.table()
        );
        sqlx::query_as::<_, TaxonomyTerm>(&sql)
            .bind(&name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| constraint_error(e, &message))
    }

    async fn rename_term(
        &self,
        taxonomy: Taxonomy,
        id: i64,
        name: String,
    ) -> StoreResult<TaxonomyTerm> {
        let message = format!("{} '{}' already exists", taxonomy.entity(), name);
        if term_name_taken(&self.pool, taxonomy, &name, Some(id)).await? {
            return Err(StoreError::conflict(message));
        }

        let sql = format!(
            "UPDATE {} SET name = $1 WHERE id = $2 RETURNING id, name",
            taxonomy.table()
        );
        sqlx::query_as::<_, TaxonomyTerm>(&sql)
            .bind(&name)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| constraint_error(e, &message))?
            .ok_or_else(|| StoreError::not_found(taxonomy.entity(), id))
    }

    async fn delete_term(&self, taxonomy: Taxonomy, id: i64) -> StoreResult<()> {
        let in_use = format!(
            "{} {} is still used by at least one book",
            taxonomy.entity(),
            id
        );
        let mut tx = self.pool.begin().await?;
        ensure_term(&mut tx, taxonomy, id).await?;

        let linked_sql = format!(
            "SELECT EXISTS(SELECT 1 FROM books WHERE {} = $1)",
            taxonomy.book_column()
        );
        let linked: bool = sqlx::query_scalar(&linked_sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if linked {
            return Err(StoreError::conflict(in_use));
        }

        let delete_sql = format!("DELETE FROM {} WHERE id = $1", taxonomy.table());
        sqlx::query(&delete_sql)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| constraint_error(e, &in_use))?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        if self.find_user_by_username(&user.username).await?.is_some() {
            return Err(StoreError::conflict("Username already taken"));
        }
        let sql = format!(
            "INSERT INTO users (username, password_hash, img_url, role) VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.img_url)
            .bind(&user.role)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| constraint_error(e, "Username or image URL already in use"))
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(username) = LOWER($1)");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_user(&self, id: i64, patch: UserPatch) -> StoreResult<User> {
        let sql = format!(
            "UPDATE users SET password_hash = COALESCE($1, password_hash), \
             img_url = COALESCE($2, img_url) WHERE id = $3 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&patch.password_hash)
            .bind(&patch.img_url)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| constraint_error(e, "Image URL already in use"))?
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("user", id));
        }
        Ok(())
    }

    async fn store_refresh_token(
        &self,
        user_id: i64,
        token_hash: String,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(&token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_refresh_token(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>> {
        Ok(sqlx::query_as::<_, RefreshToken>(
            "SELECT id, user_id, token_hash, expires_at, revoked FROM refresh_tokens \
             WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn revoke_refresh_token(&self, token_hash: &str) -> StoreResult<()> {
        sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_user_tokens(&self, user_id: i64) -> StoreResult<()> {
        sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_book(&self, user_id: i64, book_id: i64) -> StoreResult<SavedBook> {
        self.require_book(book_id).await?;
        let already: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM saved_books WHERE user_id = $1 AND book_id = $2)",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        if already {
            return Err(StoreError::conflict("Book already saved"));
        }

        sqlx::query_as::<_, SavedBook>(
            "INSERT INTO saved_books (user_id, book_id) VALUES ($1, $2) \
             RETURNING id, user_id, book_id",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint_error(e, "Book already saved"))
    }

    async fn unsave_book(&self, user_id: i64, book_id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM saved_books WHERE user_id = $1 AND book_id = $2")
            .bind(user_id)
            .bind(book_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("saved book", book_id));
        }
        Ok(())
    }

    async fn list_saved_books(
        &self,
        user_id: i64,
        page: u32,
        per_page: u32,
    ) -> StoreResult<Page<Book>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM saved_books WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {BOOK_COLUMNS} FROM saved_books s JOIN books b ON b.id = s.book_id \
             WHERE s.user_id = $1 ORDER BY s.id ASC LIMIT $2 OFFSET $3"
        );
        let mut books = sqlx::query_as::<_, Book>(&sql)
            .bind(user_id)
            .bind(i64::from(per_page))
            .bind(page_offset(page, per_page) as i64)
            .fetch_all(&self.pool)
            .await?;
        self.attach_children(&mut books).await?;
        Ok(Page::new(books, total.max(0) as u64, page, per_page))
    }
}
