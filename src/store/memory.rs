//! In-process backend over id-keyed maps behind a single `RwLock`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;

use super::{
    CatalogStore, ReferenceValidator, StoreError, StoreResult, Taxonomy, TaxonomyStore, UserStore,
    MAX_BOOK_IMAGES,
};
use crate::db::models::{
    Book, BookImg, BookKeyword, BookPatch, NewBook, NewUser, RefreshToken, SavedBook,
    TaxonomyTerm, User, UserPatch,
};
use crate::search::{BookOrder, BookQuery, Page};

#[derive(Debug, Default)]
struct Sequences {
    kind: i64,
    genre: i64,
    book: i64,
    keyword: i64,
    image: i64,
    user: i64,
    token: i64,
    saved: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Default)]
struct Tables {
    seq: Sequences,
    kinds: BTreeMap<i64, TaxonomyTerm>,
    genres: BTreeMap<i64, TaxonomyTerm>,
    books: BTreeMap<i64, Book>,
    users: BTreeMap<i64, User>,
    refresh_tokens: HashMap<String, RefreshToken>,
    saved: BTreeMap<i64, SavedBook>,
}

impl Tables {
    fn terms(&self, taxonomy: Taxonomy) -> &BTreeMap<i64, TaxonomyTerm> {
        match taxonomy {
            Taxonomy::Kind => &self.kinds,
            Taxonomy::Genre => &self.genres,
        }
    }

    fn terms_mut(&mut self, taxonomy: Taxonomy) -> &mut BTreeMap<i64, TaxonomyTerm> {
        match taxonomy {
            Taxonomy::Kind => &mut self.kinds,
            Taxonomy::Genre => &mut self.genres,
        }
    }

    fn term_sequence(&mut self, taxonomy: Taxonomy) -> &mut i64 {
        match taxonomy {
            Taxonomy::Kind => &mut self.seq.kind,
            Taxonomy::Genre => &mut self.seq.genre,
        }
    }

    fn ensure_term(&self, taxonomy: Taxonomy, id: i64) -> StoreResult<()> {
        if self.terms(taxonomy).contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::not_found(taxonomy.entity(), id))
        }
    }

    fn name_taken(&self, name: &str, except: Option<i64>) -> bool {
        let name = name.to_lowercase();
        self.books
            .values()
            .any(|b| Some(b.id) != except && b.name.to_lowercase() == name)
    }

    fn image_url_taken(&self, url: &str) -> bool {
        self.books
            .values()
            .flat_map(|b| b.images.iter())
            .any(|img| img.url == url)
    }

    fn user_img_taken(&self, url: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| Some(u.id) != except && u.img_url.as_deref() == Some(url))
    }

    fn book_mut(&mut self, id: i64) -> StoreResult<&mut Book> {
        self.books
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("book", id))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReferenceValidator for MemoryStore {
    async fn book_kind_exists(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.read().await.kinds.contains_key(&id))
    }

    async fn book_genre_exists(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.read().await.genres.contains_key(&id))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get_book(&self, id: i64) -> StoreResult<Option<Book>> {
        Ok(self.tables.read().await.books.get(&id).cloned())
    }

    async fn paginate_books(
        &self,
        query: &BookQuery,
        page: u32,
        per_page: u32,
    ) -> StoreResult<Page<Book>> {
        let tables = self.tables.read().await;
        let matching: Vec<Book> = match query.order {
            BookOrder::IdAsc => tables
                .books
                .values()
                .filter(|b| query.predicates.matches(b))
                .cloned()
                .collect(),
        };
        Ok(Page::from_ordered(matching, page, per_page))
    }

    async fn create_book(&self, book: NewBook) -> StoreResult<Book> {
        let mut tables = self.tables.write().await;

        tables.ensure_term(Taxonomy::Kind, book.kind_id)?;
        tables.ensure_term(Taxonomy::Genre, book.genre_id)?;
        if tables.name_taken(&book.name, None) {
            return Err(StoreError::conflict("A book with this name already exists"));
        }
        if book.keywords.is_empty() {
            return Err(StoreError::conflict("A book needs at least one keyword"));
        }
        if book.images.is_empty() || book.images.len() > MAX_BOOK_IMAGES {
            return Err(StoreError::conflict(format!(
                "A book needs between 1 and {MAX_BOOK_IMAGES} images"
            )));
        }
        let mut urls = HashSet::new();
        for url in &book.images {
            if !urls.insert(url.as_str()) || tables.image_url_taken(url) {
                return Err(StoreError::conflict(format!("Image URL already in use: {url}")));
            }
        }
        let mut seen = HashSet::new();
        if !book.keywords.iter().all(|k| seen.insert(k.as_str())) {
            return Err(StoreError::conflict("Duplicate keyword"));
        }

        let id = next_id(&mut tables.seq.book);
        let mut keywords = Vec::with_capacity(book.keywords.len());
        for keyword in book.keywords {
            keywords.push(BookKeyword {
                id: next_id(&mut tables.seq.keyword),
                book_id: id,
                keyword,
            });
        }
        let mut images = Vec::with_capacity(book.images.len());
        for url in book.images {
            images.push(BookImg {
                id: next_id(&mut tables.seq.image),
                book_id: id,
                url,
            });
        }

        let created = Book {
            id,
            name: book.name,
            price: book.price,
            author: book.author,
            release_year: book.release_year,
            kind_id: book.kind_id,
            genre_id: book.genre_id,
            keywords,
            images,
        };
        tables.books.insert(id, created.clone());
        Ok(created)
    }

    async fn update_book(&self, id: i64, patch: BookPatch) -> StoreResult<Book> {
        let mut tables = self.tables.write().await;

        if !tables.books.contains_key(&id) {
            return Err(StoreError::not_found("book", id));
        }
        if let Some(kind_id) = patch.kind_id {
            tables.ensure_term(Taxonomy::Kind, kind_id)?;
        }
        if let Some(genre_id) = patch.genre_id {
            tables.ensure_term(Taxonomy::Genre, genre_id)?;
        }
        if let Some(name) = &patch.name {
            if tables.name_taken(name, Some(id)) {
                return Err(StoreError::conflict("A book with this name already exists"));
            }
        }

        let book = tables.book_mut(id)?;
        patch.apply_to(book);
        Ok(book.clone())
    }

    async fn delete_book(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.books.remove(&id).is_none() {
            return Err(StoreError::not_found("book", id));
        }
        tables.saved.retain(|_, s| s.book_id != id);
        Ok(())
    }

    async fn add_keyword(&self, book_id: i64, keyword: String) -> StoreResult<BookKeyword> {
        let mut tables = self.tables.write().await;
        let keyword_id = tables.seq.keyword + 1;
        let book = tables.book_mut(book_id)?;
        if book.keywords.iter().any(|k| k.keyword == keyword) {
            return Err(StoreError::conflict("The book already has this keyword"));
        }
        let created = BookKeyword {
            id: keyword_id,
            book_id,
            keyword,
        };
        book.keywords.push(created.clone());
        tables.seq.keyword = keyword_id;
        Ok(created)
    }

    async fn delete_keyword(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let book = tables
            .books
            .values_mut()
            .find(|b| b.keywords.iter().any(|k| k.id == id))
            .ok_or_else(|| StoreError::not_found("book keyword", id))?;
        if book.keywords.len() <= 1 {
            return Err(StoreError::conflict("A book must keep at least one keyword"));
        }
        book.keywords.retain(|k| k.id != id);
        Ok(())
    }

    async fn add_image(&self, book_id: i64, url: String) -> StoreResult<BookImg> {
        let mut tables = self.tables.write().await;
        if !tables.books.contains_key(&book_id) {
            return Err(StoreError::not_found("book", book_id));
        }
        if tables.image_url_taken(&url) {
            return Err(StoreError::conflict(format!("Image URL already in use: {url}")));
        }
        let image_id = tables.seq.image + 1;
        let book = tables.book_mut(book_id)?;
        if book.images.len() >= MAX_BOOK_IMAGES {
            return Err(StoreError::conflict(format!(
                "A book cannot have more than {MAX_BOOK_IMAGES} images"
            )));
        }
        let created = BookImg {
            id: image_id,
            book_id,
            url,
        };
        book.images.push(created.clone());
        tables.seq.image = image_id;
        Ok(created)
    }

    async fn delete_image(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let book = tables
            .books
            .values_mut()
            .find(|b| b.images.iter().any(|img| img.id == id))
            .ok_or_else(|| StoreError::not_found("book image", id))?;
        if book.images.len() <= 1 {
            return Err(StoreError::conflict("A book must keep at least one image"));
        }
        book.images.retain(|img| img.id != id);
        Ok(())
    }
}

#[async_trait]
impl TaxonomyStore for MemoryStore {
    async fn list_terms(&self, taxonomy: Taxonomy) -> StoreResult<Vec<TaxonomyTerm>> {
        Ok(self.tables.read().await.terms(taxonomy).values().cloned().collect())
    }

    async fn get_term(&self, taxonomy: Taxonomy, id: i64) -> StoreResult<Option<TaxonomyTerm>> {
        Ok(self.tables.read().await.terms(taxonomy).get(&id).cloned())
    }

    async fn create_term(&self, taxonomy: Taxonomy, name: String) -> StoreResult<TaxonomyTerm> {
        let mut tables = self.tables.write().await;
        if tables.terms(taxonomy).values().any(|t| t.name == name) {
            return Err(StoreError::conflict(format!(
                "{} '{}' already exists",
                taxonomy.entity(),
                name
            )));
        }
        let id = next_id(tables.term_sequence(taxonomy));
        let term = TaxonomyTerm { id, name };
        tables.terms_mut(taxonomy).insert(id, term.clone());
        Ok(term)
    }

    async fn rename_term(
        &self,
        taxonomy: Taxonomy,
        id: i64,
        name: String,
    ) -> StoreResult<TaxonomyTerm> {
        let mut tables = self.tables.write().await;
        if tables
            .terms(taxonomy)
            .values()
            .any(|t| t.id != id && t.name == name)
        {
            return Err(StoreError::conflict(format!(
                "{} '{}' already exists",
                taxonomy.entity(),
                name
            )));
        }
        let term = tables
            .terms_mut(taxonomy)
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(taxonomy.entity(), id))?;
        term.name = name;
        Ok(term.clone())
    }

    async fn delete_term(&self, taxonomy: Taxonomy, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.ensure_term(taxonomy, id)?;
        let linked = tables.books.values().any(|b| match taxonomy {
            Taxonomy::Kind => b.kind_id == id,
            Taxonomy::Genre => b.genre_id == id,
        });
        if linked {
            return Err(StoreError::conflict(format!(
                "{} {} is still used by at least one book",
                taxonomy.entity(),
                id
            )));
        }
        tables.terms_mut(taxonomy).remove(&id);
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let username = user.username.to_lowercase();
        if tables
            .users
            .values()
            .any(|u| u.username.to_lowercase() == username)
        {
            return Err(StoreError::conflict("Username already taken"));
        }
        if let Some(url) = &user.img_url {
            if tables.user_img_taken(url, None) {
                return Err(StoreError::conflict("Image URL already in use"));
            }
        }
        let id = next_id(&mut tables.seq.user);
        let created = User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            img_url: user.img_url,
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let username = username.to_lowercase();
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.username.to_lowercase() == username)
            .cloned())
    }

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn update_user(&self, id: i64, patch: UserPatch) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if let Some(url) = &patch.img_url {
            if tables.user_img_taken(url, Some(id)) {
                return Err(StoreError::conflict("Image URL already in use"));
            }
        }
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("user", id))?;
        if let Some(hash) = patch.password_hash {
            user.password_hash = hash;
        }
        if let Some(url) = patch.img_url {
            user.img_url = Some(url);
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Err(StoreError::not_found("user", id));
        }
        tables.saved.retain(|_, s| s.user_id != id);
        tables.refresh_tokens.retain(|_, t| t.user_id != id);
        Ok(())
    }

    async fn store_refresh_token(
        &self,
        user_id: i64,
        token_hash: String,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::not_found("user", user_id));
        }
        let id = next_id(&mut tables.seq.token);
        tables.refresh_tokens.insert(
            token_hash.clone(),
            RefreshToken {
                id,
                user_id,
                token_hash,
                expires_at,
                revoked: false,
            },
        );
        Ok(())
    }

    async fn find_refresh_token(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>> {
        Ok(self.tables.read().await.refresh_tokens.get(token_hash).cloned())
    }

    async fn revoke_refresh_token(&self, token_hash: &str) -> StoreResult<()> {
        if let Some(token) = self.tables.write().await.refresh_tokens.get_mut(token_hash) {
            token.revoked = true;
        }
        Ok(())
    }

    async fn revoke_user_tokens(&self, user_id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        for token in tables.refresh_tokens.values_mut() {
            if token.user_id == user_id {
                token.revoked = true;
            }
        }
        Ok(())
    }

    async fn save_book(&self, user_id: i64, book_id: i64) -> StoreResult<SavedBook> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::not_found("user", user_id));
        }
        if !tables.books.contains_key(&book_id) {
            return Err(StoreError::not_found("book", book_id));
        }
        if tables
            .saved
            .values()
            .any(|s| s.user_id == user_id && s.book_id == book_id)
        {
            return Err(StoreError::conflict("Book already saved"));
        }
        let id = next_id(&mut tables.seq.saved);
        let saved = SavedBook { id, user_id, book_id };
        tables.saved.insert(id, saved.clone());
        Ok(saved)
    }

    async fn unsave_book(&self, user_id: i64, book_id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let before = tables.saved.len();
        tables
            .saved
            .retain(|_, s| !(s.user_id == user_id && s.book_id == book_id));
        if tables.saved.len() == before {
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
        let tables = self.tables.read().await;
        let books: Vec<Book> = tables
            .saved
            .values()
            .filter(|s| s.user_id == user_id)
            .filter_map(|s| tables.books.get(&s.book_id).cloned())
            .collect();
        Ok(Page::from_ordered(books, page, per_page))
    }
}
