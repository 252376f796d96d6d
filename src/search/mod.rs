//! Book search.
//!
//! A [`SearchCriteria`] is turned into a [`BookQuery`] (a conjunction of
//! [`Predicate`]s ordered by id) by running it through a fixed list of
//! predicate steps. Kind and genre ids are checked for existence first; an
//! unknown id either drops its filter or fails the search depending on the
//! configured [`UnknownReferencePolicy`].

pub mod pagination;

use rust_decimal::Decimal;
use serde::Serialize;
use std::{fmt, sync::Arc};

use crate::config::UnknownReferencePolicy;
use crate::db::models::Book;
use crate::store::{CatalogStore, ReferenceValidator, StoreError};

pub use pagination::Page;

/// Optional filters of a search request. Every field has already passed
/// request validation (positive ids and prices, ordered price bounds).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchCriteria {
    pub text: Option<String>,
    pub kind_id: Option<i64>,
    pub genre_id: Option<i64>,
    pub release_year: Option<i32>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

/// A single condition on a book row.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Case-insensitive substring of name or author, or exact keyword match.
    Text(String),
    KindId(i64),
    GenreId(i64),
    ReleaseYear(i32),
    /// Inclusive lower price bound.
    MinPrice(Decimal),
    /// Inclusive upper price bound.
    MaxPrice(Decimal),
}

impl Predicate {
    pub fn matches(&self, book: &Book) -> bool {
        match self {
            Predicate::Text(text) => {
                let needle = text.to_lowercase();
                book.name.to_lowercase().contains(&needle)
                    || book.author.to_lowercase().contains(&needle)
                    || book
                        .keywords
                        .iter()
                        .any(|k| k.keyword.to_lowercase() == needle)
            }
            Predicate::KindId(id) => book.kind_id == *id,
            Predicate::GenreId(id) => book.genre_id == *id,
            Predicate::ReleaseYear(year) => book.release_year == *year,
            Predicate::MinPrice(min) => book.price >= *min,
            Predicate::MaxPrice(max) => book.price <= *max,
        }
    }
}

/// Conjunction of predicates. Empty means "every book".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredicateSet {
    predicates: Vec<Predicate>,
}

impl PredicateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Predicate> {
        self.predicates.iter()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, book: &Book) -> bool {
        self.predicates.iter().all(|p| p.matches(book))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BookOrder {
    #[default]
    IdAsc,
}

/// Query handle handed to [`CatalogStore::paginate_books`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookQuery {
    pub predicates: PredicateSet,
    pub order: BookOrder,
}

impl BookQuery {
    pub fn select(predicates: PredicateSet, order: BookOrder) -> Self {
        Self { predicates, order }
    }

    pub fn all() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceField {
    Kind,
    Genre,
}

impl fmt::Display for ReferenceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceField::Kind => write!(f, "book kind"),
            ReferenceField::Genre => write!(f, "book genre"),
        }
    }
}

/// What happened to a requested kind/genre filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOutcome {
    Applied,
    SkippedUnknownReference,
}

/// Result of composition: the query plus the fate of each reference filter
/// (`None` when the filter was not requested).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposedQuery {
    pub query: BookQuery,
    pub kind: Option<FilterOutcome>,
    pub genre: Option<FilterOutcome>,
}

impl ComposedQuery {
    fn and(mut self, predicate: Predicate) -> Self {
        self.query.predicates = self.query.predicates.and(predicate);
        self
    }
}

/// Existence of the referenced rows, looked up before any step runs.
#[derive(Debug, Clone, Copy, Default)]
struct References {
    kind_exists: bool,
    genre_exists: bool,
}

type PredicateStep = fn(&SearchCriteria, &References, ComposedQuery) -> ComposedQuery;

/// Every step is conjunctive, so the order only fixes the shape of the SQL.
const PREDICATE_STEPS: [PredicateStep; 6] = [
    apply_text,
    apply_kind,
    apply_genre,
    apply_release_year,
    apply_min_price,
    apply_max_price,
];

fn apply_text(criteria: &SearchCriteria, _: &References, query: ComposedQuery) -> ComposedQuery {
    match criteria.text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => query.and(Predicate::Text(text.to_string())),
        _ => query,
    }
}

fn apply_kind(
    criteria: &SearchCriteria,
    refs: &References,
    mut query: ComposedQuery,
) -> ComposedQuery {
    let Some(kind_id) = criteria.kind_id else {
        return query;
    };
    if refs.kind_exists {
        query.kind = Some(FilterOutcome::Applied);
        query.and(Predicate::KindId(kind_id))
    } else {
        query.kind = Some(FilterOutcome::SkippedUnknownReference);
        query
    }
}

fn apply_genre(
    criteria: &SearchCriteria,
    refs: &References,
    mut query: ComposedQuery,
) -> ComposedQuery {
    let Some(genre_id) = criteria.genre_id else {
        return query;
    };
    if refs.genre_exists {
        query.genre = Some(FilterOutcome::Applied);
        query.and(Predicate::GenreId(genre_id))
    } else {
        query.genre = Some(FilterOutcome::SkippedUnknownReference);
        query
    }
}

fn apply_release_year(
    criteria: &SearchCriteria,
    _: &References,
    query: ComposedQuery,
) -> ComposedQuery {
    match criteria.release_year {
        Some(year) => query.and(Predicate::ReleaseYear(year)),
        None => query,
    }
}

fn apply_min_price(
    criteria: &SearchCriteria,
    _: &References,
    query: ComposedQuery,
) -> ComposedQuery {
    match criteria.min_price {
        Some(min) => query.and(Predicate::MinPrice(min)),
        None => query,
    }
}

fn apply_max_price(
    criteria: &SearchCriteria,
    _: &References,
    query: ComposedQuery,
) -> ComposedQuery {
    match criteria.max_price {
        Some(max) => query.and(Predicate::MaxPrice(max)),
        None => query,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("{field} {id} not found")]
    UnknownReference { field: ReferenceField, id: i64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub page: Page<Book>,
    pub kind: Option<FilterOutcome>,
    pub genre: Option<FilterOutcome>,
}

/// Builds and runs filtered, paginated book listings.
pub struct QueryComposer {
    catalog: Arc<dyn CatalogStore>,
    references: Arc<dyn ReferenceValidator>,
    per_page: u32,
    policy: UnknownReferencePolicy,
}

impl QueryComposer {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        references: Arc<dyn ReferenceValidator>,
        per_page: u32,
    ) -> Self {
        Self {
            catalog,
            references,
            per_page: per_page.max(1),
            policy: UnknownReferencePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: UnknownReferencePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    async fn resolve_references(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<References, SearchError> {
        let kind_exists = match criteria.kind_id {
            Some(id) => self.check_reference(ReferenceField::Kind, id).await?,
            None => false,
        };
        let genre_exists = match criteria.genre_id {
            Some(id) => self.check_reference(ReferenceField::Genre, id).await?,
            None => false,
        };
        Ok(References {
            kind_exists,
            genre_exists,
        })
    }

    async fn check_reference(&self, field: ReferenceField, id: i64) -> Result<bool, SearchError> {
        let exists = match field {
            ReferenceField::Kind => self.references.book_kind_exists(id).await?,
            ReferenceField::Genre => self.references.book_genre_exists(id).await?,
        };
        if !exists {
            match self.policy {
                UnknownReferencePolicy::Ignore => {
                    tracing::debug!(%field, id, "ignoring filter on unknown reference");
                }
                UnknownReferencePolicy::Reject => {
                    return Err(SearchError::UnknownReference { field, id });
                }
            }
        }
        Ok(exists)
    }

    /// Translate criteria into a query without running it.
    pub async fn compose(&self, criteria: &SearchCriteria) -> Result<ComposedQuery, SearchError> {
        let refs = self.resolve_references(criteria).await?;
        Ok(PREDICATE_STEPS
            .iter()
            .fold(ComposedQuery::default(), |query, step| step(criteria, &refs, query)))
    }

    pub async fn search(
        &self,
        criteria: &SearchCriteria,
        page: u32,
    ) -> Result<SearchResult, SearchError> {
        let composed = self.compose(criteria).await?;
        tracing::debug!(
            predicates = composed.query.predicates.len(),
            page,
            "running book search"
        );
        let page = self
            .catalog
            .paginate_books(&composed.query, page.max(1), self.per_page)
            .await?;
        Ok(SearchResult {
            page,
            kind: composed.kind,
            genre: composed.genre,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::test_support::{fixture_store, new_book, seed_terms};
    use rust_decimal_macros::dec;

    fn composer(store: &Arc<MemoryStore>, per_page: u32) -> QueryComposer {
        QueryComposer::new(store.clone(), store.clone(), per_page)
    }

    fn names(result: &SearchResult) -> Vec<&str> {
        result.page.items.iter().map(|b| b.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_empty_criteria_returns_full_listing() {
        let store = fixture_store().await;
        let result = composer(&store, 10)
            .search(&SearchCriteria::default(), 1)
            .await
            .unwrap();
        assert_eq!(names(&result), vec!["O Pequeno Príncipe", "Herdeiro do Império"]);
        assert_eq!(result.page.total, 2);
        assert_eq!(result.kind, None);
        assert_eq!(result.genre, None);
    }

    #[tokio::test]
    async fn test_compose_empty_criteria_has_no_predicates() {
        let store = fixture_store().await;
        let composed = composer(&store, 10)
            .compose(&SearchCriteria::default())
            .await
            .unwrap();
        assert!(composed.query.predicates.is_empty());
        assert_eq!(composed.query.order, BookOrder::IdAsc);
    }

    #[tokio::test]
    async fn test_kind_filter_applies_when_kind_exists() {
        let store = fixture_store().await;
        let criteria = SearchCriteria {
            kind_id: Some(1),
            ..Default::default()
        };
        let result = composer(&store, 10).search(&criteria, 1).await.unwrap();
        assert_eq!(result.page.total, 2);
        assert_eq!(result.kind, Some(FilterOutcome::Applied));

        let criteria = SearchCriteria {
            kind_id: Some(2),
            ..Default::default()
        };
        let result = composer(&store, 10).search(&criteria, 1).await.unwrap();
        assert!(result.page.items.is_empty());
        assert_eq!(result.kind, Some(FilterOutcome::Applied));
    }

    #[tokio::test]
    async fn test_unknown_kind_is_skipped() {
        let store = fixture_store().await;
        let composer = composer(&store, 10);
        let with_bad_kind = SearchCriteria {
            kind_id: Some(999),
            min_price: Some(dec!(50)),
            ..Default::default()
        };
        let without_kind = SearchCriteria {
            min_price: Some(dec!(50)),
            ..Default::default()
        };

        let skipped = composer.search(&with_bad_kind, 1).await.unwrap();
        let baseline = composer.search(&without_kind, 1).await.unwrap();
        assert_eq!(skipped.page, baseline.page);
        assert_eq!(skipped.kind, Some(FilterOutcome::SkippedUnknownReference));

        let composed = composer.compose(&with_bad_kind).await.unwrap();
        assert_eq!(
            composed.query.predicates,
            PredicateSet::new().and(Predicate::MinPrice(dec!(50)))
        );
    }

    #[tokio::test]
    async fn test_unknown_genre_is_skipped() {
        let store = fixture_store().await;
        let criteria = SearchCriteria {
            genre_id: Some(42),
            ..Default::default()
        };
        let result = composer(&store, 10).search(&criteria, 1).await.unwrap();
        assert_eq!(result.page.total, 2);
        assert_eq!(result.genre, Some(FilterOutcome::SkippedUnknownReference));
    }

    #[tokio::test]
    async fn test_reject_policy_fails_on_unknown_reference() {
        let store = fixture_store().await;
        let composer = composer(&store, 10).with_policy(UnknownReferencePolicy::Reject);
        let criteria = SearchCriteria {
            genre_id: Some(42),
            ..Default::default()
        };
        let err = composer.search(&criteria, 1).await.unwrap_err();
        assert!(matches!(
            err,
            SearchError::UnknownReference {
                field: ReferenceField::Genre,
                id: 42
            }
        ));

        let criteria = SearchCriteria {
            genre_id: Some(1),
            ..Default::default()
        };
        assert_eq!(composer.search(&criteria, 1).await.unwrap().page.total, 2);
    }

    #[tokio::test]
    async fn test_min_price_only() {
        let store = fixture_store().await;
        let criteria = SearchCriteria {
            min_price: Some(dec!(50)),
            ..Default::default()
        };
        let result = composer(&store, 10).search(&criteria, 1).await.unwrap();
        assert_eq!(names(&result), vec!["Herdeiro do Império"]);
    }

    #[tokio::test]
    async fn test_price_bounds_are_inclusive() {
        let store = fixture_store().await;
        let criteria = SearchCriteria {
            min_price: Some(dec!(10.99)),
            max_price: Some(dec!(10.99)),
            ..Default::default()
        };
        let result = composer(&store, 10).search(&criteria, 1).await.unwrap();
        assert_eq!(names(&result), vec!["O Pequeno Príncipe"]);

        let criteria = SearchCriteria {
            max_price: Some(dec!(89.67)),
            ..Default::default()
        };
        let result = composer(&store, 10).search(&criteria, 1).await.unwrap();
        assert_eq!(result.page.total, 2);
    }

    #[tokio::test]
    async fn test_text_matches_name_case_insensitively() {
        let store = fixture_store().await;
        let criteria = SearchCriteria {
            text: Some("  PRÍNCIPE ".to_string()),
            ..Default::default()
        };
        let result = composer(&store, 10).search(&criteria, 1).await.unwrap();
        assert_eq!(names(&result), vec!["O Pequeno Príncipe"]);
    }

    #[tokio::test]
    async fn test_text_matches_author_substring_and_exact_keyword() {
        let store = fixture_store().await;
        let composer = composer(&store, 10);

        let by_author = SearchCriteria {
            text: Some("zahn".to_string()),
            ..Default::default()
        };
        let result = composer.search(&by_author, 1).await.unwrap();
        assert_eq!(names(&result), vec!["Herdeiro do Império"]);

        let by_keyword = SearchCriteria {
            text: Some("Dramático".to_string()),
            ..Default::default()
        };
        assert_eq!(composer.search(&by_keyword, 1).await.unwrap().page.total, 2);

        // Keywords match exactly, not by substring.
        let partial_keyword = SearchCriteria {
            text: Some("dramát".to_string()),
            ..Default::default()
        };
        assert_eq!(composer.search(&partial_keyword, 1).await.unwrap().page.total, 0);
    }

    #[tokio::test]
    async fn test_blank_text_applies_no_predicate() {
        let store = fixture_store().await;
        let composed = composer(&store, 10)
            .compose(&SearchCriteria {
                text: Some("   ".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(composed.query.predicates.is_empty());
    }

    #[tokio::test]
    async fn test_predicates_follow_step_order() {
        let store = fixture_store().await;
        let criteria = SearchCriteria {
            text: Some("império".to_string()),
            kind_id: Some(1),
            genre_id: Some(1),
            release_year: Some(1991),
            min_price: Some(dec!(1)),
            max_price: Some(dec!(100)),
        };
        let composed = composer(&store, 10).compose(&criteria).await.unwrap();
        let expected = PredicateSet::new()
            .and(Predicate::Text("império".to_string()))
            .and(Predicate::KindId(1))
            .and(Predicate::GenreId(1))
            .and(Predicate::ReleaseYear(1991))
            .and(Predicate::MinPrice(dec!(1)))
            .and(Predicate::MaxPrice(dec!(100)));
        assert_eq!(composed.query.predicates, expected);
        assert_eq!(composed.kind, Some(FilterOutcome::Applied));
        assert_eq!(composed.genre, Some(FilterOutcome::Applied));
    }

    #[tokio::test]
    async fn test_conjunction_matches_reference_set() {
        let store = Arc::new(MemoryStore::new());
        let (kinds, genres) = seed_terms(&store).await;
        let fixtures = [
            ("Duna", "Frank Herbert", 1965, dec!(59.90), kinds[0], genres[1], "deserto"),
            ("Neuromancer", "William Gibson", 1984, dec!(45.00), kinds[1], genres[1], "cyberpunk"),
            ("Fundação", "Isaac Asimov", 1951, dec!(39.90), kinds[0], genres[1], "império"),
            (
                "A Revolução dos Bichos",
                "George Orwell",
                1945,
                dec!(25.50),
                kinds[0],
                genres[0],
                "fazenda",
            ),
            ("Eu, Robô", "Isaac Asimov", 1950, dec!(42.00), kinds[1], genres[1], "robôs"),
            (
                "O Fim da Eternidade",
                "Isaac Asimov",
                1955,
                dec!(35.00),
                kinds[0],
                genres[1],
                "tempo",
            ),
        ];
        for (name, author, year, price, kind, genre, keyword) in fixtures {
            store
                .create_book(new_book(name, author, year, price, kind, genre, &[keyword]))
                .await
                .unwrap();
        }

        let criteria = SearchCriteria {
            text: Some("asimov".to_string()),
            kind_id: Some(kinds[0]),
            genre_id: Some(genres[1]),
            release_year: Some(1951),
            min_price: Some(dec!(30)),
            max_price: Some(dec!(40)),
        };
        let result = composer(&store, 10).search(&criteria, 1).await.unwrap();

        let all = composer(&store, 100)
            .search(&SearchCriteria::default(), 1)
            .await
            .unwrap()
            .page
            .items;
        let reference: Vec<&str> = all
            .iter()
            .filter(|b| {
                (b.name.to_lowercase().contains("asimov")
                    || b.author.to_lowercase().contains("asimov"))
                    && b.kind_id == kinds[0]
                    && b.genre_id == genres[1]
                    && b.release_year == 1951
                    && b.price >= dec!(30)
                    && b.price <= dec!(40)
            })
            .map(|b| b.name.as_str())
            .collect();

        assert_eq!(names(&result), reference);
        assert_eq!(reference, vec!["Fundação"]);

        let any_year = SearchCriteria {
            release_year: None,
            ..criteria
        };
        let result = composer(&store, 10).search(&any_year, 1).await.unwrap();
        assert_eq!(names(&result), vec!["Fundação", "O Fim da Eternidade"]);
    }

    #[tokio::test]
    async fn test_release_year_keeps_only_that_year() {
        let store = fixture_store().await;
        let criteria = SearchCriteria {
            release_year: Some(1943),
            ..Default::default()
        };
        let result = composer(&store, 10).search(&criteria, 1).await.unwrap();
        assert_eq!(names(&result), vec!["O Pequeno Príncipe"]);
        assert_eq!(result.page.total, 1);
    }

    #[tokio::test]
    async fn test_release_year_without_matches_is_an_empty_page() {
        let store = fixture_store().await;
        let criteria = SearchCriteria {
            release_year: Some(2001),
            ..Default::default()
        };
        let result = composer(&store, 10).search(&criteria, 1).await.unwrap();
        assert!(result.page.items.is_empty());
        assert_eq!(result.page.total, 0);
        assert_eq!(result.page.pages, 0);
        assert!(!result.page.has_next);
    }

    #[tokio::test]
    async fn test_pagination_uses_configured_page_size() {
        let store = Arc::new(MemoryStore::new());
        let (kinds, genres) = seed_terms(&store).await;
        for i in 0..5 {
            store
                .create_book(new_book(
                    &format!("Livro {i}"),
                    "Autor",
                    2000,
                    dec!(10),
                    kinds[0],
                    genres[0],
                    &["genérico"],
                ))
                .await
                .unwrap();
        }
        let composer = composer(&store, 2);

        let first = composer.search(&SearchCriteria::default(), 1).await.unwrap();
        assert_eq!(names(&first), vec!["Livro 0", "Livro 1"]);
        assert_eq!(first.page.pages, 3);
        assert!(!first.page.has_prev);
        assert!(first.page.has_next);

        let last = composer.search(&SearchCriteria::default(), 3).await.unwrap();
        assert_eq!(names(&last), vec!["Livro 4"]);
        assert!(last.page.has_prev);
        assert!(!last.page.has_next);

        let ids: Vec<i64> = first.page.items.iter().map(|b| b.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
}
