use sqlx::PgPool;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::rate_limit::RateLimiter;
use crate::search::QueryComposer;
use crate::store::{Backend, CatalogStore, MemoryStore, PgStore, TaxonomyStore, UserStore};

/// Shared, immutable request context. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: Arc<dyn CatalogStore>,
    pub taxonomy: Arc<dyn TaxonomyStore>,
    pub users: Arc<dyn UserStore>,
    pub composer: Arc<QueryComposer>,
    pub login_limiter: RateLimiter,
    /// Present only for the Postgres backend; used by the health checks.
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn with_backend<B: Backend + 'static>(
        config: AppConfig,
        backend: Arc<B>,
        pool: Option<PgPool>,
    ) -> Self {
        let composer = QueryComposer::new(backend.clone(), backend.clone(), config.books_per_page)
            .with_policy(config.unknown_reference_policy);
        let login_limiter =
            RateLimiter::new(config.login_attempts_per_window, config.login_window_secs);
        Self {
            config: Arc::new(config),
            catalog: backend.clone(),
            taxonomy: backend.clone(),
            users: backend,
            composer: Arc::new(composer),
            login_limiter,
            pool,
        }
    }

    pub fn postgres(config: AppConfig, pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool.clone()));
        Self::with_backend(config, store, Some(pool))
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self::with_backend(config, Arc::new(MemoryStore::new()), None)
    }

    pub fn backend_name(&self) -> &'static str {
        if self.pool.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }
}
