//! Bookstore catalog API - library for app logic and testing

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod rate_limit;
pub mod routes;
pub mod search;
pub mod state;
pub mod store;
pub mod validation;

#[cfg(test)]
mod test_support;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    services::ServeDir, trace::TraceLayer,
};

use crate::config::{AppConfig, DEFAULT_JWT_SECRET};
use crate::state::AppState;
use crate::store::Taxonomy;

/// Global cap for JSON bodies.
const JSON_BODY_LIMIT: usize = 2 * 1024 * 1024;
/// Upload cap: the 5 MB file plus multipart framing.
const UPLOAD_BODY_LIMIT: usize = 6 * 1024 * 1024;

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN.
/// Falls back to the local frontend dev servers.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/verify", post(routes::auth::verify_token))
        .route("/api/auth/refresh", post(routes::auth::refresh))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route(
            "/api/books",
            get(routes::books::list_books).post(routes::books::create_book),
        )
        .route(
            "/api/books/search",
            get(routes::search::search_get).post(routes::search::search_post),
        )
        .route(
            "/api/books/{id}",
            get(routes::books::get_book)
                .patch(routes::books::update_book)
                .delete(routes::books::delete_book),
        )
        .route("/api/books/{id}/keywords", post(routes::keywords::add_keyword))
        .route("/api/keywords/{id}", delete(routes::keywords::delete_keyword))
        .route("/api/books/{id}/images", post(routes::images::add_image))
        .route("/api/images/{id}", delete(routes::images::delete_image))
        .merge(routes::taxonomy::router(Taxonomy::Kind))
        .merge(routes::taxonomy::router(Taxonomy::Genre))
        .route(
            "/api/users/me",
            get(routes::users::me)
                .patch(routes::users::update_me)
                .delete(routes::users::delete_me),
        )
        .route(
            "/api/users/me/saved-books",
            get(routes::users::list_saved_books).post(routes::users::save_book),
        )
        .route(
            "/api/users/me/saved-books/{book_id}",
            delete(routes::users::unsave_book),
        )
        .route("/health", get(routes::health::health_ping))
        .route("/health/database", get(routes::health::health_database))
        .route("/health/ready", get(routes::health::health_ready))
        // Global 2 MB request body cap; prevents unbounded buffering
        .layer(RequestBodyLimitLayer::new(JSON_BODY_LIMIT))
}

fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/api/uploads", post(routes::upload::upload_image))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .layer(RequestBodyLimitLayer::new(UPLOAD_BODY_LIMIT))
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors();

    Router::new()
        .merge(api_routes())
        .merge(upload_routes())
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        // Compress responses with gzip/br automatically
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// Refuse to start in production with the insecure default JWT secret.
fn check_production_secrets(config: &AppConfig) {
    if !config.is_production() {
        return;
    }
    if config.jwt_secret.is_empty() || config.jwt_secret == DEFAULT_JWT_SECRET {
        tracing::error!(
            "FATAL: JWT_SECRET must be set to a secure, unique value in production. \
             Refusing to start with the default secret."
        );
        std::process::exit(1);
    }
    if config.admin_username.is_none() || config.admin_password_hash.is_none() {
        tracing::warn!(
            "SECURITY: ADMIN_USERNAME/ADMIN_HASH_PASSWORD not set. \
             No account will be able to manage the catalog."
        );
    }
}

/// Pick the backend: Postgres when DATABASE_URL is set, otherwise in-memory.
async fn build_state(config: AppConfig) -> AppState {
    if std::env::var("DATABASE_URL").is_err() {
        tracing::info!("DATABASE_URL not set. Using the in-memory catalog store.");
        return AppState::in_memory(config);
    }

    let pool = match db::init_pool(None).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to initialize database pool: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = db::run_migrations(&pool).await {
        tracing::error!("Failed to run database migrations: {}", e);
        std::process::exit(1);
    }
    AppState::postgres(config, pool)
}

/// Run the server (used by main).
pub async fn run() {
    dotenvy::dotenv().ok();

    // Dropping the guards shuts down the background writers and loses
    // buffered lines, so they live until `run` returns.
    let _log_guards = logging::init();

    routes::health::init_start_time();

    let config = AppConfig::from_env();
    check_production_secrets(&config);
    tracing::info!(
        per_page = config.books_per_page,
        policy = %config.unknown_reference_policy,
        "Configuration loaded"
    );

    let state = build_state(config).await;
    if let Err(e) = routes::auth::seed_admin(&state).await {
        tracing::error!("Failed to seed admin account: {}", e);
    }

    let addr: SocketAddr = match state.config.bind_addr().parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Invalid HOST/PORT configuration: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Starting server on {} ({} backend)", addr, state.backend_name());

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    let app = create_app(state);
    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        tracing::error!("Server error: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture_state, send};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let state = fixture_state().await;
        let (status, _) = send(create_app(state), "GET", "/api/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_route_wins_over_book_id() {
        let state = fixture_state().await;
        let (status, body) = send(create_app(state), "GET", "/api/books/search", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_items"], 2);
    }

    #[tokio::test]
    async fn test_responses_carry_request_id() {
        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;

        let state = fixture_state().await;
        let res = create_app(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));
    }
}
