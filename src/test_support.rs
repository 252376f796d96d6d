//! Shared fixtures for unit and router tests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::db::models::{NewBook, NewUser, User, ROLE_ADMIN, ROLE_USER};
use crate::routes::auth::create_access_token;
use crate::state::AppState;
use crate::store::{CatalogStore, MemoryStore, Taxonomy, TaxonomyStore, UserStore};

pub fn new_book(
    name: &str,
    author: &str,
    release_year: i32,
    price: Decimal,
    kind_id: i64,
    genre_id: i64,
    keywords: &[&str],
) -> NewBook {
    NewBook {
        name: name.to_string(),
        price,
        author: author.to_string(),
        release_year,
        kind_id,
        genre_id,
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        images: vec![format!("/uploads/{}.jpg", uuid::Uuid::new_v4())],
    }
}

/// Kinds `físico`, `kindle` and genres `fábula`, `ficção científica`.
pub async fn seed_terms(store: &MemoryStore) -> (Vec<i64>, Vec<i64>) {
    let mut kinds = Vec::new();
    for name in ["físico", "kindle"] {
        kinds.push(store.create_term(Taxonomy::Kind, name.to_string()).await.unwrap().id);
    }
    let mut genres = Vec::new();
    for name in ["fábula", "ficção científica"] {
        genres.push(store.create_term(Taxonomy::Genre, name.to_string()).await.unwrap().id);
    }
    (kinds, genres)
}

/// Two terms of each taxonomy plus two books, both of kind 1 and genre 1.
pub async fn fixture_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let (kinds, genres) = seed_terms(&store).await;
    store
        .create_book(new_book(
            "O Pequeno Príncipe",
            "Antoine de Saint-Exupéry",
            1943,
            dec!(10.99),
            kinds[0],
            genres[0],
            &["dramático"],
        ))
        .await
        .unwrap();
    store
        .create_book(new_book(
            "Herdeiro do Império",
            "Timothy Zahn",
            1991,
            dec!(89.67),
            kinds[0],
            genres[0],
            &["dramático"],
        ))
        .await
        .unwrap();
    store
}

pub fn test_config() -> AppConfig {
    AppConfig {
        bcrypt_cost: 4,
        ..AppConfig::default()
    }
}

pub async fn fixture_state() -> AppState {
    AppState::with_backend(test_config(), fixture_store().await, None)
}

pub async fn create_user(state: &AppState, username: &str, role: &str) -> User {
    let password_hash = bcrypt::hash("password123", 4).unwrap();
    state
        .users
        .create_user(NewUser {
            username: username.to_string(),
            password_hash,
            img_url: None,
            role: role.to_string(),
        })
        .await
        .unwrap()
}

pub async fn admin_token(state: &AppState) -> String {
    let admin = create_user(state, "admin", ROLE_ADMIN).await;
    create_access_token(&state.config, &admin).unwrap()
}

pub async fn user_token(state: &AppState, username: &str) -> (User, String) {
    let user = create_user(state, username, ROLE_USER).await;
    let token = create_access_token(&state.config, &user).unwrap();
    (user, token)
}

/// Send one request through `app` and decode the JSON body (or `null`).
pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header("authorization", format!("Bearer {token}"));
    }
    let req = match body {
        Some(json) => req
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
