/**
 * Authentication Routes
 * JWT-based authentication with register, login, verify, refresh, and logout
 */
use axum::{
    extract::{ConnectInfo, FromRequestParts, State},
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::net::SocketAddr;

use crate::config::AppConfig;
use crate::db::models::{NewUser, User, ROLE_ADMIN, ROLE_USER};
use crate::error::{AppError, AppResult};
use crate::routes::ApiJson;
use crate::state::AppState;
use crate::store::StoreResult;
use crate::validation;

// ============================================================================
// Types
// ============================================================================

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,      // User ID
    pub username: String, // Login name
    pub role: String,     // User role
    pub exp: i64,         // Expiry timestamp
    pub iat: i64,         // Issued at timestamp
}

/// User info returned to clients
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub img_url: Option<String>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role.clone(),
            img_url: user.img_url.clone(),
        }
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: UserInfo,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub img_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub is_valid: bool,
    pub user: Option<UserInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Generate a random refresh token
fn generate_refresh_token() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 64)
}

/// Refresh tokens are stored only as their SHA-256 digest.
fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Create access token
pub fn create_access_token(
    config: &AppConfig,
    user: &User,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = now + Duration::minutes(config.access_token_minutes);

    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: user.role.clone(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

/// Verify and decode access token
pub fn verify_access_token(
    secret: &str,
    token: &str,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// bcrypt is CPU-bound; keep it off the async executor.
pub async fn hash_password(password: String, cost: u32) -> AppResult<String> {
    match tokio::task::spawn_blocking(move || hash(password, cost)).await {
        Ok(Ok(h)) => Ok(h),
        Ok(Err(e)) => {
            tracing::error!("Failed to hash password: {}", e);
            Err(AppError::internal("Failed to process password"))
        }
        Err(e) => {
            tracing::error!("spawn_blocking panic during hash: {}", e);
            Err(AppError::internal("Failed to process password"))
        }
    }
}

async fn password_matches(password: String, password_hash: String) -> bool {
    tokio::task::spawn_blocking(move || verify(&password, &password_hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

async fn check_rate_limit(state: &AppState, addr: SocketAddr) -> AppResult<()> {
    let ip = addr.ip().to_string();
    if !state.login_limiter.check(&ip).await {
        tracing::warn!(ip = %ip, "auth attempt rate limited");
        return Err(AppError::rate_limited("Too many requests")
            .with_message("Please try again later."));
    }
    Ok(())
}

/// Mint an access token and persist a fresh refresh token for `user`.
async fn issue_tokens(state: &AppState, user: &User) -> AppResult<(String, String)> {
    let access_token = create_access_token(&state.config, user).map_err(|e| {
        tracing::error!("Failed to create access token: {}", e);
        AppError::internal("Failed to create token")
    })?;

    let refresh_token = generate_refresh_token();
    let expires_at = Utc::now() + Duration::days(state.config.refresh_token_days);
    state
        .users
        .store_refresh_token(user.id, hash_refresh_token(&refresh_token), expires_at)
        .await?;

    Ok((access_token, refresh_token))
}

/// Create the configured admin account if it does not exist yet.
pub async fn seed_admin(state: &AppState) -> StoreResult<()> {
    let (Some(username), Some(password_hash)) = (
        state.config.admin_username.as_ref(),
        state.config.admin_password_hash.as_ref(),
    ) else {
        tracing::info!("ADMIN_USERNAME/ADMIN_HASH_PASSWORD not set; no admin account seeded");
        return Ok(());
    };

    match state.users.find_user_by_username(username).await? {
        Some(existing) if existing.is_admin() => {
            tracing::debug!("Admin account {} already present", existing.username);
        }
        Some(existing) => {
            tracing::warn!(
                "User {} exists without the admin role; not promoting it",
                existing.username
            );
        }
        None => {
            let admin = state
                .users
                .create_user(NewUser {
                    username: username.clone(),
                    password_hash: password_hash.clone(),
                    img_url: None,
                    role: ROLE_ADMIN.to_string(),
                })
                .await?;
            tracing::info!("Seeded admin account: {}", admin.username);
        }
    }
    Ok(())
}

// ============================================================================
// Extractors
// ============================================================================

/// Any caller holding a valid access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub claims: Claims,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.claims.role == ROLE_ADMIN
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| AppError::unauthorized("Authorization required"))?;
        let claims = verify_access_token(&state.config.jwt_secret, &token).map_err(|e| {
            tracing::debug!("Token verification failed: {}", e);
            AppError::unauthorized("Invalid or expired token")
        })?;
        let user_id = claims
            .sub
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid or expired token"))?;
        Ok(Self { user_id, claims })
    }
}

/// A caller whose access token carries the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::forbidden("Admin role required"));
        }
        Ok(Self(user))
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/register
/// Create a regular user account
pub async fn register(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserInfo>)> {
    check_rate_limit(&state, addr).await?;

    let username = validation::username(&payload.username)?;
    validation::password(&payload.password)?;
    let img_url = payload
        .img_url
        .as_deref()
        .map(validation::image_url)
        .transpose()?;

    if state.users.find_user_by_username(&username).await?.is_some() {
        return Err(AppError::conflict("Conflict").with_message("Username already registered"));
    }

    let password_hash = hash_password(payload.password, state.config.bcrypt_cost).await?;
    let user = state
        .users
        .create_user(NewUser {
            username,
            password_hash,
            img_url,
            role: ROLE_USER.to_string(),
        })
        .await?;

    tracing::info!("User registered: {}", user.username);
    Ok((StatusCode::CREATED, Json(UserInfo::from(&user))))
}

/// POST /api/auth/login
/// Authenticate user and return tokens
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    check_rate_limit(&state, addr).await?;

    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("Username and password are required"));
    }

    let Some(user) = state.users.find_user_by_username(payload.username.trim()).await? else {
        tracing::warn!("Login attempt for unknown user: {}", payload.username);
        return Err(AppError::unauthorized("Invalid credentials"));
    };

    if !password_matches(payload.password, user.password_hash.clone()).await {
        tracing::warn!("Failed login attempt for: {}", user.username);
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let (access_token, refresh_token) = issue_tokens(&state, &user).await?;
    tracing::info!("Successful login for user: {}", user.username);

    Ok(Json(LoginResponse {
        user: UserInfo::from(&user),
        access_token,
        refresh_token,
    }))
}

/// POST /api/auth/verify
/// Verify access token and return user info
pub async fn verify_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<VerifyResponse> {
    let Some(token) = extract_bearer_token(&headers) else {
        return Json(VerifyResponse {
            success: false,
            is_valid: false,
            user: None,
            error: Some("No authorization token provided".to_string()),
        });
    };

    match verify_access_token(&state.config.jwt_secret, &token) {
        Ok(claims) => Json(VerifyResponse {
            success: true,
            is_valid: true,
            user: Some(UserInfo {
                id: claims.sub.parse().unwrap_or_default(),
                username: claims.username,
                role: claims.role,
                img_url: None,
            }),
            error: None,
        }),
        Err(e) => {
            tracing::debug!("Token verification failed: {}", e);
            Json(VerifyResponse {
                success: false,
                is_valid: false,
                user: None,
                error: Some("Invalid or expired token".to_string()),
            })
        }
    }
}

/// POST /api/auth/refresh
/// Rotate the refresh token and mint a new access token
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> AppResult<Json<RefreshResponse>> {
    if payload.refresh_token.is_empty() {
        return Err(AppError::bad_request("Refresh token is required"));
    }

    let token_hash = hash_refresh_token(&payload.refresh_token);
    let invalid = || AppError::unauthorized("Invalid or expired refresh token");

    let stored = state
        .users
        .find_refresh_token(&token_hash)
        .await?
        .filter(|t| t.is_usable(Utc::now()))
        .ok_or_else(invalid)?;
    let user = state.users.get_user(stored.user_id).await?.ok_or_else(invalid)?;

    state.users.revoke_refresh_token(&token_hash).await?;
    let (access_token, refresh_token) = issue_tokens(&state, &user).await?;

    Ok(Json(RefreshResponse {
        access_token,
        refresh_token,
    }))
}

/// POST /api/auth/logout
/// Revoke the given refresh token and, with a valid access token, every
/// refresh token of that user. Always succeeds.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<LogoutRequest>,
) -> Json<LogoutResponse> {
    if let Some(refresh_token) = payload.refresh_token {
        let token_hash = hash_refresh_token(&refresh_token);
        if let Err(e) = state.users.revoke_refresh_token(&token_hash).await {
            tracing::warn!("Failed to revoke refresh token: {}", e);
        }
    }

    if let Some(access_token) = payload
        .access_token
        .or_else(|| extract_bearer_token(&headers))
    {
        if let Ok(claims) = verify_access_token(&state.config.jwt_secret, &access_token) {
            if let Ok(user_id) = claims.sub.parse::<i64>() {
                if let Err(e) = state.users.revoke_user_tokens(user_id).await {
                    tracing::warn!("Failed to revoke tokens of user {}: {}", user_id, e);
                }
            }
        }
    }

    Json(LogoutResponse { success: true })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::store::MemoryStore;
    use crate::test_support::{create_user, test_config};
    use axum::body::Body;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::Request;
    use axum::routing::{get, post};
    use axum::Router;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn auth_router(state: AppState) -> Router {
        Router::new()
            .route("/api/auth/register", post(register))
            .route("/api/auth/login", post(login))
            .route("/api/auth/verify", post(verify_token))
            .route("/api/auth/refresh", post(refresh))
            .route("/api/auth/logout", post(logout))
            .route("/whoami", get(|user: AuthUser| async move { user.user_id.to_string() }))
            .route("/admin-only", get(|_: AdminUser| async { "ok" }))
            .with_state(state)
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 12345))))
    }

    fn memory_state(config: AppConfig) -> AppState {
        AppState::with_backend(config, Arc::new(MemoryStore::new()), None)
    }

    async fn post_json(
        app: Router,
        uri: &str,
        json: &impl serde::Serialize,
    ) -> (StatusCode, axum::body::Bytes) {
        let body = Body::from(serde_json::to_vec(json).unwrap());
        let req = Request::post(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes)
    }

    async fn get_with_token(app: Router, uri: &str, token: &str) -> StatusCode {
        let req = Request::get(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        app.oneshot(req).await.unwrap().status()
    }

    async fn login_as(app: Router, username: &str) -> LoginResponse {
        let (status, bytes) = post_json(
            app,
            "/api/auth/login",
            &LoginRequest {
                username: username.to_string(),
                password: "password123".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_verify_access_token_invalid_returns_err() {
        let result = verify_access_token("secret", "invalid.jwt.token");
        assert!(result.is_err());
    }

    #[test]
    fn test_access_token_round_trips_claims() {
        let config = test_config();
        let user = User {
            id: 7,
            username: "leitor".to_string(),
            password_hash: String::new(),
            img_url: None,
            role: ROLE_USER.to_string(),
            created_at: Utc::now(),
        };
        let token = create_access_token(&config, &user).unwrap();
        let claims = verify_access_token(&config.jwt_secret, &token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.role, ROLE_USER);
        assert!(verify_access_token("another-secret", &token).is_err());
    }

    #[tokio::test]
    async fn test_register_creates_regular_user() {
        let state = memory_state(test_config());
        let (status, bytes) = post_json(
            auth_router(state.clone()),
            "/api/auth/register",
            &RegisterRequest {
                username: "leitor".to_string(),
                password: "password123".to_string(),
                img_url: None,
            },
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let info: UserInfo = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(info.role, ROLE_USER);

        let stored = state.users.find_user_by_username("LEITOR").await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "password123");
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_and_weak_input() {
        let state = memory_state(test_config());
        create_user(&state, "leitor", ROLE_USER).await;

        let (status, _) = post_json(
            auth_router(state.clone()),
            "/api/auth/register",
            &RegisterRequest {
                username: "Leitor".to_string(),
                password: "password123".to_string(),
                img_url: None,
            },
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = post_json(
            auth_router(state),
            "/api/auth/register",
            &RegisterRequest {
                username: "novo".to_string(),
                password: "short".to_string(),
                img_url: None,
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_empty_username_returns_bad_request() {
        let (status, _) = post_json(
            auth_router(memory_state(test_config())),
            "/api/auth/login",
            &LoginRequest {
                username: "".to_string(),
                password: "password123".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_wrong_credentials_returns_unauthorized() {
        let state = memory_state(test_config());
        create_user(&state, "leitor", ROLE_USER).await;
        let (status, _) = post_json(
            auth_router(state),
            "/api/auth/login",
            &LoginRequest {
                username: "leitor".to_string(),
                password: "wrongpassword".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_is_rate_limited_per_ip() {
        let config = AppConfig {
            login_attempts_per_window: 2,
            ..test_config()
        };
        let state = memory_state(config);
        let body = LoginRequest {
            username: "ghost".to_string(),
            password: "password123".to_string(),
        };
        for _ in 0..2 {
            let (status, _) = post_json(auth_router(state.clone()), "/api/auth/login", &body).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
        let (status, _) = post_json(auth_router(state), "/api/auth/login", &body).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let state = memory_state(test_config());
        create_user(&state, "leitor", ROLE_USER).await;
        let tokens = login_as(auth_router(state.clone()), "leitor").await;

        let (status, bytes) = post_json(
            auth_router(state.clone()),
            "/api/auth/refresh",
            &RefreshRequest {
                refresh_token: tokens.refresh_token.clone(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let rotated: RefreshResponse = serde_json::from_slice(&bytes).unwrap();
        assert_ne!(rotated.refresh_token, tokens.refresh_token);

        // the old token was revoked by the rotation
        let (status, _) = post_json(
            auth_router(state),
            "/api/auth/refresh",
            &RefreshRequest {
                refresh_token: tokens.refresh_token,
            },
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_empty_token_returns_bad_request() {
        let (status, _) = post_json(
            auth_router(memory_state(test_config())),
            "/api/auth/refresh",
            &RefreshRequest {
                refresh_token: "".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_logout_with_access_token_revokes_all_refresh_tokens() {
        let state = memory_state(test_config());
        create_user(&state, "leitor", ROLE_USER).await;
        let first = login_as(auth_router(state.clone()), "leitor").await;
        let second = login_as(auth_router(state.clone()), "leitor").await;

        let (status, bytes) = post_json(
            auth_router(state.clone()),
            "/api/auth/logout",
            &LogoutRequest {
                access_token: Some(first.access_token),
                refresh_token: None,
            },
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body: LogoutResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(body.success);

        for token in [first.refresh_token, second.refresh_token] {
            let hash = hash_refresh_token(&token);
            let stored = state.users.find_refresh_token(&hash).await.unwrap().unwrap();
            assert!(stored.revoked);
        }
    }

    #[tokio::test]
    async fn test_logout_returns_success_without_tokens() {
        let (status, bytes) = post_json(
            auth_router(memory_state(test_config())),
            "/api/auth/logout",
            &LogoutRequest {
                access_token: None,
                refresh_token: None,
            },
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body: LogoutResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(body.success);
    }

    #[tokio::test]
    async fn test_verify_no_token_returns_error_in_body() {
        let req = Request::post("/api/auth/verify").body(Body::empty()).unwrap();
        let res = auth_router(memory_state(test_config())).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: VerifyResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(!body.success);
        assert!(!body.is_valid);
    }

    #[tokio::test]
    async fn test_extractors_enforce_roles() {
        let state = memory_state(test_config());
        let reader = create_user(&state, "leitor", ROLE_USER).await;
        let admin = create_user(&state, "admin", ROLE_ADMIN).await;
        let reader_token = create_access_token(&state.config, &reader).unwrap();
        let admin_token = create_access_token(&state.config, &admin).unwrap();

        let app = auth_router(state);
        assert_eq!(get_with_token(app.clone(), "/whoami", &reader_token).await, StatusCode::OK);
        assert_eq!(
            get_with_token(app.clone(), "/whoami", "garbage").await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_with_token(app.clone(), "/admin-only", &reader_token).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(get_with_token(app, "/admin-only", &admin_token).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_seed_admin_creates_account_once() {
        let config = AppConfig {
            admin_username: Some("root".to_string()),
            admin_password_hash: Some(bcrypt::hash("password123", 4).unwrap()),
            ..test_config()
        };
        let state = memory_state(config);
        seed_admin(&state).await.unwrap();
        seed_admin(&state).await.unwrap();

        let admin = state.users.find_user_by_username("root").await.unwrap().unwrap();
        assert!(admin.is_admin());
        let tokens = login_as(auth_router(state), "root").await;
        assert_eq!(tokens.user.role, ROLE_ADMIN);
    }
}
