//! Application configuration, read once from the environment at startup.

use std::{fmt, path::PathBuf, str::FromStr};

/// Development-only signing secret. `run()` refuses to start with it in production.
pub const DEFAULT_JWT_SECRET: &str = "default-jwt-secret-change-in-production";

/// What the search does with a kind/genre id that names no existing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownReferencePolicy {
    /// Drop the filter and search as if it was never supplied.
    #[default]
    Ignore,
    /// Fail the search with a not-found error.
    Reject,
}

impl FromStr for UnknownReferencePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown reference policy '{other}'")),
        }
    }
}

impl fmt::Display for UnknownReferencePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignore => write!(f, "ignore"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    /// Scheme and authority used for absolute page links and uploaded image URLs.
    pub public_base_url: String,
    pub books_per_page: u32,
    pub unknown_reference_policy: UnknownReferencePolicy,
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub bcrypt_cost: u32,
    pub login_attempts_per_window: u32,
    pub login_window_secs: i64,
    pub upload_dir: PathBuf,
    pub admin_username: Option<String>,
    pub admin_password_hash: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3001,
            public_base_url: "http://127.0.0.1:3001".to_string(),
            books_per_page: 10,
            unknown_reference_policy: UnknownReferencePolicy::Ignore,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            access_token_minutes: 15,
            refresh_token_days: 7,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            login_attempts_per_window: 5,
            login_window_secs: 60,
            upload_dir: PathBuf::from("uploads/books"),
            admin_username: None,
            admin_password_hash: None,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = env_opt("HOST").unwrap_or(defaults.host);
        let port = env_or("PORT", defaults.port);
        let public_base_url = env_opt("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://{}:{}", host, port))
            .trim_end_matches('/')
            .to_string();

        let unknown_reference_policy = match env_opt("UNKNOWN_REFERENCE_POLICY") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("{}; falling back to 'ignore'", e);
                UnknownReferencePolicy::Ignore
            }),
            None => defaults.unknown_reference_policy,
        };

        Self {
            environment: env_opt("ENVIRONMENT").unwrap_or(defaults.environment),
            host,
            port,
            public_base_url,
            books_per_page: env_or("BOOKS_PER_PAGE", defaults.books_per_page).max(1),
            unknown_reference_policy,
            jwt_secret: env_opt("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            access_token_minutes: env_or("ACCESS_TOKEN_MINUTES", defaults.access_token_minutes),
            refresh_token_days: env_or("REFRESH_TOKEN_DAYS", defaults.refresh_token_days),
            bcrypt_cost: env_or("BCRYPT_COST", defaults.bcrypt_cost),
            login_attempts_per_window: env_or(
                "LOGIN_ATTEMPTS_PER_WINDOW",
                defaults.login_attempts_per_window,
            ),
            login_window_secs: env_or("LOGIN_WINDOW_SECS", defaults.login_window_secs),
            upload_dir: env_opt("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            admin_username: env_opt("ADMIN_USERNAME"),
            admin_password_hash: env_opt("ADMIN_HASH_PASSWORD"),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
