//! Fixed-window attempt counter keyed by client IP.

use chrono::Utc;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: i64,
    attempts: u32,
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_attempts: u32,
    window_secs: i64,
    windows: Arc<RwLock<HashMap<String, Window>>>,
}

impl RateLimiter {
    /// `max_attempts == 0` disables limiting.
    pub fn new(max_attempts: u32, window_secs: i64) -> Self {
        Self {
            max_attempts,
            window_secs: window_secs.max(1),
            windows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn check(&self, key: &str) -> bool {
        self.check_at(key, Utc::now().timestamp()).await
    }

    async fn check_at(&self, key: &str, now: i64) -> bool {
        if self.max_attempts == 0 {
            return true;
        }
        let mut windows = self.windows.write().await;

        // Expired windows are dropped on every write so the map tracks only active clients.
        windows.retain(|_, w| now - w.started_at < self.window_secs);

        let window = windows.entry(key.to_string()).or_insert(Window {
            started_at: now,
            attempts: 0,
        });
        if window.attempts >= self.max_attempts {
            return false;
        }
        window.attempts += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blocks_after_max_attempts() {
        let limiter = RateLimiter::new(2, 60);
        assert!(limiter.check_at("1.2.3.4", 100).await);
        assert!(limiter.check_at("1.2.3.4", 101).await);
        assert!(!limiter.check_at("1.2.3.4", 102).await);
        assert!(limiter.check_at("5.6.7.8", 102).await);
    }

    #[tokio::test]
    async fn test_window_expiry_resets_attempts() {
        let limiter = RateLimiter::new(1, 60);
        assert!(limiter.check_at("ip", 0).await);
        assert!(!limiter.check_at("ip", 59).await);
        assert!(limiter.check_at("ip", 60).await);
    }

    #[tokio::test]
    async fn test_zero_disables_limiting() {
        let limiter = RateLimiter::new(0, 60);
        for now in 0..10 {
            assert!(limiter.check_at("ip", now).await);
        }
    }
}
