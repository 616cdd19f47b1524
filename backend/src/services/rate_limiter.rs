//! Fixed-window request rate limiting.
//!
//! Counters live behind the [`RateLimitStore`] trait so the in-process map can
//! be swapped for a shared cache when several server instances run side by
//! side. A store must perform the reset-or-increment step atomically per key.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::errors::{ServiceError, ServiceResult};

/// Paths that get the stricter authentication ceiling.
const AUTH_PATHS: &[&str] = &["/auth/login", "/auth/register"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointClass {
    Auth,
    General,
}

/// Endpoint component of the counter key for every non-authentication path.
const GENERAL_BUCKET: &str = "general";

impl EndpointClass {
    pub fn for_path(path: &str) -> Self {
        Self::classify(path).0
    }

    /// Each authentication path counts on its own. All other paths share one
    /// bucket per client, so unmatched or per-id paths add no entries.
    fn classify(path: &str) -> (Self, &'static str) {
        let normalized = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        match AUTH_PATHS.iter().find(|auth| **auth == normalized) {
            Some(auth) => (EndpointClass::Auth, *auth),
            None => (EndpointClass::General, GENERAL_BUCKET),
        }
    }
}

/// Counter state for one `(client, endpoint)` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_reset_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after_secs: u64 },
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Records one request for `key` and returns the updated entry. A missing
    /// entry, or one whose window ended strictly before `now`, restarts at
    /// `count = 1` with `window_reset_at = now + window`.
    async fn hit(&self, key: &str, window: Duration, now: DateTime<Utc>) -> Result<RateLimitEntry>;

    /// Drops entries whose window has ended. Returns how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// Per-process store; counters reset on restart.
#[derive(Default)]
pub struct InMemoryRateLimitStore {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn hit(&self, key: &str, window: Duration, now: DateTime<Utc>) -> Result<RateLimitEntry> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("rate limit store mutex poisoned"))?;

        let entry = entries
            .entry(key.to_string())
            .and_modify(|entry| {
                if now > entry.window_reset_at {
                    *entry = RateLimitEntry {
                        count: 1,
                        window_reset_at: now + window,
                    };
                } else {
                    entry.count = entry.count.saturating_add(1);
                }
            })
            .or_insert(RateLimitEntry {
                count: 1,
                window_reset_at: now + window,
            });

        Ok(*entry)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("rate limit store mutex poisoned"))?;

        let before = entries.len();
        entries.retain(|_, entry| now <= entry.window_reset_at);
        Ok(before - entries.len())
    }
}

/// Applies per-class ceilings on top of a [`RateLimitStore`].
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    window: Duration,
    auth_max: u32,
    general_max: u32,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, window: Duration, auth_max: u32, general_max: u32) -> Self {
        Self {
            store,
            window,
            auth_max,
            general_max,
        }
    }

    pub fn from_config(config: &Config, store: Arc<dyn RateLimitStore>) -> Self {
        Self::new(
            store,
            Duration::seconds(config.rate_limit_window_seconds as i64),
            config.auth_rate_limit_max,
            config.general_rate_limit_max,
        )
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self, class: EndpointClass) -> u32 {
        match class {
            EndpointClass::Auth => self.auth_max,
            EndpointClass::General => self.general_max,
        }
    }

    pub async fn check(&self, client: &str, path: &str) -> ServiceResult<RateLimitDecision> {
        self.check_at(client, path, Utc::now()).await
    }

    pub async fn check_at(
        &self,
        client: &str,
        path: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<RateLimitDecision> {
        let (class, endpoint) = EndpointClass::classify(path);
        let max = self.max_requests(class);
        let key = format!("{}|{}", client, endpoint);

        let entry = self.store.hit(&key, self.window, now).await?;

        if entry.count <= max {
            return Ok(RateLimitDecision::Allowed {
                remaining: max - entry.count,
            });
        }

        let remaining_ms = (entry.window_reset_at - now).num_milliseconds().max(0) as u64;
        let retry_after_secs = remaining_ms.div_ceil(1000).max(1);
        Ok(RateLimitDecision::Limited { retry_after_secs })
    }

    pub async fn purge_expired(&self) -> ServiceResult<usize> {
        Ok(self.store.purge_expired(Utc::now()).await?)
    }
}

impl RateLimitDecision {
    /// Turns a rejection into `ServiceError::RateLimited`.
    pub fn into_result(self) -> ServiceResult<()> {
        match self {
            RateLimitDecision::Allowed { .. } => Ok(()),
            RateLimitDecision::Limited { retry_after_secs } => {
                Err(ServiceError::RateLimited { retry_after_secs })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(auth_max: u32, general_max: u32) -> RateLimiter {
        RateLimiter::new(
            Arc::new(InMemoryRateLimitStore::new()),
            Duration::seconds(60),
            auth_max,
            general_max,
        )
    }

    #[test]
    fn test_endpoint_classes() {
        assert_eq!(EndpointClass::for_path("/auth/login"), EndpointClass::Auth);
        assert_eq!(EndpointClass::for_path("/auth/login/"), EndpointClass::Auth);
        assert_eq!(EndpointClass::for_path("/auth/register"), EndpointClass::Auth);
        assert_eq!(EndpointClass::for_path("/auth/me"), EndpointClass::General);
        assert_eq!(EndpointClass::for_path("/api/inventory"), EndpointClass::General);
        assert_eq!(EndpointClass::for_path("/"), EndpointClass::General);
    }

    #[tokio::test]
    async fn test_auth_ceiling() {
        let limiter = limiter(5, 100);
        let now = Utc::now();

        for i in 0..5 {
            let decision = limiter.check_at("10.0.0.1", "/auth/login", now).await.unwrap();
            assert_eq!(decision, RateLimitDecision::Allowed { remaining: 4 - i });
        }

        let decision = limiter.check_at("10.0.0.1", "/auth/login", now).await.unwrap();
        assert_eq!(decision, RateLimitDecision::Limited { retry_after_secs: 60 });
    }

    #[tokio::test]
    async fn test_retry_after_counts_down() {
        let limiter = limiter(1, 100);
        let start = Utc::now();

        limiter.check_at("c", "/auth/login", start).await.unwrap();
        let later = start + Duration::milliseconds(20_500);
        let decision = limiter.check_at("c", "/auth/login", later).await.unwrap();
        assert_eq!(decision, RateLimitDecision::Limited { retry_after_secs: 40 });
    }

    #[tokio::test]
    async fn test_window_resets_strictly_after_expiry() {
        let limiter = limiter(2, 100);
        let start = Utc::now();

        limiter.check_at("c", "/auth/login", start).await.unwrap();
        limiter.check_at("c", "/auth/login", start).await.unwrap();

        // Exactly at the reset instant the old window still applies.
        let at_reset = start + Duration::seconds(60);
        let decision = limiter.check_at("c", "/auth/login", at_reset).await.unwrap();
        assert_eq!(decision, RateLimitDecision::Limited { retry_after_secs: 1 });

        let after = at_reset + Duration::milliseconds(1);
        let decision = limiter.check_at("c", "/auth/login", after).await.unwrap();
        assert_eq!(decision, RateLimitDecision::Allowed { remaining: 1 });
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = limiter(1, 2);
        let now = Utc::now();

        limiter.check_at("a", "/auth/login", now).await.unwrap();
        assert!(matches!(
            limiter.check_at("a", "/auth/login", now).await.unwrap(),
            RateLimitDecision::Limited { .. }
        ));

        // Another client, and another endpoint for the same client, are untouched.
        assert!(matches!(
            limiter.check_at("b", "/auth/login", now).await.unwrap(),
            RateLimitDecision::Allowed { .. }
        ));
        assert_eq!(
            limiter.check_at("a", "/api/inventory", now).await.unwrap(),
            RateLimitDecision::Allowed { remaining: 1 }
        );
    }

    #[tokio::test]
    async fn test_general_paths_share_one_bucket() {
        let store = Arc::new(InMemoryRateLimitStore::new());
        let limiter = RateLimiter::new(store.clone(), Duration::seconds(60), 5, 2);
        let now = Utc::now();

        limiter.check_at("a", "/api/inventory", now).await.unwrap();
        limiter.check_at("a", "/api/users/0198a1b2", now).await.unwrap();
        assert!(matches!(
            limiter.check_at("a", "/no/such/route", now).await.unwrap(),
            RateLimitDecision::Limited { .. }
        ));
        assert!(matches!(
            limiter.check_at("a", "/auth/login", now).await.unwrap(),
            RateLimitDecision::Allowed { remaining: 4 }
        ));

        for i in 0..100 {
            limiter.check_at("b", &format!("/random/{}", i), now).await.unwrap();
        }
        // a|general, a|/auth/login, b|general
        assert_eq!(store.purge_expired(now + Duration::seconds(61)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = InMemoryRateLimitStore::new();
        let now = Utc::now();
        let window = Duration::seconds(10);

        store.hit("old", window, now - Duration::seconds(30)).await.unwrap();
        store.hit("fresh", window, now).await.unwrap();

        assert_eq!(store.purge_expired(now).await.unwrap(), 1);
        let entry = store.hit("fresh", window, now).await.unwrap();
        assert_eq!(entry.count, 2);
    }

    #[tokio::test]
    async fn test_concurrent_hits_are_not_lost() {
        let store = Arc::new(InMemoryRateLimitStore::new());
        let now = Utc::now();

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.hit("k", Duration::seconds(60), now).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.hit("k", Duration::seconds(60), now).await.unwrap().count, 51);
    }

    #[test]
    fn test_decision_into_result() {
        assert!(RateLimitDecision::Allowed { remaining: 0 }.into_result().is_ok());

        let limited = RateLimitDecision::Limited {
            retry_after_secs: 9,
        }
        .into_result();
        assert!(matches!(
            limited,
            Err(ServiceError::RateLimited { retry_after_secs: 9 })
        ));
    }
}
