// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user send quota over fixed windows.
//!
//! Each `(user, window)` pair owns one counter in a [`CounterStore`]. The
//! window is the current time floored to the window length, so a quota of 10
//! per hour admits at most 10 sends between `HH:00:00` and `HH:59:59`.
//! Checking and incrementing are one atomic store operation: a send is
//! allowed iff the post-increment count is within the quota.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use beacon_config::model::RateLimitConfig;
use beacon_core::{BeaconError, CounterStore, UserId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Default sends per user per window.
pub const DEFAULT_QUOTA: u64 = 10;

/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(3600);

/// Increments between sweeps of expired in-memory counters.
pub const PURGE_EVERY: u64 = 64;

pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    quota: u64,
    window: Duration,
    fail_open: bool,
}

impl RateLimiter {
    /// A fail-closed limiter with the default hourly window.
    pub fn new(store: Arc<dyn CounterStore>, quota: u64) -> Self {
        Self {
            store,
            quota,
            window: DEFAULT_WINDOW,
            fail_open: false,
        }
    }

    pub fn from_config(store: Arc<dyn CounterStore>, config: &RateLimitConfig) -> Self {
        Self {
            store,
            quota: config.max_per_window,
            window: Duration::from_secs(config.window_secs.max(1)),
            fail_open: config.fail_open,
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_fail_open(mut self, fail_open: bool) -> Self {
        self.fail_open = fail_open;
        self
    }

    pub fn quota(&self) -> u64 {
        self.quota
    }

    /// Consume one unit of `user_id`'s quota for the current window.
    pub async fn try_consume(&self, user_id: &UserId) -> bool {
        self.try_consume_at(user_id, Utc::now()).await
    }

    /// Consume one unit of quota for the window containing `now`.
    pub async fn try_consume_at(&self, user_id: &UserId, now: DateTime<Utc>) -> bool {
        let key = self.window_key(user_id, now);
        match self.store.increment_and_get(&key, self.window).await {
            Ok(count) => {
                let allowed = count <= self.quota;
                if !allowed {
                    warn!(user_id = %user_id, count, quota = self.quota, "send quota exceeded");
                }
                allowed
            }
            Err(e) => {
                error!(
                    user_id = %user_id,
                    error = %e,
                    fail_open = self.fail_open,
                    "rate limit counter store unavailable"
                );
                self.fail_open
            }
        }
    }

    /// Counter key for the window containing `now`.
    pub fn window_key(&self, user_id: &UserId, now: DateTime<Utc>) -> String {
        let len = i64::try_from(self.window.as_secs().max(1)).unwrap_or(i64::MAX);
        let start = now.timestamp().div_euclid(len) * len;
        format!("sms_rate_limit:{user_id}:{start}")
    }
}

#[derive(Debug, Clone, Copy)]
struct Counter {
    count: u64,
    expires_at: Instant,
}

/// Process-local counters with per-entry expiry.
///
/// The increment holds the entry's shard lock, so concurrent callers in one
/// process never see the same count. Not shared across processes.
///
/// Every [`PURGE_EVERY`]th increment sweeps expired entries first, so the map
/// holds at most the live windows plus one sweep interval of stale ones.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: DashMap<String, Counter>,
    increments: AtomicU64,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.counters.len();
        self.counters.retain(|_, c| c.expires_at > now);
        before.saturating_sub(self.counters.len())
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment_and_get(&self, key: &str, ttl: Duration) -> Result<u64, BeaconError> {
        // Sweep before taking the entry guard; retain locks every shard.
        let seen = self.increments.fetch_add(1, Ordering::Relaxed) + 1;
        if seen % PURGE_EVERY == 0 {
            let removed = self.purge_expired();
            if removed > 0 {
                debug!(
                    removed,
                    remaining = self.counters.len(),
                    "expired rate limit counters purged"
                );
            }
        }

        let now = Instant::now();
        let mut entry = self.counters.entry(key.to_string()).or_insert(Counter {
            count: 0,
            expires_at: now + ttl,
        });
        if entry.expires_at <= now {
            *entry = Counter {
                count: 0,
                expires_at: now + ttl,
            };
        }
        entry.count += 1;
        Ok(entry.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct BrokenStore;

    #[async_trait]
    impl CounterStore for BrokenStore {
        async fn increment_and_get(&self, _key: &str, _ttl: Duration) -> Result<u64, BeaconError> {
            Err(BeaconError::Internal("counter store offline".into()))
        }
    }

    fn user(id: &str) -> UserId {
        UserId(id.into())
    }

    #[tokio::test]
    async fn eleventh_send_in_window_is_denied() {
        let limiter = RateLimiter::new(Arc::new(MemoryCounterStore::new()), 10);
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 14, 5, 0).unwrap();
        for i in 0..10 {
            assert!(limiter.try_consume_at(&user("u1"), now).await, "send {i}");
        }
        assert!(!limiter.try_consume_at(&user("u1"), now).await);
        assert!(
            limiter.try_consume_at(&user("u2"), now).await,
            "other users unaffected"
        );
    }

    #[tokio::test]
    async fn next_hour_is_a_new_window() {
        let limiter = RateLimiter::new(Arc::new(MemoryCounterStore::new()), 1);
        let late = Utc.with_ymd_and_hms(2026, 5, 1, 14, 59, 59).unwrap();
        let next = Utc.with_ymd_and_hms(2026, 5, 1, 15, 0, 0).unwrap();
        assert!(limiter.try_consume_at(&user("u1"), late).await);
        assert!(!limiter.try_consume_at(&user("u1"), late).await);
        assert!(limiter.try_consume_at(&user("u1"), next).await);
    }

    #[test]
    fn window_key_floors_to_the_hour() {
        let limiter = RateLimiter::new(Arc::new(MemoryCounterStore::new()), 10);
        let a = Utc.with_ymd_and_hms(2026, 5, 1, 14, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2026, 5, 1, 14, 59, 59).unwrap();
        assert_eq!(limiter.window_key(&user("u"), a), limiter.window_key(&user("u"), b));
        assert_eq!(
            limiter.window_key(&user("u"), a),
            format!("sms_rate_limit:u:{}", a.timestamp())
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sends_admit_exactly_quota() {
        let limiter = Arc::new(RateLimiter::new(Arc::new(MemoryCounterStore::new()), 10));
        let now = Utc::now();
        let mut handles = Vec::new();
        for _ in 0..50 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.try_consume_at(&UserId("busy".into()), now).await
            }));
        }
        let mut allowed = 0;
        for h in handles {
            if h.await.unwrap() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 10);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn unavailable_store_fails_closed_by_default() {
        let limiter = RateLimiter::new(Arc::new(BrokenStore), 10);
        assert!(!limiter.try_consume(&user("u1")).await);
        assert!(logs_contain("rate limit counter store unavailable"));
    }

    #[tokio::test]
    async fn fail_open_is_opt_in() {
        let limiter = RateLimiter::new(Arc::new(BrokenStore), 10).with_fail_open(true);
        assert!(limiter.try_consume(&user("u1")).await);
    }

    #[tokio::test(start_paused = true)]
    async fn memory_entries_expire_after_ttl() {
        let store = MemoryCounterStore::new();
        let ttl = Duration::from_secs(3600);
        assert_eq!(store.increment_and_get("k", ttl).await.unwrap(), 1);
        assert_eq!(store.increment_and_get("k", ttl).await.unwrap(), 2);

        tokio::time::advance(ttl).await;
        assert_eq!(store.purge_expired(), 1);
        assert!(store.is_empty());
        assert_eq!(store.increment_and_get("k", ttl).await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_windows_are_swept_without_explicit_purge() {
        let store = Arc::new(MemoryCounterStore::new());
        let limiter = RateLimiter::new(store.clone(), 10);
        let users: Vec<UserId> = (0..50).map(|i| user(&format!("u{i}"))).collect();
        let start = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();

        for hour in 0..48 {
            let now = start + chrono::Duration::hours(hour);
            for u in &users {
                assert!(limiter.try_consume_at(u, now).await);
            }
            tokio::time::advance(DEFAULT_WINDOW).await;
        }

        let bound = users.len() + PURGE_EVERY as usize;
        assert!(
            store.len() <= bound,
            "{} counters retained, expected at most {bound}",
            store.len()
        );
    }
}
