// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared counter store used by the rate limiter.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BeaconError;

/// Keyed counters with expiry.
///
/// `increment_and_get` must be atomic across every process sharing the
/// store: two concurrent callers never observe the same post-increment
/// value for one key.
#[async_trait]
pub trait CounterStore: Send + Sync + 'static {
    /// Increment `key`, creating it with the given time-to-live if absent or
    /// expired, and return the new count.
    async fn increment_and_get(&self, key: &str, ttl: Duration) -> Result<u64, BeaconError>;
}
