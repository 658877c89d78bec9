// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMS dispatch pipeline for Beacon.
//!
//! A send flows through [`RateLimiter`] and [`ComplianceValidator`] before a
//! record is written and the provider is called by [`DispatchService`].
//! [`DeliveryTracker`] reconciles provider status callbacks, and
//! [`RetryScheduler`] drives fire-and-forget sends with backoff.

pub mod compliance;
pub mod composer;
pub mod phone;
pub mod rate_limit;
pub mod retry;
pub mod service;
pub mod tracker;

#[cfg(test)]
mod testing;

pub use compliance::{ComplianceValidator, PolicyTable, ValidatedDestination, check_body};
pub use composer::compose;
pub use phone::{CarrierDirectory, PhoneInfo, parse_phone};
pub use rate_limit::{MemoryCounterStore, RateLimiter};
pub use retry::{
    JobReport, RetryJob, RetryPolicies, RetryPolicy, RetryRun, RetryScheduler, execute_with_retry,
};
pub use service::{DEFAULT_PROVIDER_TIMEOUT, DispatchService, DispatchSettings};
pub use tracker::{CallbackError, DeliveryTracker};
