// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence traits for notification records and compliance policies.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::BeaconError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    CallbackOutcome, CompliancePolicy, NotificationFilter, NotificationId, NotificationRecord,
    NotificationStats, NotificationStatus, UserId,
};

/// Lifecycle of a persistence backend.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Open connections and run migrations.
    async fn initialize(&self) -> Result<(), BeaconError>;

    /// Flush pending writes and release connections.
    async fn close(&self) -> Result<(), BeaconError>;
}

/// Durable store for notification records.
#[async_trait]
pub trait NotificationStore: Send + Sync + 'static {
    /// Persist a new record.
    async fn insert(&self, record: &NotificationRecord) -> Result<(), BeaconError>;

    /// Move a pending record to `sent`, recording the provider id and send time.
    async fn mark_sent(
        &self,
        id: &NotificationId,
        provider_message_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<(), BeaconError>;

    /// Move a pending record to `failed` with an error detail.
    async fn mark_failed(&self, id: &NotificationId, error_detail: &str)
    -> Result<(), BeaconError>;

    async fn get(&self, id: &NotificationId) -> Result<Option<NotificationRecord>, BeaconError>;

    async fn find_by_provider_id(
        &self,
        provider_message_id: &str,
    ) -> Result<Option<NotificationRecord>, BeaconError>;

    /// Apply a provider-reported status to the record with the given provider
    /// id as one atomic compare-and-set.
    ///
    /// Returns `None` when no record carries that provider id. Forward edges
    /// are applied; equal or backward statuses leave the record untouched.
    /// `delivered_at` is set on the first transition into `delivered` only.
    ///
    /// A record is only addressable by provider id once `mark_sent` has
    /// committed. A callback that races ahead of that write returns `None`
    /// and is not replayed.
    async fn apply_provider_status(
        &self,
        provider_message_id: &str,
        incoming: NotificationStatus,
        error_detail: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Option<CallbackOutcome>, BeaconError>;

    /// List records newest first.
    async fn list(&self, filter: &NotificationFilter)
    -> Result<Vec<NotificationRecord>, BeaconError>;

    /// Aggregate a user's records created at or after `since`.
    async fn stats(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<NotificationStats, BeaconError>;
}

/// Source of carrier compliance policies.
#[async_trait]
pub trait PolicyStore: Send + Sync + 'static {
    /// Load every stored policy.
    async fn load_policies(&self) -> Result<Vec<CompliancePolicy>, BeaconError>;

    /// Insert or replace the policy for `(carrier_name, country_code)`.
    async fn upsert_policy(&self, policy: &CompliancePolicy) -> Result<(), BeaconError>;
}
