// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that all Beacon backends implement.

use async_trait::async_trait;

use crate::error::BeaconError;
use crate::types::{AdapterType, HealthStatus};

/// Base trait for all Beacon adapters.
///
/// Every adapter (SMS provider, storage, counter store) implements this
/// trait so the binary can report health and shut backends down uniformly.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Returns the role this adapter fills.
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the current status.
    async fn health_check(&self) -> Result<HealthStatus, BeaconError>;

    /// Gracefully shuts down the adapter, releasing any held resources.
    async fn shutdown(&self) -> Result<(), BeaconError>;
}
