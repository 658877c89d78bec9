// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end dispatch tests.
//!
//! `TestHarness` wires a temp SQLite database, the seeded compliance
//! policies, a [`MockSmsProvider`], and the full dispatch stack.

use std::sync::Arc;
use std::time::Duration;

use beacon_config::model::{
    CarrierPrefixConfig, ComplianceConfig, CounterBackend, RetryConfig, StorageConfig,
};
use beacon_core::types::{
    CallbackOutcome, DispatchOutcome, NotificationFilter, NotificationParams, NotificationRecord,
};
use beacon_core::{BeaconError, CounterStore, NotificationStore, PolicyStore, UserId};
use beacon_dispatch::{
    CallbackError, ComplianceValidator, DeliveryTracker, DispatchService, DispatchSettings,
    MemoryCounterStore, RateLimiter, RetryPolicies, RetryScheduler,
};
use beacon_storage::SqliteStorage;
use tokio_util::sync::CancellationToken;

use crate::mock_provider::{MockOutcome, MockSmsProvider};

/// Sender number used by the harness.
pub const TEST_FROM_NUMBER: &str = "+15005550006";

/// Status callback URL handed to the provider.
pub const TEST_CALLBACK_URL: &str = "https://sms.example.com/sms/webhook/status";

/// Carrier prefixes mapping the test numbers onto seeded policies.
pub fn test_carriers() -> Vec<CarrierPrefixConfig> {
    vec![
        CarrierPrefixConfig {
            country: "US".into(),
            prefix: "1201".into(),
            carrier: "Verizon".into(),
        },
        CarrierPrefixConfig {
            country: "GB".into(),
            prefix: "447400".into(),
            carrier: "Vodafone".into(),
        },
    ]
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    quota: u64,
    retry: RetryConfig,
    provider_default: MockOutcome,
    provider_timeout: Duration,
    counter_backend: CounterBackend,
    carriers: Vec<CarrierPrefixConfig>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            quota: 10,
            retry: RetryConfig::default(),
            provider_default: MockOutcome::Accept,
            provider_timeout: Duration::from_secs(10),
            counter_backend: CounterBackend::Sqlite,
            carriers: test_carriers(),
        }
    }

    /// Sends allowed per user per hour.
    pub fn with_quota(mut self, quota: u64) -> Self {
        self.quota = quota;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Outcome the mock provider returns once its queue is empty.
    pub fn with_provider_default(mut self, outcome: MockOutcome) -> Self {
        self.provider_default = outcome;
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn with_counter_backend(mut self, backend: CounterBackend) -> Self {
        self.counter_backend = backend;
        self
    }

    pub fn with_carriers(mut self, carriers: Vec<CarrierPrefixConfig>) -> Self {
        self.carriers = carriers;
        self
    }

    /// Build the harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, BeaconError> {
        let temp_dir = tempfile::TempDir::new().map_err(BeaconError::storage)?;
        let storage_config = StorageConfig {
            database_path: temp_dir.path().join("test.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let storage = Arc::new(SqliteStorage::open(storage_config).await?);

        let counters: Arc<dyn CounterStore> = match self.counter_backend {
            CounterBackend::Memory => Arc::new(MemoryCounterStore::new()),
            CounterBackend::Sqlite => Arc::new(storage.counter_store()?),
        };
        let limiter = RateLimiter::new(counters, self.quota);

        let compliance = ComplianceConfig {
            carriers: self.carriers,
            ..ComplianceConfig::default()
        };
        let policies = storage.load_policies().await?;
        let validator = Arc::new(ComplianceValidator::from_config(&compliance, policies));

        let provider = Arc::new(MockSmsProvider::with_default(self.provider_default));

        let mut settings = DispatchSettings::new(TEST_FROM_NUMBER);
        settings.status_callback_url = Some(TEST_CALLBACK_URL.to_string());
        settings.provider_timeout = self.provider_timeout;

        let service = Arc::new(DispatchService::new(
            limiter,
            validator.clone(),
            provider.clone(),
            storage.clone(),
            settings,
        ));
        let tracker = DeliveryTracker::new(storage.clone());
        let cancel = CancellationToken::new();
        let scheduler = RetryScheduler::new(
            service.clone(),
            RetryPolicies::from_config(&self.retry),
            cancel.clone(),
        );

        Ok(TestHarness {
            storage,
            provider,
            validator,
            service,
            tracker,
            scheduler,
            cancel,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete dispatch stack over a temp database.
pub struct TestHarness {
    /// SQLite storage (temp DB, removed on drop).
    pub storage: Arc<SqliteStorage>,
    pub provider: Arc<MockSmsProvider>,
    pub validator: Arc<ComplianceValidator>,
    pub service: Arc<DispatchService>,
    pub tracker: DeliveryTracker,
    pub scheduler: RetryScheduler,
    /// Cancels the scheduler's pending retries.
    pub cancel: CancellationToken,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Dispatch one notification synchronously.
    pub async fn send(
        &self,
        user_id: &str,
        phone_number: &str,
        params: &NotificationParams,
    ) -> Result<DispatchOutcome, BeaconError> {
        self.service
            .send(&UserId(user_id.to_string()), phone_number, params)
            .await
    }

    /// Deliver a provider status callback.
    pub async fn callback(
        &self,
        provider_message_id: &str,
        status: &str,
    ) -> Result<CallbackOutcome, CallbackError> {
        self.tracker
            .on_provider_callback(provider_message_id, status, None)
            .await
    }

    /// All of a user's records, newest first.
    pub async fn notifications(
        &self,
        user_id: &str,
    ) -> Result<Vec<NotificationRecord>, BeaconError> {
        let filter = NotificationFilter {
            user_id: Some(UserId(user_id.to_string())),
            limit: Some(500),
            ..NotificationFilter::default()
        };
        self.storage.list(&filter).await
    }
}
