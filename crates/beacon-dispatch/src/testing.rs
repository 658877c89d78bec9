// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-crate fixtures: a scripted provider and a temp-dir backed store.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use beacon_config::model::{ComplianceConfig, StorageConfig};
use beacon_core::types::{
    CallbackOutcome, NotificationFilter, NotificationId, NotificationRecord, NotificationStats,
    NotificationStatus, OutboundSms, ProviderError, ProviderErrorKind, ProviderReceipt,
};
use beacon_core::{
    AdapterType, BeaconError, HealthStatus, NotificationStore, PluginAdapter, SmsProvider, UserId,
};
use chrono::{DateTime, Utc};
use beacon_storage::SqliteStorage;
use tempfile::TempDir;
use tokio::time::Instant;

use crate::compliance::ComplianceValidator;
use crate::rate_limit::{MemoryCounterStore, RateLimiter};
use crate::service::{DispatchService, DispatchSettings};

pub fn us_number() -> String {
    "+12015550123".to_string()
}

#[derive(Clone, Debug)]
pub enum Step {
    Accept,
    Fail(ProviderErrorKind),
    Hang,
}

/// Provider that plays back a script, then repeats the fallback step.
#[derive(Clone)]
pub struct ScriptedProvider {
    script: Arc<Mutex<VecDeque<Step>>>,
    fallback: Step,
    sent: Arc<Mutex<Vec<OutboundSms>>>,
    calls: Arc<Mutex<Vec<Instant>>>,
    next_id: Arc<AtomicU64>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Step>, fallback: Step) -> Arc<Self> {
        Arc::new(Self {
            script: Arc::new(Mutex::new(script.into())),
            fallback,
            sent: Arc::default(),
            calls: Arc::default(),
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn accepting() -> Arc<Self> {
        Self::new(Vec::new(), Step::Accept)
    }

    pub fn failing(kind: ProviderErrorKind) -> Arc<Self> {
        Self::new(Vec::new(), Step::Fail(kind))
    }

    pub fn hanging() -> Arc<Self> {
        Self::new(Vec::new(), Step::Hang)
    }

    pub fn sent(&self) -> Vec<OutboundSms> {
        self.sent.lock().unwrap().clone()
    }

    /// Tokio instants of every call, for paused-clock tests.
    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PluginAdapter for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 0, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, BeaconError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BeaconError> {
        Ok(())
    }
}

#[async_trait]
impl SmsProvider for ScriptedProvider {
    async fn send_message(&self, message: &OutboundSms) -> Result<ProviderReceipt, ProviderError> {
        self.sent.lock().unwrap().push(message.clone());
        self.calls.lock().unwrap().push(Instant::now());
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match step {
            Step::Accept => {
                let n = self.next_id.fetch_add(1, Ordering::Relaxed);
                Ok(ProviderReceipt {
                    provider_message_id: format!("SM{n:032}"),
                    status: Some("queued".into()),
                })
            }
            Step::Fail(kind) => Err(ProviderError::new(kind, "scripted failure").with_code("30001")),
            Step::Hang => std::future::pending().await,
        }
    }
}

/// SQLite storage in a temp dir, kept alive for the test's duration.
pub struct TestStore {
    pub storage: Arc<SqliteStorage>,
    _dir: TempDir,
}

impl TestStore {
    pub async fn open() -> Self {
        let dir = TempDir::new().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("beacon.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let storage = SqliteStorage::open(config).await.unwrap();
        Self {
            storage: Arc::new(storage),
            _dir: dir,
        }
    }

    pub fn service(&self, provider: Arc<ScriptedProvider>, quota: u64) -> DispatchService {
        self.service_over(provider, quota, self.storage.clone())
    }

    /// Like [`TestStore::service`] but writing through `store`.
    pub fn service_over(
        &self,
        provider: Arc<ScriptedProvider>,
        quota: u64,
        store: Arc<dyn NotificationStore>,
    ) -> DispatchService {
        let limiter = RateLimiter::new(Arc::new(MemoryCounterStore::new()), quota);
        let validator = ComplianceValidator::from_config(&ComplianceConfig::default(), Vec::new());
        let mut settings = DispatchSettings::new("+15005550006");
        settings.status_callback_url = Some("https://sms.example.com/sms/webhook/status".into());
        DispatchService::new(
            limiter,
            Arc::new(validator),
            provider,
            store,
            settings,
        )
    }

    pub async fn count(&self) -> usize {
        let filter = NotificationFilter {
            limit: Some(1000),
            ..NotificationFilter::default()
        };
        self.storage.list(&filter).await.unwrap().len()
    }
}

/// Store whose first `mark_sent` calls fail; everything else passes through.
pub struct FlakyStore {
    inner: Arc<SqliteStorage>,
    mark_sent_failures: AtomicU32,
}

impl FlakyStore {
    pub fn new(inner: Arc<SqliteStorage>, mark_sent_failures: u32) -> Arc<Self> {
        Arc::new(Self {
            inner,
            mark_sent_failures: AtomicU32::new(mark_sent_failures),
        })
    }
}

#[async_trait]
impl NotificationStore for FlakyStore {
    async fn insert(&self, record: &NotificationRecord) -> Result<(), BeaconError> {
        self.inner.insert(record).await
    }

    async fn mark_sent(
        &self,
        id: &NotificationId,
        provider_message_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<(), BeaconError> {
        let remaining = self.mark_sent_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.mark_sent_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(BeaconError::Internal("database is locked".into()));
        }
        self.inner.mark_sent(id, provider_message_id, sent_at).await
    }

    async fn mark_failed(
        &self,
        id: &NotificationId,
        error_detail: &str,
    ) -> Result<(), BeaconError> {
        self.inner.mark_failed(id, error_detail).await
    }

    async fn get(&self, id: &NotificationId) -> Result<Option<NotificationRecord>, BeaconError> {
        self.inner.get(id).await
    }

    async fn find_by_provider_id(
        &self,
        provider_message_id: &str,
    ) -> Result<Option<NotificationRecord>, BeaconError> {
        self.inner.find_by_provider_id(provider_message_id).await
    }

    async fn apply_provider_status(
        &self,
        provider_message_id: &str,
        incoming: NotificationStatus,
        error_detail: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Option<CallbackOutcome>, BeaconError> {
        self.inner
            .apply_provider_status(provider_message_id, incoming, error_detail, at)
            .await
    }

    async fn list(
        &self,
        filter: &NotificationFilter,
    ) -> Result<Vec<NotificationRecord>, BeaconError> {
        self.inner.list(filter).await
    }

    async fn stats(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<NotificationStats, BeaconError> {
        self.inner.stats(user_id, since).await
    }
}
