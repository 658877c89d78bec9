// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementations of the Beacon storage traits.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use beacon_config::model::StorageConfig;
use beacon_core::types::{
    CallbackOutcome, CompliancePolicy, NotificationFilter, NotificationId, NotificationRecord,
    NotificationStats, NotificationStatus, UserId,
};
use beacon_core::{
    AdapterType, BeaconError, CounterStore, HealthStatus, NotificationStore, PluginAdapter,
    PolicyStore, StorageAdapter,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is opened on the first call to
/// [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Create and initialize in one step.
    pub async fn open(config: StorageConfig) -> Result<Self, BeaconError> {
        let storage = Self::new(config);
        storage.initialize().await?;
        Ok(storage)
    }

    fn db(&self) -> Result<&Database, BeaconError> {
        self.db.get().ok_or_else(|| BeaconError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// A counter store sharing this adapter's database.
    pub fn counter_store(&self) -> Result<SqliteCounterStore, BeaconError> {
        Ok(SqliteCounterStore {
            db: self.db()?.clone(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, BeaconError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("not initialized".into()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch("SELECT 1;") })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BeaconError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), BeaconError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| BeaconError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), BeaconError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for SqliteStorage {
    async fn insert(&self, record: &NotificationRecord) -> Result<(), BeaconError> {
        queries::notifications::insert(self.db()?, record).await
    }

    async fn mark_sent(
        &self,
        id: &NotificationId,
        provider_message_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<(), BeaconError> {
        queries::notifications::mark_sent(self.db()?, id, provider_message_id, sent_at).await
    }

    async fn mark_failed(
        &self,
        id: &NotificationId,
        error_detail: &str,
    ) -> Result<(), BeaconError> {
        queries::notifications::mark_failed(self.db()?, id, error_detail).await
    }

    async fn get(&self, id: &NotificationId) -> Result<Option<NotificationRecord>, BeaconError> {
        queries::notifications::get(self.db()?, id).await
    }

    async fn find_by_provider_id(
        &self,
        provider_message_id: &str,
    ) -> Result<Option<NotificationRecord>, BeaconError> {
        queries::notifications::find_by_provider_id(self.db()?, provider_message_id).await
    }

    async fn apply_provider_status(
        &self,
        provider_message_id: &str,
        incoming: NotificationStatus,
        error_detail: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Option<CallbackOutcome>, BeaconError> {
        queries::notifications::apply_provider_status(
            self.db()?,
            provider_message_id,
            incoming,
            error_detail,
            at,
        )
        .await
    }

    async fn list(
        &self,
        filter: &NotificationFilter,
    ) -> Result<Vec<NotificationRecord>, BeaconError> {
        queries::notifications::list(self.db()?, filter).await
    }

    async fn stats(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<NotificationStats, BeaconError> {
        queries::notifications::stats(self.db()?, user_id, since).await
    }
}

#[async_trait]
impl PolicyStore for SqliteStorage {
    async fn load_policies(&self) -> Result<Vec<CompliancePolicy>, BeaconError> {
        queries::policies::load_all(self.db()?).await
    }

    async fn upsert_policy(&self, policy: &CompliancePolicy) -> Result<(), BeaconError> {
        queries::policies::upsert(self.db()?, policy).await
    }
}

/// Rate-limit counters persisted in the shared SQLite database.
///
/// Every process pointed at the same database file shares the counters.
#[derive(Clone)]
pub struct SqliteCounterStore {
    db: Database,
}

impl SqliteCounterStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CounterStore for SqliteCounterStore {
    async fn increment_and_get(&self, key: &str, ttl: Duration) -> Result<u64, BeaconError> {
        let ttl_secs = i64::try_from(ttl.as_secs()).map_err(BeaconError::storage)?;
        queries::rate_limits::increment_and_get(&self.db, key, ttl_secs, Utc::now().timestamp())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::types::{NotificationKind, NotificationMetadata};
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
        assert!(matches!(
            storage.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
        assert!(storage.initialize().await.is_err(), "double init rejected");
        storage.close().await.unwrap();
    }

    #[tokio::test]
    async fn uninitialized_queries_fail() {
        let storage = SqliteStorage::new(make_config("/nonexistent/never.db"));
        let result = storage.get(&NotificationId("x".into())).await;
        assert!(matches!(result, Err(BeaconError::Storage { .. })));
    }

    #[tokio::test]
    async fn trait_objects_share_one_database() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("shared.db");
        let storage = SqliteStorage::open(make_config(db_path.to_str().unwrap()))
            .await
            .unwrap();

        let record = NotificationRecord::pending(
            UserId("u1".into()),
            "+447700900123".into(),
            "hi".into(),
            NotificationKind::TransactionConfirmation,
            NotificationMetadata::default(),
            1,
        );
        let store: &dyn NotificationStore = &storage;
        store.insert(&record).await.unwrap();
        store.mark_sent(&record.id, "SM-x", Utc::now()).await.unwrap();
        let found = store.find_by_provider_id("SM-x").await.unwrap().unwrap();
        assert_eq!(found.id, record.id);

        let policies: &dyn PolicyStore = &storage;
        assert_eq!(policies.load_policies().await.unwrap().len(), 6);

        let counters = storage.counter_store().unwrap();
        let ttl = Duration::from_secs(3600);
        assert_eq!(counters.increment_and_get("u1", ttl).await.unwrap(), 1);
        assert_eq!(counters.increment_and_get("u1", ttl).await.unwrap(), 2);
        storage.shutdown().await.unwrap();
    }
}
