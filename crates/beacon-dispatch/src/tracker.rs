// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery-status reconciliation from provider callbacks.

use std::sync::Arc;

use beacon_core::types::{CallbackOutcome, NotificationStatus};
use beacon_core::{BeaconError, NotificationStore};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a callback could not be applied.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("unknown provider message id: {0}")]
    UnknownMessage(String),

    #[error("unrecognized provider status: {0}")]
    UnrecognizedStatus(String),

    #[error(transparent)]
    Storage(#[from] BeaconError),
}

impl CallbackError {
    pub fn label(&self) -> &'static str {
        match self {
            CallbackError::UnknownMessage(_) => "unknown_message",
            CallbackError::UnrecognizedStatus(_) => "unrecognized_status",
            CallbackError::Storage(_) => "error",
        }
    }
}

/// Applies provider status callbacks to stored records.
///
/// Safe to call concurrently and repeatedly for the same message: each call is
/// a single compare-and-set in the store, so duplicates converge.
#[derive(Clone)]
pub struct DeliveryTracker {
    store: Arc<dyn NotificationStore>,
}

impl DeliveryTracker {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    pub async fn on_provider_callback(
        &self,
        provider_message_id: &str,
        status_text: &str,
        error_code: Option<&str>,
    ) -> Result<CallbackOutcome, CallbackError> {
        let result = self
            .apply(provider_message_id, status_text, error_code)
            .await;
        let label = match &result {
            Ok(CallbackOutcome::Applied { .. }) => "applied",
            Ok(CallbackOutcome::Unchanged { .. }) => "unchanged",
            Ok(CallbackOutcome::Regressive { .. }) => "regressive",
            Err(e) => e.label(),
        };
        beacon_prometheus::record_callback(label);
        result
    }

    async fn apply(
        &self,
        provider_message_id: &str,
        status_text: &str,
        error_code: Option<&str>,
    ) -> Result<CallbackOutcome, CallbackError> {
        let Some(incoming) = NotificationStatus::from_provider(status_text) else {
            if self
                .store
                .find_by_provider_id(provider_message_id)
                .await?
                .is_none()
            {
                warn!(provider_message_id, "callback for unknown message");
                return Err(CallbackError::UnknownMessage(provider_message_id.to_string()));
            }
            warn!(provider_message_id, status = status_text, "unrecognized provider status");
            return Err(CallbackError::UnrecognizedStatus(status_text.to_string()));
        };

        let error_detail = match (incoming, error_code) {
            (NotificationStatus::Failed | NotificationStatus::Undelivered, Some(code))
                if !code.is_empty() =>
            {
                Some(format!("provider error {code}"))
            }
            _ => None,
        };

        let outcome = self
            .store
            .apply_provider_status(
                provider_message_id,
                incoming,
                error_detail.as_deref(),
                Utc::now(),
            )
            .await?
            .ok_or_else(|| {
                warn!(provider_message_id, "callback for unknown message");
                CallbackError::UnknownMessage(provider_message_id.to_string())
            })?;

        match outcome {
            CallbackOutcome::Applied { from, to } => {
                info!(provider_message_id, %from, %to, "delivery status updated")
            }
            CallbackOutcome::Unchanged { status } => {
                debug!(provider_message_id, %status, "duplicate status callback")
            }
            CallbackOutcome::Regressive { current, incoming } => {
                debug!(provider_message_id, %current, %incoming, "stale status callback ignored")
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedProvider, TestStore, us_number};
    use beacon_core::types::{DispatchOutcome, NotificationParams};
    use beacon_core::{NotificationKind, NotificationMetadata, NotificationRecord, UserId};

    async fn sent_record(env: &TestStore) -> NotificationRecord {
        let service = env.service(ScriptedProvider::accepting(), 10);
        let outcome = service
            .send(
                &UserId("u1".into()),
                &us_number(),
                &NotificationParams::TwoFactorAuth { code: "1".into() },
            )
            .await
            .unwrap();
        let DispatchOutcome::Sent(record) = outcome else {
            panic!("expected Sent");
        };
        record
    }

    fn tracker(env: &TestStore) -> DeliveryTracker {
        DeliveryTracker::new(env.storage.clone())
    }

    #[tokio::test]
    async fn delivered_then_duplicate_then_late_sent() {
        let env = TestStore::open().await;
        let record = sent_record(&env).await;
        let pid = record.provider_message_id.clone().unwrap();
        let tracker = tracker(&env);

        let first = tracker.on_provider_callback(&pid, "delivered", None).await.unwrap();
        assert_eq!(
            first,
            CallbackOutcome::Applied {
                from: NotificationStatus::Sent,
                to: NotificationStatus::Delivered
            }
        );
        let delivered_at = env
            .storage
            .get(&record.id)
            .await
            .unwrap()
            .unwrap()
            .delivered_at
            .unwrap();

        let again = tracker.on_provider_callback(&pid, "delivered", None).await.unwrap();
        assert_eq!(
            again,
            CallbackOutcome::Unchanged {
                status: NotificationStatus::Delivered
            }
        );

        let late = tracker.on_provider_callback(&pid, "sent", None).await.unwrap();
        assert!(matches!(late, CallbackOutcome::Regressive { .. }));

        let stored = env.storage.get(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, NotificationStatus::Delivered);
        assert_eq!(stored.delivered_at, Some(delivered_at));
    }

    #[tokio::test]
    async fn queued_status_keeps_sent_record() {
        let env = TestStore::open().await;
        let record = sent_record(&env).await;
        let pid = record.provider_message_id.unwrap();

        let outcome = tracker(&env)
            .on_provider_callback(&pid, "queued", None)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            CallbackOutcome::Unchanged {
                status: NotificationStatus::Sent
            }
        );
    }

    #[tokio::test]
    async fn undelivered_stores_error_code() {
        let env = TestStore::open().await;
        let record = sent_record(&env).await;
        let pid = record.provider_message_id.unwrap();

        tracker(&env)
            .on_provider_callback(&pid, "undelivered", Some("30003"))
            .await
            .unwrap();
        let stored = env.storage.get(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, NotificationStatus::Undelivered);
        assert_eq!(stored.error_detail.as_deref(), Some("provider error 30003"));
        assert!(stored.delivered_at.is_none());
    }

    #[tokio::test]
    async fn unknown_message_is_reported() {
        let env = TestStore::open().await;
        let err = tracker(&env)
            .on_provider_callback("SMmissing", "delivered", None)
            .await
            .unwrap_err();
        assert!(matches!(err, CallbackError::UnknownMessage(id) if id == "SMmissing"));
    }

    #[tokio::test]
    async fn callback_racing_mark_sent_is_not_replayed() {
        let env = TestStore::open().await;
        let record = NotificationRecord::pending(
            UserId("u1".into()),
            us_number(),
            "Your NFTopia verification code is: 1.".into(),
            NotificationKind::TwoFactorAuth,
            NotificationMetadata::default(),
            1,
        );
        env.storage.insert(&record).await.unwrap();

        let err = tracker(&env)
            .on_provider_callback("SMearly", "failed", Some("30005"))
            .await
            .unwrap_err();
        assert!(matches!(err, CallbackError::UnknownMessage(_)));
        let stored = env.storage.get(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, NotificationStatus::Pending);
        assert!(stored.error_detail.is_none());

        env.storage
            .mark_sent(&record.id, "SMearly", Utc::now())
            .await
            .unwrap();
        let stored = env.storage.get(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, NotificationStatus::Sent);

        let outcome = tracker(&env)
            .on_provider_callback("SMearly", "failed", Some("30005"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            CallbackOutcome::Applied {
                from: NotificationStatus::Sent,
                to: NotificationStatus::Failed,
            }
        );
    }

    #[tokio::test]
    async fn unrecognized_status_leaves_record_alone() {
        let env = TestStore::open().await;
        let record = sent_record(&env).await;
        let pid = record.provider_message_id.unwrap();

        let err = tracker(&env)
            .on_provider_callback(&pid, "teleported", None)
            .await
            .unwrap_err();
        assert!(matches!(err, CallbackError::UnrecognizedStatus(s) if s == "teleported"));
        let stored = env.storage.get(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, NotificationStatus::Sent);
    }

    #[tokio::test]
    async fn concurrent_duplicates_apply_once() {
        let env = TestStore::open().await;
        let record = sent_record(&env).await;
        let pid = record.provider_message_id.unwrap();
        let tracker = tracker(&env);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let tracker = tracker.clone();
            let pid = pid.clone();
            handles.push(tokio::spawn(async move {
                tracker.on_provider_callback(&pid, "delivered", None).await
            }));
        }
        let mut applied = 0;
        for handle in handles {
            if let Ok(CallbackOutcome::Applied { .. }) = handle.await.unwrap() {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);
    }
}
