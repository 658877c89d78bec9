// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dispatch pipeline: compose, rate-limit, validate, persist, send.

use std::sync::Arc;
use std::time::Duration;

use beacon_core::types::{
    DispatchOutcome, NotificationParams, NotificationRecord, OutboundSms, ProviderError,
    ProviderErrorKind, RejectReason,
};
use beacon_core::{
    BeaconError, NotificationStatus, NotificationStore, SmsProvider, UserId, mask_phone,
};
use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::compliance::ComplianceValidator;
use crate::composer;
use crate::rate_limit::RateLimiter;

/// Default bound on a single provider call.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Sender identity and provider call settings.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub from_number: String,
    /// Passed to the provider so it can report delivery status.
    pub status_callback_url: Option<String>,
    pub provider_timeout: Duration,
}

impl DispatchSettings {
    pub fn new(from_number: impl Into<String>) -> Self {
        Self {
            from_number: from_number.into(),
            status_callback_url: None,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

/// Sends one notification per call and records the attempt.
///
/// Every collaborator is injected; the service holds no global state.
pub struct DispatchService {
    limiter: RateLimiter,
    validator: Arc<ComplianceValidator>,
    provider: Arc<dyn SmsProvider>,
    store: Arc<dyn NotificationStore>,
    settings: DispatchSettings,
}

impl DispatchService {
    pub fn new(
        limiter: RateLimiter,
        validator: Arc<ComplianceValidator>,
        provider: Arc<dyn SmsProvider>,
        store: Arc<dyn NotificationStore>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            limiter,
            validator,
            provider,
            store,
            settings,
        }
    }

    pub fn validator(&self) -> &Arc<ComplianceValidator> {
        &self.validator
    }

    pub fn store(&self) -> &Arc<dyn NotificationStore> {
        &self.store
    }

    /// Send a notification as a first attempt.
    pub async fn send(
        &self,
        user_id: &UserId,
        phone_number: &str,
        params: &NotificationParams,
    ) -> Result<DispatchOutcome, BeaconError> {
        self.send_attempt(user_id, phone_number, params, 1).await
    }

    /// Send a notification, tagging the record with a 1-based attempt number.
    ///
    /// Rejections create no record. Past validation exactly one record is
    /// written and then moved to `sent` or `failed`. `Err` is reserved for
    /// storage failures.
    #[instrument(
        skip(self, phone_number, params),
        fields(kind = %params.kind(), to = %mask_phone(phone_number))
    )]
    pub async fn send_attempt(
        &self,
        user_id: &UserId,
        phone_number: &str,
        params: &NotificationParams,
        attempt: u32,
    ) -> Result<DispatchOutcome, BeaconError> {
        let kind = params.kind();
        let body = composer::compose(params);

        if !self.limiter.try_consume(user_id).await {
            return Ok(self.rejected(kind.to_string(), RejectReason::RateLimited));
        }

        let destination = match self.validator.validate(phone_number, &body) {
            Ok(destination) => destination,
            Err(reason) => return Ok(self.rejected(kind.to_string(), reason)),
        };

        let mut record = NotificationRecord::pending(
            user_id.clone(),
            destination.phone.e164.clone(),
            body,
            kind,
            params.metadata(),
            attempt,
        );
        self.store.insert(&record).await?;

        let message = OutboundSms {
            from: self.settings.from_number.clone(),
            to: record.phone_number.clone(),
            body: record.body.clone(),
            status_callback_url: self.settings.status_callback_url.clone(),
        };

        let started = Instant::now();
        let timeout = self.settings.provider_timeout;
        let result = match tokio::time::timeout(timeout, self.provider.send_message(&message)).await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::new(
                ProviderErrorKind::Timeout,
                format!("provider did not respond within {timeout:?}"),
            )),
        };
        beacon_prometheus::record_provider_latency(started.elapsed());

        let outcome = match result {
            Ok(receipt) => {
                let sent_at = Utc::now();
                self.persist_sent(&record, &receipt.provider_message_id, sent_at)
                    .await?;
                record.status = NotificationStatus::Sent;
                record.provider_message_id = Some(receipt.provider_message_id);
                record.sent_at = Some(sent_at);
                info!(
                    notification_id = %record.id,
                    provider_message_id = record.provider_message_id.as_deref().unwrap_or(""),
                    attempt,
                    "sms sent"
                );
                DispatchOutcome::Sent(record)
            }
            Err(error) => {
                let detail = error.detail();
                self.store.mark_failed(&record.id, &detail).await?;
                record.status = NotificationStatus::Failed;
                record.error_detail = Some(detail);
                warn!(
                    notification_id = %record.id,
                    error = %error,
                    transient = error.is_transient(),
                    attempt,
                    "sms send failed"
                );
                DispatchOutcome::Failed { record, error }
            }
        };

        beacon_prometheus::record_dispatch(&kind.to_string(), outcome.label());
        Ok(outcome)
    }

    /// Record provider acceptance, retrying the write once.
    ///
    /// The provider has already taken the message, so a lost write would
    /// orphan its id. The id is logged at `error` before the failure surfaces.
    async fn persist_sent(
        &self,
        record: &NotificationRecord,
        provider_message_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<(), BeaconError> {
        let first = self
            .store
            .mark_sent(&record.id, provider_message_id, sent_at)
            .await;
        let Err(first) = first else {
            return Ok(());
        };
        warn!(
            notification_id = %record.id,
            provider_message_id,
            error = %first,
            "failed to record sent status, retrying"
        );
        if let Err(e) = self
            .store
            .mark_sent(&record.id, provider_message_id, sent_at)
            .await
        {
            error!(
                notification_id = %record.id,
                provider_message_id,
                error = %e,
                "provider accepted sms but sent status was not recorded"
            );
            return Err(e);
        }
        Ok(())
    }

    fn rejected(&self, kind: String, reason: RejectReason) -> DispatchOutcome {
        info!(reason = %reason, "sms rejected");
        beacon_prometheus::record_rejection(reason.label());
        beacon_prometheus::record_dispatch(&kind, "rejected");
        DispatchOutcome::Rejected(reason)
    }
}
