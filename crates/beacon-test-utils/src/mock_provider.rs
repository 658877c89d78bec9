// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock SMS provider for deterministic testing.
//!
//! `MockSmsProvider` implements `SmsProvider` with a FIFO queue of scripted
//! outcomes and records every request with the tokio instant it arrived at.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use beacon_core::types::{
    AdapterType, HealthStatus, OutboundSms, ProviderError, ProviderErrorKind, ProviderReceipt,
};
use beacon_core::{BeaconError, PluginAdapter, SmsProvider};

/// What the mock does with one request.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Accept and return a fresh `SM...` id.
    Accept,
    /// Fail with the given error.
    Fail(ProviderError),
    /// Never answer; the caller's timeout decides.
    Hang,
}

impl MockOutcome {
    pub fn fail(kind: ProviderErrorKind) -> Self {
        MockOutcome::Fail(ProviderError::new(kind, format!("mock {kind:?} failure")))
    }
}

/// A request seen by the mock.
#[derive(Debug, Clone)]
pub struct CapturedSms {
    pub message: OutboundSms,
    pub at: Instant,
}

/// Scripted provider. When the queue is empty the default outcome applies.
pub struct MockSmsProvider {
    outcomes: Arc<Mutex<VecDeque<MockOutcome>>>,
    default_outcome: MockOutcome,
    captured: Arc<Mutex<Vec<CapturedSms>>>,
    next_id: AtomicU64,
}

impl MockSmsProvider {
    /// A provider that accepts everything.
    pub fn new() -> Self {
        Self::with_default(MockOutcome::Accept)
    }

    pub fn with_default(default_outcome: MockOutcome) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            default_outcome,
            captured: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Queue outcomes ahead of the default.
    pub async fn push_outcomes(&self, outcomes: impl IntoIterator<Item = MockOutcome>) {
        self.outcomes.lock().await.extend(outcomes);
    }

    pub async fn captured(&self) -> Vec<CapturedSms> {
        self.captured.lock().await.clone()
    }

    pub async fn send_count(&self) -> usize {
        self.captured.lock().await.len()
    }

    async fn next_outcome(&self) -> MockOutcome {
        self.outcomes
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.default_outcome.clone())
    }
}

impl Default for MockSmsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockSmsProvider {
    fn name(&self) -> &str {
        "mock-sms"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
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
impl SmsProvider for MockSmsProvider {
    async fn send_message(&self, message: &OutboundSms) -> Result<ProviderReceipt, ProviderError> {
        self.captured.lock().await.push(CapturedSms {
            message: message.clone(),
            at: Instant::now(),
        });
        match self.next_outcome().await {
            MockOutcome::Accept => {
                let n = self.next_id.fetch_add(1, Ordering::Relaxed);
                Ok(ProviderReceipt {
                    provider_message_id: format!("SM{n:032x}"),
                    status: Some("queued".to_string()),
                })
            }
            MockOutcome::Fail(error) => Err(error),
            MockOutcome::Hang => std::future::pending().await,
        }
    }
}
