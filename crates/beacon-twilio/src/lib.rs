// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Twilio-compatible SMS provider for Beacon.
//!
//! [`TwilioProvider`] implements [`SmsProvider`] over the Messages REST API.
//! The [`signature`] module verifies status webhooks signed with the
//! account's auth token.

pub mod client;
pub mod signature;

use std::time::Duration;

use async_trait::async_trait;
use beacon_config::model::TwilioConfig;
use beacon_core::types::{OutboundSms, ProviderError, ProviderReceipt};
use beacon_core::{AdapterType, BeaconError, HealthStatus, PluginAdapter, SmsProvider};
use secrecy::SecretString;
use tracing::info;

pub use client::{TwilioClient, classify};
pub use signature::{SIGNATURE_HEADER, compute_signature, verify_signature};

/// Twilio provider implementing [`SmsProvider`].
pub struct TwilioProvider {
    client: TwilioClient,
}

impl TwilioProvider {
    /// Build from config. Requires `account_sid` and `auth_token`.
    pub fn new(config: &TwilioConfig) -> Result<Self, BeaconError> {
        let account_sid = config
            .account_sid
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BeaconError::Config("twilio.account_sid is not set".into()))?;
        let auth_token = config
            .auth_token
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BeaconError::Config("twilio.auth_token is not set".into()))?;

        let client = TwilioClient::new(
            account_sid,
            SecretString::from(auth_token),
            &config.api_base_url,
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(base_url = %config.api_base_url, "twilio provider initialized");
        Ok(Self { client })
    }

    pub fn client(&self) -> &TwilioClient {
        &self.client
    }
}

#[async_trait]
impl PluginAdapter for TwilioProvider {
    fn name(&self) -> &str {
        "twilio"
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
impl SmsProvider for TwilioProvider {
    async fn send_message(&self, message: &OutboundSms) -> Result<ProviderReceipt, ProviderError> {
        self.client.send_message(message).await
    }
}
