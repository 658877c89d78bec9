// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Twilio Messages REST API.
//!
//! Provides [`TwilioClient`], which posts form-encoded send requests with
//! basic auth and classifies failures into [`ProviderErrorKind`]s.

use std::time::Duration;

use beacon_core::BeaconError;
use beacon_core::types::{OutboundSms, ProviderError, ProviderErrorKind, ProviderReceipt};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

/// Provider error codes that mean the destination cannot receive messages.
const INVALID_DESTINATION_CODES: &[i64] = &[21211, 21214, 21217, 21610, 21614];

/// Message resource returned on a successful create.
#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

/// Error body returned on 4xx/5xx.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// Twilio REST client bound to one account.
#[derive(Debug, Clone)]
pub struct TwilioClient {
    client: reqwest::Client,
    account_sid: String,
    auth_token: SecretString,
    base_url: String,
}

impl TwilioClient {
    pub fn new(
        account_sid: String,
        auth_token: SecretString,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, BeaconError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BeaconError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            account_sid,
            auth_token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn account_sid(&self) -> &str {
        &self.account_sid
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        )
    }

    /// Create one outbound message.
    pub async fn send_message(
        &self,
        message: &OutboundSms,
    ) -> Result<ProviderReceipt, ProviderError> {
        let mut form = vec![
            ("To", message.to.as_str()),
            ("From", message.from.as_str()),
            ("Body", message.body.as_str()),
        ];
        if let Some(url) = &message.status_callback_url {
            form.push(("StatusCallback", url.as_str()));
        }

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        debug!(status = %status, "message create response received");

        if status.is_success() {
            let resource: MessageResource = response.json().await.map_err(|e| {
                // Not retried: the message may already be queued.
                ProviderError::new(
                    ProviderErrorKind::Client(status.as_u16()),
                    format!("unreadable message resource: {e}"),
                )
            })?;
            return Ok(ProviderReceipt {
                provider_message_id: resource.sid,
                status: resource.status,
            });
        }

        let body = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ApiErrorBody>(&body).ok();
        let code = parsed.as_ref().and_then(|b| b.code);
        let message = parsed
            .and_then(|b| b.message)
            .unwrap_or_else(|| format!("API returned {status}: {body}"));
        warn!(status = %status, code, "message create rejected");

        let mut error = ProviderError::new(classify(status.as_u16(), code), message);
        if let Some(code) = code {
            error = error.with_code(code.to_string());
        }
        Err(error)
    }
}

/// Map an HTTP status and provider error code to a failure kind.
pub fn classify(status: u16, code: Option<i64>) -> ProviderErrorKind {
    if code.is_some_and(|c| INVALID_DESTINATION_CODES.contains(&c)) {
        return ProviderErrorKind::InvalidDestination;
    }
    match status {
        429 => ProviderErrorKind::RateLimited,
        500..=599 => ProviderErrorKind::Server(status),
        _ => ProviderErrorKind::Client(status),
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    let kind = if e.is_timeout() {
        ProviderErrorKind::Timeout
    } else {
        ProviderErrorKind::Network
    };
    ProviderError::new(kind, format!("HTTP request failed: {e}"))
}
