// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! POST /sms/webhook/status
//!
//! Form fields `MessageSid`, `MessageStatus`, optional `ErrorCode`. Every
//! callback the tracker can classify is acknowledged with 200 so the provider
//! does not redeliver it; only storage failures return 500.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use beacon_core::CallbackOutcome;
use beacon_dispatch::CallbackError;
use beacon_twilio::{SIGNATURE_HEADER, verify_signature};
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::{error, warn};

use crate::handlers::ErrorResponse;
use crate::server::{GatewayState, STATUS_WEBHOOK_PATH};

/// Acknowledgement body.
#[derive(Debug, Serialize)]
pub struct CallbackAck {
    /// `applied`, `unchanged`, `regressive`, `unknown_message`, or
    /// `unrecognized_status`.
    pub result: &'static str,
}

pub async fn post_status_callback(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Ok(params) = serde_urlencoded::from_bytes::<Vec<(String, String)>>(&body) else {
        return bad_request("malformed form body");
    };

    if let Err(status) = check_signature(&state, &headers, &params) {
        return status.into_response();
    }

    let (Some(sid), Some(status)) = (
        form_field(&params, "MessageSid"),
        form_field(&params, "MessageStatus"),
    ) else {
        return bad_request("MessageSid and MessageStatus are required");
    };

    let result = match state
        .tracker
        .on_provider_callback(sid, status, form_field(&params, "ErrorCode"))
        .await
    {
        Ok(outcome) => match outcome {
            CallbackOutcome::Applied { .. } => "applied",
            CallbackOutcome::Unchanged { .. } => "unchanged",
            CallbackOutcome::Regressive { .. } => "regressive",
        },
        Err(e @ (CallbackError::UnknownMessage(_) | CallbackError::UnrecognizedStatus(_))) => {
            e.label()
        }
        Err(CallbackError::Storage(e)) => {
            error!(provider_message_id = sid, error = %e, "status callback failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "storage error".to_string(),
                }),
            )
                .into_response();
        }
    };

    (StatusCode::OK, Json(CallbackAck { result })).into_response()
}

fn form_field<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

fn check_signature(
    state: &GatewayState,
    headers: &HeaderMap,
    params: &[(String, String)],
) -> Result<(), StatusCode> {
    let config = &state.webhook;
    let Some(token) = config.auth_token.as_ref().filter(|_| config.verify_signatures) else {
        return Ok(());
    };

    let url = match &config.callback_url {
        Some(url) => url.clone(),
        None => {
            let host = headers
                .get("host")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("localhost");
            format!("https://{host}{STATUS_WEBHOOK_PATH}")
        }
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            warn!("status callback without signature");
            StatusCode::FORBIDDEN
        })?;

    if verify_signature(token.expose_secret(), &url, params, signature) {
        Ok(())
    } else {
        warn!("status callback with invalid signature");
        Err(StatusCode::FORBIDDEN)
    }
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}
