// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use beacon_core::types::{
    DispatchOutcome, NotificationFilter, NotificationId, NotificationKind, NotificationParams,
    NotificationRecord, NotificationStats, NotificationStatus, RejectReason,
};
use beacon_core::{BeaconError, HealthStatus, UserId, mask_phone};
use beacon_dispatch::RetryJob;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::server::GatewayState;

/// Records per page for the list endpoint.
pub const PAGE_SIZE: u32 = 20;

/// Default statistics window.
pub const DEFAULT_STATS_DAYS: u32 = 30;

/// How a trigger request is executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Dispatch inline and return the outcome.
    #[default]
    Sync,
    /// Enqueue on the retry scheduler and return 202.
    Async,
}

/// Request body for POST /v1/notifications.
#[derive(Debug, Deserialize)]
pub struct TriggerRequest {
    pub user_id: String,
    pub phone_number: String,
    pub notification: NotificationParams,
    #[serde(default)]
    pub mode: DispatchMode,
}

/// Response body for a synchronous dispatch.
#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    /// `sent`, `rejected`, or `failed`.
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationRecord>,
}

/// Response body for an accepted async dispatch.
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub user_id: String,
    #[serde(default)]
    pub kind: Option<NotificationKind>,
    #[serde(default)]
    pub status: Option<NotificationStatus>,
    /// 1-based page number.
    #[serde(default)]
    pub page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub page: u32,
    pub notifications: Vec<NotificationRecord>,
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub user_id: String,
    #[serde(default)]
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub user_id: String,
    pub days: u32,
    #[serde(flatten)]
    pub stats: NotificationStats,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, `degraded`, or `unhealthy`.
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn storage_failure(e: BeaconError) -> Response {
    error!(error = %e, "request failed");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}

fn rejection_status(reason: &RejectReason) -> StatusCode {
    match reason {
        RejectReason::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

/// POST /v1/notifications
pub async fn post_notification(
    State(state): State<GatewayState>,
    Json(body): Json<TriggerRequest>,
) -> Response {
    let user_id = UserId(body.user_id);

    if body.mode == DispatchMode::Async {
        info!(
            user_id = %user_id,
            kind = %body.notification.kind(),
            to = %mask_phone(&body.phone_number),
            "sms enqueued"
        );
        // Detached; the scheduler tracks the task for shutdown.
        let _handle = state.scheduler.schedule(RetryJob {
            user_id,
            phone_number: body.phone_number,
            params: body.notification,
        });
        return (
            StatusCode::ACCEPTED,
            Json(AcceptedResponse { status: "accepted" }),
        )
            .into_response();
    }

    let outcome = match state
        .service
        .send(&user_id, &body.phone_number, &body.notification)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => return storage_failure(e),
    };

    let label = outcome.label();
    match outcome {
        DispatchOutcome::Sent(record) => (
            StatusCode::OK,
            Json(DispatchResponse {
                outcome: label,
                reason: None,
                error: None,
                notification: Some(record),
            }),
        )
            .into_response(),
        DispatchOutcome::Rejected(reason) => (
            rejection_status(&reason),
            Json(DispatchResponse {
                outcome: label,
                reason: Some(reason.to_string()),
                error: None,
                notification: None,
            }),
        )
            .into_response(),
        DispatchOutcome::Failed { record, error } => (
            StatusCode::BAD_GATEWAY,
            Json(DispatchResponse {
                outcome: label,
                reason: None,
                error: Some(error.detail()),
                notification: Some(record),
            }),
        )
            .into_response(),
    }
}

/// GET /v1/notifications
pub async fn list_notifications(
    State(state): State<GatewayState>,
    Query(query): Query<ListQuery>,
) -> Response {
    let page = query.page.unwrap_or(1).max(1);
    let filter = NotificationFilter {
        user_id: Some(UserId(query.user_id)),
        kind: query.kind,
        status: query.status,
        limit: Some(PAGE_SIZE),
        offset: Some((page - 1).saturating_mul(PAGE_SIZE)),
    };
    match state.store.list(&filter).await {
        Ok(notifications) => Json(ListResponse {
            page,
            notifications,
        })
        .into_response(),
        Err(e) => storage_failure(e),
    }
}

/// GET /v1/notifications/{id}
///
/// Records owned by another user are reported as missing.
pub async fn get_notification(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Query(owner): Query<OwnerQuery>,
) -> Response {
    match state.store.get(&NotificationId(id)).await {
        Ok(Some(record)) if record.user_id.as_str() == owner.user_id => {
            Json(record).into_response()
        }
        Ok(_) => error_response(StatusCode::NOT_FOUND, "notification not found"),
        Err(e) => storage_failure(e),
    }
}

/// GET /v1/stats
pub async fn get_stats(
    State(state): State<GatewayState>,
    Query(query): Query<StatsQuery>,
) -> Response {
    let days = query.days.unwrap_or(DEFAULT_STATS_DAYS);
    let since = chrono::Utc::now() - chrono::Duration::days(i64::from(days));
    let user_id = UserId(query.user_id);
    match state.store.stats(&user_id, since).await {
        Ok(stats) => Json(StatsResponse {
            user_id: user_id.0,
            days,
            stats,
        })
        .into_response(),
        Err(e) => storage_failure(e),
    }
}

/// GET /health
///
/// Runs every registered adapter's health check. Any unhealthy or failing
/// adapter turns the response into a 503.
pub async fn get_public_health(State(state): State<GatewayState>) -> Response {
    let mut issues = Vec::new();
    let mut unhealthy = false;
    for component in &state.health.components {
        match component.health_check().await {
            Ok(HealthStatus::Healthy) => {}
            Ok(HealthStatus::Degraded(reason)) => {
                issues.push(format!("{}: {reason}", component.name()));
            }
            Ok(HealthStatus::Unhealthy(reason)) => {
                unhealthy = true;
                issues.push(format!("{}: {reason}", component.name()));
            }
            Err(e) => {
                unhealthy = true;
                issues.push(format!("{}: {e}", component.name()));
            }
        }
    }

    let (code, status) = match (unhealthy, issues.is_empty()) {
        (true, _) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
        (false, false) => (StatusCode::OK, "degraded"),
        (false, true) => (StatusCode::OK, "ok"),
    };
    if code != StatusCode::OK {
        warn!(issues = ?issues, "health check failed");
    }
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: state.health.start_time.elapsed().as_secs(),
            issues,
        }),
    )
        .into_response()
}

/// GET /metrics
pub async fn get_public_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => error_response(StatusCode::NOT_FOUND, "metrics disabled"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_request_defaults_to_sync() {
        let json = r#"{
            "user_id": "u1",
            "phone_number": "+12015550123",
            "notification": {"kind": "two_factor_auth", "code": "482913"}
        }"#;
        let req: TriggerRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.mode, DispatchMode::Sync);
        assert_eq!(req.notification.kind(), NotificationKind::TwoFactorAuth);
    }

    #[test]
    fn trigger_request_parses_bid_alert() {
        let json = r#"{
            "user_id": "u1",
            "phone_number": "+12015550123",
            "mode": "async",
            "notification": {
                "kind": "bid_alert",
                "nft_name": "CryptoPunk #42",
                "bid_amount": "1.5",
                "bidder": "alice",
                "nft_id": "nft-42",
                "auction_id": "auc-1"
            }
        }"#;
        let req: TriggerRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.mode, DispatchMode::Async);
        assert_eq!(req.notification.kind(), NotificationKind::BidAlert);
    }

    #[test]
    fn rejection_status_codes() {
        assert_eq!(
            rejection_status(&RejectReason::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            rejection_status(&RejectReason::InvalidNumber),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn dispatch_response_omits_empty_fields() {
        let resp = DispatchResponse {
            outcome: "rejected",
            reason: Some("rate_limited".into()),
            error: None,
            notification: None,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"outcome":"rejected","reason":"rate_limited"}"#);
    }
}
