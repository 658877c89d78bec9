// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use beacon_core::{BeaconError, NotificationStore, PluginAdapter};
use beacon_dispatch::{DeliveryTracker, DispatchService, RetryScheduler};
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;
use crate::webhook;

/// Path of the provider status webhook.
pub const STATUS_WEBHOOK_PATH: &str = "/sms/webhook/status";

/// Health state for unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
    /// Adapters checked on every `/health` request.
    pub components: Vec<Arc<dyn PluginAdapter>>,
}

/// Webhook signature settings.
#[derive(Debug, Clone, Default)]
pub struct WebhookConfig {
    /// Provider auth token. Verification is skipped when unset.
    pub auth_token: Option<SecretString>,
    /// Public URL the provider signs. Falls back to `Host` + path.
    pub callback_url: Option<String>,
    pub verify_signatures: bool,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub service: Arc<DispatchService>,
    pub scheduler: RetryScheduler,
    pub tracker: DeliveryTracker,
    pub store: Arc<dyn NotificationStore>,
    pub auth: AuthConfig,
    pub webhook: WebhookConfig,
    pub health: HealthState,
}

/// Gateway server configuration (mirrors GatewayConfig from beacon-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Build the router:
/// - GET /health, GET /metrics (public)
/// - POST /sms/webhook/status (provider signature)
/// - POST/GET /v1/notifications, GET /v1/notifications/{id}, GET /v1/stats (bearer)
pub fn build_router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .route("/metrics", get(handlers::get_public_metrics))
        .route(STATUS_WEBHOOK_PATH, post(webhook::post_status_callback))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route(
            "/v1/notifications",
            post(handlers::post_notification).get(handlers::list_notifications),
        )
        .route("/v1/notifications/{id}", get(handlers::get_notification))
        .route("/v1/stats", get(handlers::get_stats))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve until `shutdown` is cancelled.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), BeaconError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| BeaconError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| BeaconError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
