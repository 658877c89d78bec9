// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for Beacon.
//!
//! Serves the provider status webhook, the bearer-authenticated trigger and
//! query API, and unauthenticated health and metrics endpoints.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod webhook;

pub use auth::AuthConfig;
pub use server::{
    GatewayState, HealthState, STATUS_WEBHOOK_PATH, ServerConfig, WebhookConfig, build_router,
    start_server,
};
