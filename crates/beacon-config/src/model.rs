// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Beacon SMS dispatcher.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Beacon configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BeaconConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Twilio-compatible SMS provider credentials.
    #[serde(default)]
    pub twilio: TwilioConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Per-user send quota.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Retry backoff for asynchronous sends.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Fallback compliance policy and carrier prefix table.
    #[serde(default)]
    pub compliance: ComplianceConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Prometheus metrics settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used in logs and health output.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Externally reachable base URL. The provider status callback is
    /// `<public_base_url>/sms/webhook/status`. `None` sends without a callback.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            public_base_url: None,
        }
    }
}

impl ServiceConfig {
    /// The status callback URL handed to the provider, if a base URL is set.
    pub fn status_callback_url(&self) -> Option<String> {
        self.public_base_url
            .as_deref()
            .map(|base| format!("{}/sms/webhook/status", base.trim_end_matches('/')))
    }
}

fn default_service_name() -> String {
    "beacon".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Twilio-compatible provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TwilioConfig {
    /// Account SID. `None` disables the live provider.
    #[serde(default)]
    pub account_sid: Option<String>,

    /// Auth token, also used to verify webhook signatures.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Sender number in E.164 form.
    #[serde(default)]
    pub from_number: Option<String>,

    /// REST API base URL.
    #[serde(default = "default_twilio_api_base_url")]
    pub api_base_url: String,

    /// Bounded timeout for one provider send, in seconds.
    #[serde(default = "default_twilio_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: None,
            api_base_url: default_twilio_api_base_url(),
            timeout_secs: default_twilio_timeout_secs(),
        }
    }
}

fn default_twilio_api_base_url() -> String {
    "https://api.twilio.com".to_string()
}

fn default_twilio_timeout_secs() -> u64 {
    10
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL mode for concurrent reads.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("beacon").join("beacon.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("beacon.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Where rate-limit counters live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterBackend {
    /// Process-local counters. Correct for a single instance only.
    Memory,
    /// Counters in the shared SQLite database.
    Sqlite,
}

/// Per-user send quota configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Sends allowed per user per window.
    #[serde(default = "default_max_per_window")]
    pub max_per_window: u64,

    /// Window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    #[serde(default = "default_counter_backend")]
    pub backend: CounterBackend,

    /// Allow sends when the counter store is unreachable.
    #[serde(default)]
    pub fail_open: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_per_window: default_max_per_window(),
            window_secs: default_window_secs(),
            backend: default_counter_backend(),
            fail_open: false,
        }
    }
}

fn default_max_per_window() -> u64 {
    10
}

fn default_window_secs() -> u64 {
    3600
}

fn default_counter_backend() -> CounterBackend {
    CounterBackend::Sqlite
}

/// Retry backoff configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts per job, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay for urgent kinds (two-factor codes).
    #[serde(default = "default_urgent_base_delay_secs")]
    pub urgent_base_delay_secs: u64,

    /// Base delay for every other kind.
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,

    /// Upper bound on any single delay.
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            urgent_base_delay_secs: default_urgent_base_delay_secs(),
            base_delay_secs: default_base_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_urgent_base_delay_secs() -> u64 {
    30
}

fn default_base_delay_secs() -> u64 {
    60
}

fn default_max_delay_secs() -> u64 {
    3600
}

/// Compliance fallback and carrier resolution.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ComplianceConfig {
    /// Length limit when no carrier policy matches.
    #[serde(default = "default_max_length")]
    pub default_max_length: usize,

    /// Whether non-ASCII bodies pass when no carrier policy matches.
    #[serde(default)]
    pub default_supports_unicode: bool,

    /// Number prefix to carrier table, matched longest prefix first.
    #[serde(default)]
    pub carriers: Vec<CarrierPrefixConfig>,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            default_max_length: default_max_length(),
            default_supports_unicode: false,
            carriers: Vec::new(),
        }
    }
}

fn default_max_length() -> usize {
    160
}

/// One entry of the carrier prefix table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CarrierPrefixConfig {
    /// ISO 3166-1 alpha-2 region code.
    pub country: String,
    /// Leading E.164 digits, without `+`.
    pub prefix: String,
    pub carrier: String,
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token for the `/v1` API. `None` rejects every `/v1` request.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Require a valid provider signature on status webhooks.
    #[serde(default = "default_verify_signatures")]
    pub verify_signatures: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
            verify_signatures: default_verify_signatures(),
        }
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_verify_signatures() -> bool {
    true
}

/// Prometheus metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    #[serde(default = "default_prometheus_enabled")]
    pub enabled: bool,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: default_prometheus_enabled(),
        }
    }
}

fn default_prometheus_enabled() -> bool {
    true
}
