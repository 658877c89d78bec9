// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./beacon.toml` > `~/.config/beacon/beacon.toml` > `/etc/beacon/beacon.toml`
//! with environment variable overrides via `BEACON_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::BeaconConfig;

/// Config sections addressable from the environment, longest names first so
/// `rate_limit_` wins over any shorter section sharing its prefix.
const ENV_SECTIONS: &[&str] = &[
    "compliance",
    "prometheus",
    "rate_limit",
    "gateway",
    "service",
    "storage",
    "twilio",
    "retry",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/beacon/beacon.toml` (system-wide)
/// 3. `~/.config/beacon/beacon.toml` (user XDG config)
/// 4. `./beacon.toml` (local directory)
/// 5. `BEACON_*` environment variables
pub fn load_config() -> Result<BeaconConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<BeaconConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BeaconConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BeaconConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BeaconConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(BeaconConfig::default()))
        .merge(Toml::file("/etc/beacon/beacon.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("beacon/beacon.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("beacon.toml"))
        .merge(env_provider())
}

/// Environment provider with explicit section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `BEACON_TWILIO_AUTH_TOKEN` must map to `twilio.auth_token`,
/// not `twilio.auth.token`.
fn env_provider() -> Env {
    Env::prefixed("BEACON_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
