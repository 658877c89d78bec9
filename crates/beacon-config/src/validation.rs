// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-zero quotas, ordered backoff bounds, and E.164 sender numbers.

use crate::diagnostic::ConfigError;
use crate::model::BeaconConfig;

/// Shortest accepted rate-limit window.
const MIN_WINDOW_SECS: u64 = 60;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &BeaconConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let rate = &config.rate_limit;
    if rate.max_per_window < 1 {
        fail("rate_limit.max_per_window must be at least 1".to_string());
    }
    if rate.window_secs < MIN_WINDOW_SECS {
        fail(format!(
            "rate_limit.window_secs must be at least {MIN_WINDOW_SECS}, got {}",
            rate.window_secs
        ));
    }

    let retry = &config.retry;
    if retry.max_attempts < 1 {
        fail("retry.max_attempts must be at least 1".to_string());
    }
    if retry.urgent_base_delay_secs < 1 || retry.base_delay_secs < 1 {
        fail("retry base delays must be at least 1 second".to_string());
    }
    if retry.urgent_base_delay_secs > retry.base_delay_secs {
        fail(format!(
            "retry.urgent_base_delay_secs ({}) must not exceed retry.base_delay_secs ({})",
            retry.urgent_base_delay_secs, retry.base_delay_secs
        ));
    }
    if retry.base_delay_secs > retry.max_delay_secs {
        fail(format!(
            "retry.base_delay_secs ({}) must not exceed retry.max_delay_secs ({})",
            retry.base_delay_secs, retry.max_delay_secs
        ));
    }

    if config.twilio.timeout_secs < 1 {
        fail("twilio.timeout_secs must be at least 1".to_string());
    }
    if let Some(from) = &config.twilio.from_number
        && !is_e164(from)
    {
        fail(format!(
            "twilio.from_number `{from}` is not in E.164 form (+<country><number>)"
        ));
    }

    if config.compliance.default_max_length < 1 {
        fail("compliance.default_max_length must be at least 1".to_string());
    }
    for (i, carrier) in config.compliance.carriers.iter().enumerate() {
        if carrier.prefix.is_empty() || !carrier.prefix.chars().all(|c| c.is_ascii_digit()) {
            fail(format!(
                "compliance.carriers[{i}].prefix `{}` must be non-empty digits",
                carrier.prefix
            ));
        }
        if carrier.carrier.trim().is_empty() {
            fail(format!("compliance.carriers[{i}].carrier must not be empty"));
        }
        if carrier.country.len() != 2 || !carrier.country.chars().all(|c| c.is_ascii_alphabetic())
        {
            fail(format!(
                "compliance.carriers[{i}].country `{}` must be a two-letter region code",
                carrier.country
            ));
        }
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if let Some(base) = &config.service.public_base_url
        && !(base.starts_with("http://") || base.starts_with("https://"))
    {
        fail(format!(
            "service.public_base_url `{base}` must start with http:// or https://"
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_e164(number: &str) -> bool {
    let Some(digits) = number.strip_prefix('+') else {
        return false;
    };
    (8..=15).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0')
}
