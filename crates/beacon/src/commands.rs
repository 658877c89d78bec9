// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `beacon policies` and `beacon check`.

use beacon_config::model::BeaconConfig;
use beacon_core::{BeaconError, PolicyStore, mask_phone};
use beacon_dispatch::ComplianceValidator;

use crate::serve::open_compliance;

/// Print stored carrier compliance policies.
pub async fn run_policies(config: &BeaconConfig) -> Result<(), BeaconError> {
    let (storage, _) = open_compliance(config).await?;
    let policies = storage.load_policies().await?;
    println!(
        "{:<12} {:<8} {:>6} {:<8} {:<8} KEYWORDS",
        "CARRIER", "COUNTRY", "MAX", "UNICODE", "OPT-OUT"
    );
    for p in &policies {
        println!(
            "{:<12} {:<8} {:>6} {:<8} {:<8} {}",
            p.carrier_name,
            p.country_code,
            p.max_message_length,
            p.supports_unicode,
            p.opt_out_required,
            p.restricted_keywords.join(",")
        );
    }
    println!("{} policies", policies.len());
    Ok(())
}

/// Check a message offline. Returns whether it would pass compliance.
pub async fn run_check(
    config: &BeaconConfig,
    phone: &str,
    message: &str,
) -> Result<bool, BeaconError> {
    let (_, validator) = open_compliance(config).await?;
    let (line, passed) = verdict(&validator, phone, message);
    println!("{line}");
    Ok(passed)
}

fn verdict(validator: &ComplianceValidator, phone: &str, message: &str) -> (String, bool) {
    match validator.validate(phone, message) {
        Ok(destination) => (
            format!(
                "ok: {} region={} carrier={}",
                mask_phone(&destination.phone.e164),
                destination.phone.region.as_deref().unwrap_or("-"),
                destination.carrier.as_deref().unwrap_or("default"),
            ),
            true,
        ),
        Err(reason) => (format!("rejected: {reason}"), false),
    }
}
