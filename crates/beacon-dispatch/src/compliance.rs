// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Carrier compliance validation.
//!
//! The validator resolves a destination to `(carrier, country)`, picks the
//! matching [`CompliancePolicy`] or the fallback, and checks the body against
//! it. Checks run in a fixed order and the first failure wins:
//!
//! 1. number parses and is valid (`invalid_number`)
//! 2. length in characters (`message_too_long`)
//! 3. character set (`unsupported_characters`)
//! 4. restricted keywords, case-insensitive substring (`restricted_keyword:<kw>`)
//!
//! The policy table is an immutable snapshot behind an [`ArcSwap`], so
//! validation never blocks and a reload swaps the whole table at once.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use beacon_config::model::ComplianceConfig;
use beacon_core::types::{CompliancePolicy, RejectReason};
use beacon_core::{BeaconError, PolicyStore};
use tracing::{debug, info};

use crate::phone::{CarrierDirectory, PhoneInfo, parse_phone};

/// Immutable `(carrier, country)` to policy map.
#[derive(Debug, Default)]
pub struct PolicyTable {
    policies: HashMap<(String, String), CompliancePolicy>,
}

impl PolicyTable {
    pub fn new(policies: impl IntoIterator<Item = CompliancePolicy>) -> Self {
        let policies = policies
            .into_iter()
            .map(|p| (policy_key(&p.carrier_name, &p.country_code), p))
            .collect();
        Self { policies }
    }

    pub fn lookup(&self, carrier: &str, country: &str) -> Option<&CompliancePolicy> {
        self.policies.get(&policy_key(carrier, country))
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

fn policy_key(carrier: &str, country: &str) -> (String, String) {
    (carrier.trim().to_lowercase(), country.trim().to_ascii_uppercase())
}

/// A destination that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDestination {
    pub phone: PhoneInfo,
    /// Resolved carrier, `None` when the fallback policy applied.
    pub carrier: Option<String>,
}

pub struct ComplianceValidator {
    table: ArcSwap<PolicyTable>,
    directory: CarrierDirectory,
    fallback: CompliancePolicy,
}

impl ComplianceValidator {
    pub fn new(
        policies: Vec<CompliancePolicy>,
        directory: CarrierDirectory,
        fallback: CompliancePolicy,
    ) -> Self {
        Self {
            table: ArcSwap::from_pointee(PolicyTable::new(policies)),
            directory,
            fallback,
        }
    }

    /// Build from config with the given initial policies.
    pub fn from_config(config: &ComplianceConfig, policies: Vec<CompliancePolicy>) -> Self {
        Self::new(
            policies,
            CarrierDirectory::new(&config.carriers),
            CompliancePolicy::fallback(config.default_max_length, config.default_supports_unicode),
        )
    }

    /// Swap in a new policy snapshot.
    pub fn replace_policies(&self, policies: Vec<CompliancePolicy>) {
        let table = PolicyTable::new(policies);
        info!(policies = table.len(), "compliance policies replaced");
        self.table.store(Arc::new(table));
    }

    /// Reload the snapshot from a policy store. Returns the policy count.
    pub async fn reload(&self, store: &dyn PolicyStore) -> Result<usize, BeaconError> {
        let policies = store.load_policies().await?;
        let count = policies.len();
        self.replace_policies(policies);
        Ok(count)
    }

    /// The policy that applies to `carrier` in `country`, or the fallback.
    pub fn policy_for(&self, carrier: Option<&str>, country: Option<&str>) -> CompliancePolicy {
        match (carrier, country) {
            (Some(carrier), Some(country)) => self
                .table
                .load()
                .lookup(carrier, country)
                .cloned()
                .unwrap_or_else(|| self.fallback.clone()),
            _ => self.fallback.clone(),
        }
    }

    /// Validate a destination and body.
    pub fn validate(
        &self,
        phone_number: &str,
        body: &str,
    ) -> Result<ValidatedDestination, RejectReason> {
        let phone = parse_phone(phone_number).ok_or(RejectReason::InvalidNumber)?;
        let carrier = self.directory.resolve(&phone).map(str::to_string);

        let table = self.table.load();
        let matched = match (&carrier, &phone.region) {
            (Some(carrier), Some(region)) => table.lookup(carrier, region),
            _ => None,
        };
        let policy = matched.unwrap_or(&self.fallback);
        debug!(
            carrier = carrier.as_deref().unwrap_or("unknown"),
            region = phone.region.as_deref().unwrap_or("unknown"),
            fallback = matched.is_none(),
            "compliance policy selected"
        );

        check_body(policy, body)?;
        Ok(ValidatedDestination {
            phone,
            carrier: matched.map(|p| p.carrier_name.clone()),
        })
    }
}

/// Apply one policy's content rules to a body.
pub fn check_body(policy: &CompliancePolicy, body: &str) -> Result<(), RejectReason> {
    if body.chars().count() > policy.max_message_length {
        return Err(RejectReason::MessageTooLong {
            max: policy.max_message_length,
        });
    }
    if !policy.supports_unicode && !body.is_ascii() {
        return Err(RejectReason::UnsupportedCharacters);
    }
    let lowered = body.to_lowercase();
    if let Some(keyword) = policy
        .restricted_keywords
        .iter()
        .find(|kw| !kw.is_empty() && lowered.contains(&kw.to_lowercase()))
    {
        return Err(RejectReason::RestrictedKeyword(keyword.clone()));
    }
    Ok(())
}
