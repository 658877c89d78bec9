// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phone number normalisation and carrier resolution.

use beacon_config::model::CarrierPrefixConfig;
use phonenumber::Mode;

/// A destination number that parsed and validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneInfo {
    /// `+<country code><national number>`.
    pub e164: String,
    /// ISO 3166-1 alpha-2 region, when the number maps to exactly one.
    pub region: Option<String>,
    pub country_code: u16,
}

impl PhoneInfo {
    /// E.164 digits without the leading `+`.
    pub fn digits(&self) -> &str {
        self.e164.trim_start_matches('+')
    }
}

/// Parse an international number. Returns `None` for anything that is not a
/// valid, dialable number; national-format input without `+` is rejected.
pub fn parse_phone(raw: &str) -> Option<PhoneInfo> {
    let number = phonenumber::parse(None, raw.trim()).ok()?;
    if !phonenumber::is_valid(&number) {
        return None;
    }
    let region = number.country().id().map(|id| format!("{id:?}"));
    Some(PhoneInfo {
        e164: number.format().mode(Mode::E164).to_string(),
        region,
        country_code: number.country().code(),
    })
}

#[derive(Debug, Clone)]
struct PrefixEntry {
    prefix: String,
    country: String,
    carrier: String,
}

/// Longest-prefix table from E.164 digits to carrier name.
#[derive(Debug, Clone, Default)]
pub struct CarrierDirectory {
    entries: Vec<PrefixEntry>,
}

impl CarrierDirectory {
    pub fn new(entries: &[CarrierPrefixConfig]) -> Self {
        let mut entries: Vec<PrefixEntry> = entries
            .iter()
            .map(|e| PrefixEntry {
                prefix: e.prefix.clone(),
                country: e.country.to_ascii_uppercase(),
                carrier: e.carrier.clone(),
            })
            .collect();
        entries.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Self { entries }
    }

    /// Carrier for `phone`, if a prefix for its region matches.
    pub fn resolve(&self, phone: &PhoneInfo) -> Option<&str> {
        let region = phone.region.as_deref()?;
        self.entries
            .iter()
            .find(|e| e.country == region && phone.digits().starts_with(&e.prefix))
            .map(|e| e.carrier.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(country: &str, prefix: &str, carrier: &str) -> CarrierPrefixConfig {
        CarrierPrefixConfig {
            country: country.into(),
            prefix: prefix.into(),
            carrier: carrier.into(),
        }
    }

    #[test]
    fn parses_international_numbers() {
        let us = parse_phone("+1 201-555-0123").expect("valid US number");
        assert_eq!(us.e164, "+12015550123");
        assert_eq!(us.region.as_deref(), Some("US"));
        assert_eq!(us.country_code, 1);

        let gb = parse_phone("+447400123456").expect("valid GB number");
        assert_eq!(gb.region.as_deref(), Some("GB"));
    }

    #[test]
    fn rejects_garbage_and_invalid_numbers() {
        assert!(parse_phone("not-a-number").is_none());
        assert!(parse_phone("").is_none());
        assert!(parse_phone("+1 000 000 0000").is_none());
        assert!(parse_phone("12345").is_none());
    }

    #[test]
    fn longest_prefix_wins() {
        let directory = CarrierDirectory::new(&[
            entry("US", "1201", "Verizon"),
            entry("US", "120155", "AT&T"),
        ]);
        let phone = parse_phone("+12015550123").unwrap();
        assert_eq!(directory.resolve(&phone), Some("AT&T"));

        let other = parse_phone("+12017771234").unwrap();
        assert_eq!(directory.resolve(&other), Some("Verizon"));
    }

    #[test]
    fn prefix_must_match_region() {
        let directory = CarrierDirectory::new(&[entry("GB", "1", "Vodafone")]);
        let phone = parse_phone("+12015550123").unwrap();
        assert_eq!(directory.resolve(&phone), None);
    }
}
