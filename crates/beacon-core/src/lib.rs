// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Beacon SMS dispatcher.
//!
//! Foundational trait definitions, error types, and domain types used
//! throughout the Beacon workspace. Storage and provider backends implement
//! the traits defined here.

pub mod error;
pub mod redact;
pub mod traits;
pub mod types;

pub use error::BeaconError;
pub use redact::mask_phone;
pub use types::{
    AdapterType, CallbackOutcome, CompliancePolicy, DispatchOutcome, HealthStatus,
    NotificationFilter, NotificationId, NotificationKind, NotificationMetadata,
    NotificationParams, NotificationRecord, NotificationStats, NotificationStatus, OutboundSms,
    ProviderError, ProviderErrorKind, ProviderReceipt, RejectReason, UserId,
};

pub use traits::{
    CounterStore, NotificationStore, PluginAdapter, PolicyStore, SmsProvider, StorageAdapter,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beacon_error_has_all_variants() {
        let _config = BeaconError::Config("test".into());
        let _storage = BeaconError::storage(std::io::Error::other("test"));
        let _provider = BeaconError::Provider {
            message: "test".into(),
            source: None,
        };
        let _not_found = BeaconError::NotFound {
            entity: "notification".into(),
            id: "n1".into(),
        };
        let _timeout = BeaconError::Timeout {
            duration: std::time::Duration::from_secs(10),
        };
        let _internal = BeaconError::Internal("test".into());
    }

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        let variants = [
            AdapterType::Provider,
            AdapterType::Storage,
            AdapterType::CounterStore,
            AdapterType::Observability,
        ];
        for variant in &variants {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }

    #[test]
    fn not_found_display() {
        let err = BeaconError::NotFound {
            entity: "notification".into(),
            id: "abc".into(),
        };
        assert_eq!(err.to_string(), "notification not found: abc");
    }

    #[test]
    fn traits_are_object_safe() {
        fn _provider(_: &dyn SmsProvider) {}
        fn _store(_: &dyn NotificationStore) {}
        fn _policies(_: &dyn PolicyStore) {}
        fn _counter(_: &dyn CounterStore) {}
    }

    mod proptests {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn masked_phone_keeps_length_and_suffix(digits in "[0-9]{8,14}") {
                let phone = format!("+{digits}");
                let masked = mask_phone(&phone);
                prop_assert_eq!(masked.len(), phone.len());
                prop_assert!(masked.ends_with(&phone[phone.len() - 4..]));
                prop_assert!(masked.starts_with(&phone[..2]));
            }
        }
    }
}
