// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the dispatcher, storage, provider, and gateway crates.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a notification record (UUID v4, never reused).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub String);

impl NotificationId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to the marketplace user who owns a notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role of an adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Storage,
    CounterStore,
    Observability,
}

/// The kind of SMS notification being sent.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BidAlert,
    AuctionAlert,
    TwoFactorAuth,
    TransactionConfirmation,
}

impl NotificationKind {
    /// Every kind, in declaration order.
    pub const ALL: [NotificationKind; 4] = [
        NotificationKind::BidAlert,
        NotificationKind::AuctionAlert,
        NotificationKind::TwoFactorAuth,
        NotificationKind::TransactionConfirmation,
    ];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            NotificationKind::BidAlert => "Bid Alert",
            NotificationKind::AuctionAlert => "Auction Alert",
            NotificationKind::TwoFactorAuth => "Two Factor Authentication",
            NotificationKind::TransactionConfirmation => "Transaction Confirmation",
        }
    }

    /// Urgent kinds are retried on the short backoff schedule.
    pub fn is_urgent(&self) -> bool {
        matches!(self, NotificationKind::TwoFactorAuth)
    }
}

/// Delivery status of a notification record.
///
/// ```text
/// pending -> sent -> delivered
/// pending -> failed
/// sent    -> failed | undelivered
/// ```
///
/// `pending` is the only initial state; `delivered`, `failed` and
/// `undelivered` are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Delivered,
    Failed,
    Undelivered,
}

impl NotificationStatus {
    pub const ALL: [NotificationStatus; 5] = [
        NotificationStatus::Pending,
        NotificationStatus::Sent,
        NotificationStatus::Delivered,
        NotificationStatus::Failed,
        NotificationStatus::Undelivered,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NotificationStatus::Delivered
                | NotificationStatus::Failed
                | NotificationStatus::Undelivered
        )
    }

    /// Whether `next` is a forward edge of the state machine from `self`.
    pub fn can_transition_to(&self, next: NotificationStatus) -> bool {
        use NotificationStatus::*;
        matches!(
            (self, next),
            (Pending, Sent)
                | (Pending, Failed)
                | (Sent, Delivered)
                | (Sent, Failed)
                | (Sent, Undelivered)
        )
    }

    /// Normalise a provider status string to the internal status.
    ///
    /// Intermediate provider states (queued, sending, ...) collapse onto
    /// `sent`. Returns `None` for strings the provider contract does not
    /// define.
    pub fn from_provider(text: &str) -> Option<NotificationStatus> {
        match text.trim().to_ascii_lowercase().as_str() {
            "queued" | "accepted" | "scheduled" | "sending" | "sent" => {
                Some(NotificationStatus::Sent)
            }
            "delivered" | "read" => Some(NotificationStatus::Delivered),
            "undelivered" => Some(NotificationStatus::Undelivered),
            "failed" | "canceled" => Some(NotificationStatus::Failed),
            _ => None,
        }
    }
}

/// Kind-specific notification parameters.
///
/// Each variant carries exactly the values its template needs plus the
/// domain references persisted alongside the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationParams {
    BidAlert {
        nft_name: String,
        bid_amount: Decimal,
        bidder: String,
        nft_id: String,
        auction_id: String,
    },
    AuctionAlert {
        nft_name: String,
        time_remaining: String,
        current_bid: Decimal,
        nft_id: String,
        auction_id: String,
    },
    TwoFactorAuth {
        code: String,
    },
    TransactionConfirmation {
        transaction_type: String,
        nft_name: String,
        amount: Decimal,
        tx_hash: String,
        nft_id: String,
    },
}

impl NotificationParams {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationParams::BidAlert { .. } => NotificationKind::BidAlert,
            NotificationParams::AuctionAlert { .. } => NotificationKind::AuctionAlert,
            NotificationParams::TwoFactorAuth { .. } => NotificationKind::TwoFactorAuth,
            NotificationParams::TransactionConfirmation { .. } => {
                NotificationKind::TransactionConfirmation
            }
        }
    }

    /// Domain references stored on the notification record.
    pub fn metadata(&self) -> NotificationMetadata {
        match self {
            NotificationParams::BidAlert {
                bid_amount,
                nft_id,
                auction_id,
                ..
            } => NotificationMetadata {
                nft_id: Some(nft_id.clone()),
                auction_id: Some(auction_id.clone()),
                bid_amount: Some(*bid_amount),
                transaction_hash: None,
            },
            NotificationParams::AuctionAlert {
                current_bid,
                nft_id,
                auction_id,
                ..
            } => NotificationMetadata {
                nft_id: Some(nft_id.clone()),
                auction_id: Some(auction_id.clone()),
                bid_amount: Some(*current_bid),
                transaction_hash: None,
            },
            NotificationParams::TwoFactorAuth { .. } => NotificationMetadata::default(),
            NotificationParams::TransactionConfirmation {
                amount,
                tx_hash,
                nft_id,
                ..
            } => NotificationMetadata {
                nft_id: Some(nft_id.clone()),
                auction_id: None,
                bid_amount: Some(*amount),
                transaction_hash: Some(tx_hash.clone()),
            },
        }
    }
}

/// Optional marketplace references attached to a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationMetadata {
    pub nft_id: Option<String>,
    pub auction_id: Option<String>,
    pub bid_amount: Option<Decimal>,
    pub transaction_hash: Option<String>,
}

/// One SMS send attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub user_id: UserId,
    /// Destination in E.164 form.
    pub phone_number: String,
    pub body: String,
    pub kind: NotificationKind,
    pub status: NotificationStatus,
    /// Set iff the provider accepted the send.
    pub provider_message_id: Option<String>,
    /// 1-based attempt number within a retry job.
    pub attempt: u32,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub error_detail: Option<String>,
    pub metadata: NotificationMetadata,
}

impl NotificationRecord {
    /// Build a new record in the `pending` state.
    pub fn pending(
        user_id: UserId,
        phone_number: String,
        body: String,
        kind: NotificationKind,
        metadata: NotificationMetadata,
        attempt: u32,
    ) -> Self {
        Self {
            id: NotificationId::generate(),
            user_id,
            phone_number,
            body,
            kind,
            status: NotificationStatus::Pending,
            provider_message_id: None,
            attempt,
            created_at: Utc::now(),
            sent_at: None,
            delivered_at: None,
            error_detail: None,
            metadata,
        }
    }
}

/// Carrier/country-specific content constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompliancePolicy {
    pub carrier_name: String,
    /// ISO 3166-1 alpha-2 region code.
    pub country_code: String,
    pub max_message_length: usize,
    pub supports_unicode: bool,
    /// Matched case-insensitively as substrings of the body.
    pub restricted_keywords: Vec<String>,
    pub opt_out_required: bool,
}

impl CompliancePolicy {
    /// The conservative fallback applied when no carrier policy matches.
    pub fn fallback(max_message_length: usize, supports_unicode: bool) -> Self {
        Self {
            carrier_name: String::new(),
            country_code: String::new(),
            max_message_length,
            supports_unicode,
            restricted_keywords: Vec::new(),
            opt_out_required: false,
        }
    }
}

/// Why a send was refused before any record was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum RejectReason {
    RateLimited,
    InvalidNumber,
    MessageTooLong { max: usize },
    RestrictedKeyword(String),
    UnsupportedCharacters,
}

impl RejectReason {
    /// Short label suitable for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RejectReason::RateLimited => "rate_limited",
            RejectReason::InvalidNumber => "invalid_number",
            RejectReason::MessageTooLong { .. } => "message_too_long",
            RejectReason::RestrictedKeyword(_) => "restricted_keyword",
            RejectReason::UnsupportedCharacters => "unsupported_characters",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::RestrictedKeyword(keyword) => write!(f, "restricted_keyword:{keyword}"),
            other => f.write_str(other.label()),
        }
    }
}

/// Classification of a provider-side failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// No response within the bounded timeout.
    Timeout,
    /// Connection or transport failure.
    Network,
    /// 5xx from the provider.
    Server(u16),
    /// 429 from the provider.
    RateLimited,
    /// Any other 4xx from the provider.
    Client(u16),
    /// The provider reported the destination as unreachable or invalid.
    InvalidDestination,
}

/// A failed provider send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    /// Provider-specific error code, if reported.
    pub code: Option<String>,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Transient failures are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            ProviderErrorKind::Timeout
                | ProviderErrorKind::Network
                | ProviderErrorKind::Server(_)
                | ProviderErrorKind::RateLimited
        )
    }

    /// Text stored in a record's error detail.
    pub fn detail(&self) -> String {
        match &self.code {
            Some(code) => format!("[{code}] {}", self.message),
            None => self.message.clone(),
        }
    }
}

/// A message handed to the SMS provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundSms {
    pub from: String,
    pub to: String,
    pub body: String,
    pub status_callback_url: Option<String>,
}

/// The provider's acknowledgement of an accepted send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReceipt {
    pub provider_message_id: String,
    /// Provider-reported status at acceptance time, if any.
    pub status: Option<String>,
}

/// Result of a single dispatch call.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The provider accepted the message; the record is `sent`.
    Sent(NotificationRecord),
    /// Refused before a record was created.
    Rejected(RejectReason),
    /// A record was created and the provider call failed; the record is `failed`.
    Failed {
        record: NotificationRecord,
        error: ProviderError,
    },
}

impl DispatchOutcome {
    pub fn record(&self) -> Option<&NotificationRecord> {
        match self {
            DispatchOutcome::Sent(record) | DispatchOutcome::Failed { record, .. } => Some(record),
            DispatchOutcome::Rejected(_) => None,
        }
    }

    /// Whether a retry layer should schedule another attempt.
    pub fn is_transient_failure(&self) -> bool {
        matches!(self, DispatchOutcome::Failed { error, .. } if error.is_transient())
    }

    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Sent(_) => "sent",
            DispatchOutcome::Rejected(_) => "rejected",
            DispatchOutcome::Failed { .. } => "failed",
        }
    }
}

/// Effect of applying a provider status callback to a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallbackOutcome {
    /// The record moved along a forward edge.
    Applied {
        from: NotificationStatus,
        to: NotificationStatus,
    },
    /// The record already had the incoming status.
    Unchanged { status: NotificationStatus },
    /// The incoming status would move the record backwards; ignored.
    Regressive {
        current: NotificationStatus,
        incoming: NotificationStatus,
    },
}

/// Query filter for listing notification records.
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub user_id: Option<UserId>,
    pub kind: Option<NotificationKind>,
    pub status: Option<NotificationStatus>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Aggregate counts over a user's records in a time window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStats {
    pub total: u64,
    pub pending: u64,
    pub sent: u64,
    pub delivered: u64,
    pub failed: u64,
    pub undelivered: u64,
    /// Counts keyed by kind code; every kind is present.
    pub by_kind: BTreeMap<NotificationKind, u64>,
}

impl NotificationStats {
    /// Add `count` records of the given status and kind.
    pub fn add(&mut self, status: NotificationStatus, kind: NotificationKind, count: u64) {
        self.total += count;
        match status {
            NotificationStatus::Pending => self.pending += count,
            NotificationStatus::Sent => self.sent += count,
            NotificationStatus::Delivered => self.delivered += count,
            NotificationStatus::Failed => self.failed += count,
            NotificationStatus::Undelivered => self.undelivered += count,
        }
        *self.by_kind.entry(kind).or_insert(0) += count;
    }

    /// Stats with every kind present at zero.
    pub fn empty() -> Self {
        Self {
            by_kind: NotificationKind::ALL.iter().map(|k| (*k, 0)).collect(),
            ..Self::default()
        }
    }
}
