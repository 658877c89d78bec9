// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite columns and the domain types in `beacon-core`.
//!
//! Timestamps are stored as fixed-width UTC strings
//! (`%Y-%m-%dT%H:%M:%S%.3fZ`) so lexical order matches time order.
//! Decimal amounts are stored as text to keep their exact scale.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use rust_decimal::Decimal;

pub use beacon_core::types::{
    CompliancePolicy, NotificationKind, NotificationMetadata, NotificationRecord,
    NotificationStatus,
};
use beacon_core::types::{NotificationId, UserId};

/// Column list matching [`notification_from_row`].
pub(crate) const NOTIFICATION_COLUMNS: &str = "id, user_id, phone_number, body, kind, status, \
     provider_message_id, attempt, created_at, sent_at, delivered_at, error_detail, \
     nft_id, auction_id, bid_amount, transaction_hash";

/// Format a timestamp for storage.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn conversion_error(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_timestamp(idx: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    parse_timestamp(idx, &text)
}

fn optional_timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| parse_timestamp(idx, &t)).transpose()
}

pub(crate) fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse::<T>().map_err(|e| conversion_error(idx, e))
}

/// Decode one `sms_notifications` row selected with [`NOTIFICATION_COLUMNS`].
pub fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<NotificationRecord> {
    let bid_amount: Option<String> = row.get(14)?;
    let bid_amount = bid_amount
        .map(|text| Decimal::from_str(&text).map_err(|e| conversion_error(14, e)))
        .transpose()?;
    let attempt: i64 = row.get(7)?;

    Ok(NotificationRecord {
        id: NotificationId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        phone_number: row.get(2)?,
        body: row.get(3)?,
        kind: parse_column::<NotificationKind>(row, 4)?,
        status: parse_column::<NotificationStatus>(row, 5)?,
        provider_message_id: row.get(6)?,
        attempt: u32::try_from(attempt).map_err(|e| conversion_error(7, e))?,
        created_at: timestamp_at(row, 8)?,
        sent_at: optional_timestamp_at(row, 9)?,
        delivered_at: optional_timestamp_at(row, 10)?,
        error_detail: row.get(11)?,
        metadata: NotificationMetadata {
            nft_id: row.get(12)?,
            auction_id: row.get(13)?,
            bid_amount,
            transaction_hash: row.get(15)?,
        },
    })
}

/// Column list matching [`policy_from_row`].
pub(crate) const POLICY_COLUMNS: &str = "carrier_name, country_code, max_message_length, \
     supports_unicode, restricted_keywords, opt_out_required";

/// Decode one `carrier_compliance` row selected with [`POLICY_COLUMNS`].
pub fn policy_from_row(row: &Row<'_>) -> rusqlite::Result<CompliancePolicy> {
    let max_len: i64 = row.get(2)?;
    let keywords: String = row.get(4)?;
    Ok(CompliancePolicy {
        carrier_name: row.get(0)?,
        country_code: row.get(1)?,
        max_message_length: usize::try_from(max_len).map_err(|e| conversion_error(2, e))?,
        supports_unicode: row.get(3)?,
        restricted_keywords: serde_json::from_str(&keywords).map_err(|e| conversion_error(4, e))?,
        opt_out_required: row.get(5)?,
    })
}
