// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification record operations.

use beacon_core::types::{
    CallbackOutcome, NotificationFilter, NotificationId, NotificationKind, NotificationRecord,
    NotificationStats, NotificationStatus, UserId,
};
use beacon_core::BeaconError;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params, params_from_iter};

use crate::database::{Database, map_tr_err};
use crate::models::{NOTIFICATION_COLUMNS, format_timestamp, notification_from_row, parse_column};

/// Page size used when a filter carries no explicit limit.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Insert a new notification record.
pub async fn insert(db: &Database, record: &NotificationRecord) -> Result<(), BeaconError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sms_notifications (id, user_id, phone_number, body, kind, status,
                    provider_message_id, attempt, created_at, sent_at, delivered_at, error_detail,
                    nft_id, auction_id, bid_amount, transaction_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    record.id.0,
                    record.user_id.0,
                    record.phone_number,
                    record.body,
                    record.kind.to_string(),
                    record.status.to_string(),
                    record.provider_message_id,
                    i64::from(record.attempt),
                    format_timestamp(record.created_at),
                    record.sent_at.map(format_timestamp),
                    record.delivered_at.map(format_timestamp),
                    record.error_detail,
                    record.metadata.nft_id,
                    record.metadata.auction_id,
                    record.metadata.bid_amount.map(|d| d.to_string()),
                    record.metadata.transaction_hash,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Move a pending record to `sent`.
///
/// Fails with `NotFound` if no pending record has this id.
pub async fn mark_sent(
    db: &Database,
    id: &NotificationId,
    provider_message_id: &str,
    sent_at: DateTime<Utc>,
) -> Result<(), BeaconError> {
    let key = id.0.clone();
    let provider_message_id = provider_message_id.to_string();
    let updated = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE sms_notifications
                 SET status = 'sent', provider_message_id = ?2, sent_at = ?3
                 WHERE id = ?1 AND status = 'pending'",
                params![key, provider_message_id, format_timestamp(sent_at)],
            )
        })
        .await
        .map_err(map_tr_err)?;
    ensure_updated(updated, id)
}

/// Move a pending record to `failed` with an error detail.
pub async fn mark_failed(
    db: &Database,
    id: &NotificationId,
    error_detail: &str,
) -> Result<(), BeaconError> {
    let key = id.0.clone();
    let error_detail = error_detail.to_string();
    let updated = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE sms_notifications SET status = 'failed', error_detail = ?2
                 WHERE id = ?1 AND status = 'pending'",
                params![key, error_detail],
            )
        })
        .await
        .map_err(map_tr_err)?;
    ensure_updated(updated, id)
}

fn ensure_updated(updated: usize, id: &NotificationId) -> Result<(), BeaconError> {
    if updated == 0 {
        return Err(BeaconError::NotFound {
            entity: "pending notification".into(),
            id: id.0.clone(),
        });
    }
    Ok(())
}

/// Fetch a record by id.
pub async fn get(
    db: &Database,
    id: &NotificationId,
) -> Result<Option<NotificationRecord>, BeaconError> {
    let key = id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {NOTIFICATION_COLUMNS} FROM sms_notifications WHERE id = ?1"),
                params![key],
                notification_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a record by the provider's message id.
pub async fn find_by_provider_id(
    db: &Database,
    provider_message_id: &str,
) -> Result<Option<NotificationRecord>, BeaconError> {
    let key = provider_message_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {NOTIFICATION_COLUMNS} FROM sms_notifications
                     WHERE provider_message_id = ?1"
                ),
                params![key],
                notification_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a provider-reported status as one compare-and-set.
///
/// Reading the current status and writing the new one happen inside a single
/// immediate transaction on the writer thread, so concurrent duplicate
/// callbacks observe each other's effects. Records still awaiting
/// `mark_sent` have no provider id and are reported as missing.
pub async fn apply_provider_status(
    db: &Database,
    provider_message_id: &str,
    incoming: NotificationStatus,
    error_detail: Option<&str>,
    at: DateTime<Utc>,
) -> Result<Option<CallbackOutcome>, BeaconError> {
    let key = provider_message_id.to_string();
    let error_detail = error_detail.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
            let current = tx
                .query_row(
                    "SELECT status FROM sms_notifications WHERE provider_message_id = ?1",
                    params![key],
                    |row| parse_column::<NotificationStatus>(row, 0),
                )
                .optional()?;

            let Some(current) = current else {
                tx.commit()?;
                return Ok(None);
            };

            let outcome = if current == incoming {
                CallbackOutcome::Unchanged { status: current }
            } else if current.can_transition_to(incoming) {
                let delivered_at =
                    (incoming == NotificationStatus::Delivered).then(|| format_timestamp(at));
                tx.execute(
                    "UPDATE sms_notifications
                     SET status = ?2,
                         delivered_at = COALESCE(delivered_at, ?3),
                         error_detail = COALESCE(?4, error_detail)
                     WHERE provider_message_id = ?1",
                    params![key, incoming.to_string(), delivered_at, error_detail],
                )?;
                CallbackOutcome::Applied {
                    from: current,
                    to: incoming,
                }
            } else {
                CallbackOutcome::Regressive {
                    current,
                    incoming,
                }
            };
            tx.commit()?;
            Ok(Some(outcome))
        })
        .await
        .map_err(map_tr_err)
}

/// List records matching `filter`, newest first.
pub async fn list(
    db: &Database,
    filter: &NotificationFilter,
) -> Result<Vec<NotificationRecord>, BeaconError> {
    let mut clauses = Vec::new();
    let mut args: Vec<String> = Vec::new();
    if let Some(user) = &filter.user_id {
        args.push(user.0.clone());
        clauses.push(format!("user_id = ?{}", args.len()));
    }
    if let Some(kind) = filter.kind {
        args.push(kind.to_string());
        clauses.push(format!("kind = ?{}", args.len()));
    }
    if let Some(status) = filter.status {
        args.push(status.to_string());
        clauses.push(format!("status = ?{}", args.len()));
    }
    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let limit = filter.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = filter.offset.unwrap_or(0);
    let sql = format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM sms_notifications {where_clause}
         ORDER BY created_at DESC, id DESC LIMIT {limit} OFFSET {offset}"
    );

    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(args.iter()), notification_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Count a user's records created at or after `since`, by status and kind.
pub async fn stats(
    db: &Database,
    user_id: &UserId,
    since: DateTime<Utc>,
) -> Result<NotificationStats, BeaconError> {
    let user = user_id.0.clone();
    let since = format_timestamp(since);
    let groups = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT status, kind, COUNT(*) FROM sms_notifications
                 WHERE user_id = ?1 AND created_at >= ?2
                 GROUP BY status, kind",
            )?;
            let rows = stmt.query_map(params![user, since], |row| {
                let status = parse_column::<NotificationStatus>(row, 0)?;
                let kind = parse_column::<NotificationKind>(row, 1)?;
                let count: i64 = row.get(2)?;
                Ok((status, kind, count))
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)?;

    let mut stats = NotificationStats::empty();
    for (status, kind, count) in groups {
        stats.add(status, kind, u64::try_from(count).unwrap_or(0));
    }
    Ok(stats)
}
