// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent rate-limit counters.
//!
//! Each key holds a count and an absolute expiry (unix seconds). The
//! increment is a single upsert statement, so callers sharing the database
//! never observe the same post-increment value.

use beacon_core::BeaconError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Increment `key` and return the new count.
///
/// An absent or expired key restarts at 1 with expiry `now + ttl_secs`.
/// Other expired keys are purged in the same transaction.
pub async fn increment_and_get(
    db: &Database,
    key: &str,
    ttl_secs: i64,
    now: i64,
) -> Result<u64, BeaconError> {
    let key = key.to_string();
    let count: i64 = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM rate_limit_counters WHERE expires_at <= ?1 AND key != ?2",
                params![now, key],
            )?;
            let count = tx.query_row(
                "INSERT INTO rate_limit_counters (key, count, expires_at)
                 VALUES (?1, 1, ?2)
                 ON CONFLICT (key) DO UPDATE SET
                    count = CASE WHEN expires_at <= ?3 THEN 1 ELSE count + 1 END,
                    expires_at = CASE WHEN expires_at <= ?3 THEN ?2 ELSE expires_at END
                 RETURNING count",
                params![key, now + ttl_secs, now],
                |row| row.get(0),
            )?;
            tx.commit()?;
            Ok(count)
        })
        .await
        .map_err(map_tr_err)?;
    u64::try_from(count).map_err(BeaconError::storage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn counts_up_within_ttl() {
        let (db, _dir) = setup_db().await;
        for expected in 1..=3 {
            let count = increment_and_get(&db, "k", 3600, 1_000).await.unwrap();
            assert_eq!(count, expected);
        }
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn expired_key_restarts_at_one() {
        let (db, _dir) = setup_db().await;
        increment_and_get(&db, "k", 60, 1_000).await.unwrap();
        increment_and_get(&db, "k", 60, 1_010).await.unwrap();
        let count = increment_and_get(&db, "k", 60, 1_060).await.unwrap();
        assert_eq!(count, 1);
        let count = increment_and_get(&db, "k", 60, 1_070).await.unwrap();
        assert_eq!(count, 2, "expiry moved forward with the restart");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn keys_are_independent_and_expired_keys_purged() {
        let (db, _dir) = setup_db().await;
        increment_and_get(&db, "a", 10, 0).await.unwrap();
        assert_eq!(increment_and_get(&db, "b", 10, 5).await.unwrap(), 1);
        increment_and_get(&db, "b", 10, 20).await.unwrap();

        let remaining: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM rate_limit_counters WHERE key = 'a'",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(remaining, 0);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_increments_never_repeat_a_count() {
        let (db, _dir) = setup_db().await;
        let mut handles = Vec::new();
        for _ in 0..20 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                increment_and_get(&db, "hot", 3600, 0).await.unwrap()
            }));
        }
        let mut counts = Vec::new();
        for h in handles {
            counts.push(h.await.unwrap());
        }
        counts.sort_unstable();
        assert_eq!(counts, (1..=20).collect::<Vec<u64>>());
        db.close().await.unwrap();
    }
}
