// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Carrier compliance policy operations.

use beacon_core::BeaconError;
use beacon_core::types::CompliancePolicy;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::{POLICY_COLUMNS, policy_from_row};

/// Load every stored policy, ordered by country then carrier.
pub async fn load_all(db: &Database) -> Result<Vec<CompliancePolicy>, BeaconError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {POLICY_COLUMNS} FROM carrier_compliance
                 ORDER BY country_code, carrier_name"
            ))?;
            let rows = stmt.query_map([], policy_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace the policy for its `(carrier_name, country_code)` pair.
pub async fn upsert(db: &Database, policy: &CompliancePolicy) -> Result<(), BeaconError> {
    let keywords = serde_json::to_string(&policy.restricted_keywords).map_err(BeaconError::storage)?;
    let policy = policy.clone();
    let max_len = i64::try_from(policy.max_message_length).map_err(BeaconError::storage)?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO carrier_compliance
                    (carrier_name, country_code, max_message_length, supports_unicode,
                     restricted_keywords, opt_out_required)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (carrier_name, country_code) DO UPDATE SET
                    max_message_length = excluded.max_message_length,
                    supports_unicode = excluded.supports_unicode,
                    restricted_keywords = excluded.restricted_keywords,
                    opt_out_required = excluded.opt_out_required,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![
                    policy.carrier_name,
                    policy.country_code,
                    max_len,
                    policy.supports_unicode,
                    keywords,
                    policy.opt_out_required,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
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
    async fn seeded_policies_are_loaded() {
        let (db, _dir) = setup_db().await;
        let policies = load_all(&db).await.unwrap();
        assert_eq!(policies.len(), 6);

        let verizon = policies
            .iter()
            .find(|p| p.carrier_name == "Verizon")
            .expect("Verizon seeded");
        assert_eq!(verizon.country_code, "US");
        assert_eq!(verizon.max_message_length, 160);
        assert!(verizon.supports_unicode);
        assert!(verizon.opt_out_required);
        assert_eq!(
            verizon.restricted_keywords,
            vec!["STOP", "CANCEL", "UNSUBSCRIBE"]
        );

        let o2 = policies.iter().find(|p| p.carrier_name == "O2").unwrap();
        assert_eq!(o2.country_code, "GB");
        assert_eq!(o2.restricted_keywords, vec!["STOP"]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn upsert_replaces_existing_pair() {
        let (db, _dir) = setup_db().await;
        let mut policy = load_all(&db)
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.carrier_name == "Sprint")
            .unwrap();
        policy.max_message_length = 70;
        policy.restricted_keywords.push("QUIT".into());
        upsert(&db, &policy).await.unwrap();

        let policies = load_all(&db).await.unwrap();
        assert_eq!(policies.len(), 6);
        let sprint = policies.iter().find(|p| p.carrier_name == "Sprint").unwrap();
        assert_eq!(sprint.max_message_length, 70);
        assert!(sprint.restricted_keywords.contains(&"QUIT".to_string()));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn upsert_inserts_new_pair() {
        let (db, _dir) = setup_db().await;
        let policy = CompliancePolicy {
            carrier_name: "Rogers".into(),
            country_code: "CA".into(),
            max_message_length: 140,
            supports_unicode: false,
            restricted_keywords: vec!["ARRET".into()],
            opt_out_required: true,
        };
        upsert(&db, &policy).await.unwrap();
        let policies = load_all(&db).await.unwrap();
        assert_eq!(policies.len(), 7);
        assert_eq!(policies[0], policy, "CA sorts first");
        db.close().await.unwrap();
    }
}
