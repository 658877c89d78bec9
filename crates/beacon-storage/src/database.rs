// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use beacon_core::BeaconError;
use tracing::debug;

use crate::migrations::run_migrations;

/// Handle to the Beacon SQLite database.
///
/// Cloning is cheap: every clone shares the same background writer thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` in WAL mode and apply
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, BeaconError> {
        Self::open_with(path, true).await
    }

    /// Open the database, choosing the journal mode explicitly.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, BeaconError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(BeaconError::storage)?;
        }

        // Migrations run on a short-lived blocking connection before the
        // shared writer is opened.
        let migrate_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), BeaconError> {
            let mut conn =
                rusqlite::Connection::open(&migrate_path).map_err(BeaconError::storage)?;
            apply_journal_mode(&conn, wal_mode).map_err(BeaconError::storage)?;
            run_migrations(&mut conn)
        })
        .await
        .map_err(|e| BeaconError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(BeaconError::storage)?;
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA synchronous = NORMAL;",
            )
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The shared tokio-rusqlite connection. All queries go through `call()`.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), BeaconError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoint and close the connection.
    pub async fn close(self) -> Result<(), BeaconError> {
        self.checkpoint().await?;
        self.conn.close().await.map_err(map_tr_err)
    }
}

fn apply_journal_mode(conn: &rusqlite::Connection, wal_mode: bool) -> rusqlite::Result<()> {
    let mode = if wal_mode { "WAL" } else { "DELETE" };
    // journal_mode returns the resulting mode as a row.
    conn.query_row(&format!("PRAGMA journal_mode = {mode};"), [], |_| Ok(()))
}

/// Convert a tokio-rusqlite error into `BeaconError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> BeaconError {
    BeaconError::storage(e)
}
