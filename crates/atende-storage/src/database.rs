// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use std::path::Path;

use tokio_rusqlite::Connection;
use tracing::debug;

use atende_core::AtendeError;

use crate::migrations;

/// Handle to the single SQLite connection.
///
/// Opening runs PRAGMA setup and all pending migrations. Cloning the inner
/// [`Connection`] is cheap; every clone talks to the same background thread.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run
    /// embedded migrations.
    pub async fn open(path: &str) -> Result<Self, AtendeError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| AtendeError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| map_tr_err(e.into()))?;

        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok(migrations::run_migrations(conn))
        })
        .await
        .map_err(map_tr_err)?
        .map_err(|e| AtendeError::Storage {
            source: Box::new(e),
        })?;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// Returns the underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(&self) -> Result<(), AtendeError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into the crate error type.
pub fn map_tr_err(err: tokio_rusqlite::Error) -> AtendeError {
    AtendeError::Storage {
        source: Box::new(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_runs_migrations() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("open_test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        assert!(db_path.exists());

        // All core tables exist after migration.
        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, tokio_rusqlite::Error> {
                let n = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                     AND name IN ('contacts', 'departments', 'agents',
                                  'conversations', 'messages', 'transfers')",
                    [],
                    |row| row.get(0),
                )?;
                Ok(n)
            })
            .await
            .unwrap();
        assert_eq!(count, 6);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("deeper").join("atende.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        assert!(db_path.exists());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen.db");

        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
        drop(db);

        // Migrations already applied; second open must not fail.
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
    }

    #[test]
    fn now_iso8601_matches_schema_format() {
        let ts = atende_core::now_iso8601();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2026-01-01T00:00:00.000Z".len());
    }
}
