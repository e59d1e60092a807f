//! libSQL backend for the request ledger.
//!
//! One table, keyed by request id:
//!
//! ```sql
//! CREATE TABLE requests (request_id TEXT PRIMARY KEY, status INTEGER NOT NULL)
//! ```
//!
//! Every ledger method is a single SQL statement, so SQLite's own
//! statement-level atomicity gives the per-id guarantees the trait requires.
//! Status-transition rules are folded into the `UPDATE ... WHERE` clause.

use std::path::Path;

use async_trait::async_trait;
use libsql::{Connection, Database};

use crate::error::StorageError;
use crate::record::RequestStatus;
use crate::traits::RequestLedger;

const SCHEMA: &str = "\
    CREATE TABLE IF NOT EXISTS requests (
        request_id TEXT PRIMARY KEY,
        status INTEGER NOT NULL
    );";

const ALL_STATUSES: [RequestStatus; 3] = [
    RequestStatus::Pending,
    RequestStatus::Succeeded,
    RequestStatus::Failed,
];

/// Durable ledger stored in a SQLite-compatible file.
pub struct SqliteLedger {
    // Keeps the database alive for the lifetime of the connection.
    _db: Database,
    conn: Connection,
}

impl SqliteLedger {
    /// Open (or create) a ledger file, creating the parent directory and
    /// the `requests` table if needed.
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StorageError::Backend(format!(
                        "failed to create ledger directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StorageError::Backend(format!("failed to open ledger: {}", e)))?;
        let ledger = Self::from_database(db).await?;

        // WAL lets status readers proceed while an invocation is writing.
        ledger.conn.query("PRAGMA journal_mode=WAL", ()).await?;
        tracing::debug!(path = %path.display(), "opened sqlite ledger");
        Ok(ledger)
    }

    /// Open a private in-memory ledger (tests).
    pub async fn open_in_memory() -> Result<Self, StorageError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StorageError::Backend(format!("failed to open ledger: {}", e)))?;
        Self::from_database(db).await
    }

    async fn from_database(db: Database) -> Result<Self, StorageError> {
        let conn = db
            .connect()
            .map_err(|e| StorageError::Backend(format!("failed to connect: {}", e)))?;
        conn.query("PRAGMA busy_timeout = 5000", ()).await?;
        conn.execute_batch(SCHEMA).await?;
        Ok(Self { _db: db, conn })
    }

    async fn read_code(&self, request_id: &str) -> Result<Option<i64>, StorageError> {
        let mut rows = self
            .conn
            .query(
                "SELECT status FROM requests WHERE request_id = ?1",
                libsql::params![request_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<i64>(0)?)),
            None => Ok(None),
        }
    }
}

/// The comma-separated status codes a record may move to `target` from.
fn allowed_source_codes(target: RequestStatus) -> String {
    ALL_STATUSES
        .iter()
        .filter(|from| from.can_transition_to(target))
        .map(|from| from.code().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn decode_status(request_id: &str, code: i64) -> Result<RequestStatus, StorageError> {
    RequestStatus::from_code(code).ok_or_else(|| StorageError::InvalidStatus {
        request_id: request_id.to_string(),
        code,
    })
}

#[async_trait]
impl RequestLedger for SqliteLedger {
    async fn exists(&self, request_id: &str) -> Result<bool, StorageError> {
        Ok(self.read_code(request_id).await?.is_some())
    }

    async fn insert(&self, request_id: &str, status: RequestStatus) -> Result<(), StorageError> {
        if self.insert_if_absent(request_id, status).await? {
            Ok(())
        } else {
            Err(StorageError::AlreadyExists {
                request_id: request_id.to_string(),
            })
        }
    }

    async fn insert_if_absent(
        &self,
        request_id: &str,
        status: RequestStatus,
    ) -> Result<bool, StorageError> {
        let inserted = self
            .conn
            .execute(
                "INSERT INTO requests (request_id, status) VALUES (?1, ?2) \
                 ON CONFLICT(request_id) DO NOTHING",
                libsql::params![request_id, status.code()],
            )
            .await?;
        if inserted > 0 {
            tracing::debug!(request_id, status = %status, "inserted request record");
        }
        Ok(inserted > 0)
    }

    async fn set_status(
        &self,
        request_id: &str,
        status: RequestStatus,
    ) -> Result<(), StorageError> {
        let sql = format!(
            "UPDATE requests SET status = ?1 WHERE request_id = ?2 AND status IN ({})",
            allowed_source_codes(status)
        );
        let updated = self
            .conn
            .execute(&sql, libsql::params![status.code(), request_id])
            .await?;
        if updated > 0 {
            tracing::debug!(request_id, status = %status, "updated request status");
            return Ok(());
        }

        // Nothing matched: either the row is missing or the move is backwards.
        match self.read_code(request_id).await? {
            None => Err(StorageError::NotFound {
                request_id: request_id.to_string(),
            }),
            Some(code) => Err(StorageError::IllegalTransition {
                request_id: request_id.to_string(),
                from: decode_status(request_id, code)?,
                to: status,
            }),
        }
    }

    async fn get_status(&self, request_id: &str) -> Result<RequestStatus, StorageError> {
        match self.read_code(request_id).await? {
            Some(code) => decode_status(request_id, code),
            None => Err(StorageError::NotFound {
                request_id: request_id.to_string(),
            }),
        }
    }
}
