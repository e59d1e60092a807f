use crate::record::RequestStatus;

/// All errors that can be returned by a RequestLedger implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No record with the given request id.
    #[error("request not found: {request_id}")]
    NotFound { request_id: String },

    /// A record with this request id already exists.
    #[error("request already exists: {request_id}")]
    AlreadyExists { request_id: String },

    /// The requested status change would move a record backwards
    /// (e.g. Succeeded -> Failed).
    #[error("illegal status transition for {request_id}: {from} -> {to}")]
    IllegalTransition {
        request_id: String,
        from: RequestStatus,
        to: RequestStatus,
    },

    /// A stored status code is outside the known set.
    #[error("invalid status code {code} stored for {request_id}")]
    InvalidStatus { request_id: String, code: i64 },

    /// A backend-specific storage error (DB connection, I/O, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "sqlite")]
impl From<libsql::Error> for StorageError {
    fn from(e: libsql::Error) -> Self {
        StorageError::Backend(e.to_string())
    }
}
