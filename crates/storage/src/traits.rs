use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::RequestStatus;

/// The storage trait for the request ledger.
///
/// A `RequestLedger` maps request ids to execution status. It is the single
/// source of truth for "has this operation already been attempted".
///
/// ## Atomicity
///
/// Every method is atomic with respect to concurrent callers using the same
/// `request_id`. In particular [`insert_if_absent`](Self::insert_if_absent)
/// is a single read-check-write step: when N callers race on a new id,
/// exactly one of them observes `true`.
///
/// ## Monotonicity
///
/// `set_status` rejects transitions that move a record backwards (see
/// [`RequestStatus::can_transition_to`]) with
/// `Err(StorageError::IllegalTransition { .. })`.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be used in axum
/// application state and across async task boundaries.
#[async_trait]
pub trait RequestLedger: Send + Sync + 'static {
    /// True iff a record with this id has ever been inserted.
    async fn exists(&self, request_id: &str) -> Result<bool, StorageError>;

    /// Create a new record.
    ///
    /// Returns `Err(StorageError::AlreadyExists)` if the id is taken.
    async fn insert(&self, request_id: &str, status: RequestStatus) -> Result<(), StorageError>;

    /// Create a record unless one already exists.
    ///
    /// Returns `true` if this call created the record, `false` if it was
    /// already present (its status is left untouched).
    async fn insert_if_absent(
        &self,
        request_id: &str,
        status: RequestStatus,
    ) -> Result<bool, StorageError>;

    /// Overwrite the status of an existing record.
    ///
    /// Returns `Err(StorageError::NotFound)` if no such record exists and
    /// `Err(StorageError::IllegalTransition)` for a backwards move.
    async fn set_status(&self, request_id: &str, status: RequestStatus)
        -> Result<(), StorageError>;

    /// Read-only lookup.
    ///
    /// Returns `Err(StorageError::NotFound)` if the id was never inserted.
    async fn get_status(&self, request_id: &str) -> Result<RequestStatus, StorageError>;
}
