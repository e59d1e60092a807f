//! Error taxonomy for the invocation pipeline.
//!
//! Every variant of [`PipelineError`] names the stage that failed, so callers
//! can tell a node outage from a bad payload from a runtime rejection.

use std::time::Duration;

use relay_storage::StorageError;

/// The remote node could not produce a usable payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("node unreachable at {address}: {message}")]
    Unreachable { address: String, message: String },

    #[error("node request timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("node rejected the request: {message}")]
    Rejected { message: String },

    #[error("node reply could not be parsed: {message}")]
    MalformedReply { message: String },

    #[error("no chain data recorded for contract {contract}")]
    Empty { contract: String },
}

/// The on-chain payload is not a single `{name: arguments}` object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is empty")]
    Empty,

    #[error("payload is not valid JSON: {message}")]
    InvalidJson { message: String },

    #[error("payload is not a JSON object (found {found})")]
    NotAnObject { found: &'static str },

    #[error("payload must name exactly one operation, found {found} keys")]
    KeyCount { found: usize },
}

/// A runtime call did not produce a usable outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvocationError {
    #[error("runtime unreachable: {message}")]
    Unreachable { message: String },

    #[error("runtime rejected the call: {message}")]
    Rejected { message: String },

    #[error("runtime call timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("runtime response is neither the success sentinel nor a status object: {raw}")]
    UnparseableResponse { raw: String },
}

/// Any failure of one pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("unsupported operation '{name}'")]
    UnsupportedOperation { name: String },

    #[error("no runtime configured for contract {contract}")]
    UnknownContract { contract: String },

    #[error("ledger error: {0}")]
    Ledger(#[from] StorageError),

    #[error("invocation of {request_id} failed: {source}")]
    Invocation {
        request_id: String,
        #[source]
        source: InvocationError,
    },
}

impl PipelineError {
    /// Stable name of the stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Fetch(_) => "fetch",
            PipelineError::Decode(_) => "decode",
            PipelineError::UnsupportedOperation { .. } => "identity",
            PipelineError::UnknownContract { .. } => "config",
            PipelineError::Ledger(_) => "ledger",
            PipelineError::Invocation { .. } => "invoke",
        }
    }

    /// Whether the failure happened before anything was written to the
    /// ledger.
    pub fn is_pre_ledger(&self) -> bool {
        matches!(
            self,
            PipelineError::Fetch(_)
                | PipelineError::Decode(_)
                | PipelineError::UnsupportedOperation { .. }
                | PipelineError::UnknownContract { .. }
        )
    }
}
