#![allow(clippy::result_large_err)]
//! relay-core: idempotent contract invocation pipeline.
//!
//! Reads the latest payload a smart contract recorded on chain, decodes it
//! into one named operation, derives a stable request id, and hands the call
//! to a contract runtime at most once per successful request.
//!
//! # Public API
//!
//! - [`Orchestrator`] -- runs the pipeline and answers status queries
//! - [`NodeClient`] -- HTTP client for the node's chain-data endpoint
//! - [`ContractRuntime`] -- execution engine seam, with [`HttpRuntime`] and
//!   [`CommandRuntime`] backends
//! - [`PipelineError`] -- stage-tagged failure of one run
//!
//! Ledger types come from `relay-storage` and are re-exported here.

/// Crate version reported by `/health` and `--version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod identity;
pub mod locks;
pub mod node;
pub mod operation;
pub mod orchestrator;
pub mod runtime;

// ── Convenience re-exports ───────────────────────────────────────────

pub use error::{DecodeError, FetchError, InvocationError, PipelineError};
pub use identity::{derive_request_id, OperationClass, OperationKind};
pub use node::{ChainDataSource, NodeClient};
pub use operation::{decode, Operation};
pub use orchestrator::{InvocationReport, Orchestrator};
pub use runtime::command::CommandRuntime;
pub use runtime::http::HttpRuntime;
pub use runtime::{ContractRuntime, InvocationOutcome, RuntimeInvoker, RuntimeRegistry};

pub use relay_storage::{RequestLedger, RequestStatus, StorageError};
