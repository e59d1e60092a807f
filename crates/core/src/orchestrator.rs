//! The invocation pipeline.
//!
//! ```text
//! Start → Fetched → Decoded → IdentityKnown → {Skipped | Invoked} → Recorded
//! ```
//!
//! Fetch, decode and identity failures abort before the ledger is touched.
//! From `IdentityKnown` on, the request id's lock is held until the outcome
//! is recorded, so two callers racing on the same contract+operation never
//! both reach the runtime. Once the runtime has answered (or failed to), the
//! record is moved to Succeeded or Failed; it is never left Pending by an
//! attempt that observed an outcome.

use std::sync::Arc;
use std::time::Duration;

use relay_storage::{RequestLedger, RequestStatus, StorageError};
use serde::Serialize;

use crate::error::PipelineError;
use crate::identity::derive_request_id;
use crate::locks::KeyedLocks;
use crate::node::ChainDataSource;
use crate::operation;
use crate::runtime::{ContractRuntime, InvocationOutcome, RuntimeInvoker, RuntimeRegistry};

/// What one pipeline run did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationReport {
    pub request_id: String,
    pub operation: String,
    pub status: RequestStatus,
    /// True when the runtime was not called because the request had
    /// already succeeded.
    pub skipped: bool,
    pub outcome: InvocationOutcome,
}

pub struct Orchestrator {
    source: Arc<dyn ChainDataSource>,
    ledger: Arc<dyn RequestLedger>,
    runtimes: RuntimeRegistry,
    invoke_timeout: Duration,
    locks: KeyedLocks,
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn ChainDataSource>,
        ledger: Arc<dyn RequestLedger>,
        runtimes: RuntimeRegistry,
        invoke_timeout: Duration,
    ) -> Self {
        Orchestrator {
            source,
            ledger,
            runtimes,
            invoke_timeout,
            locks: KeyedLocks::new(),
        }
    }

    /// Run the pipeline for `contract` using its registered runtime.
    pub async fn invoke(&self, contract: &str) -> Result<InvocationReport, PipelineError> {
        let runtime = self
            .runtimes
            .get(contract)
            .ok_or_else(|| PipelineError::UnknownContract {
                contract: contract.to_string(),
            })?;
        self.invoke_with(contract, runtime).await
    }

    /// Run the pipeline for `contract` against an explicit runtime.
    pub async fn invoke_with(
        &self,
        contract: &str,
        runtime: Arc<dyn ContractRuntime>,
    ) -> Result<InvocationReport, PipelineError> {
        let result = self.run(contract, runtime).await;
        if let Err(e) = &result {
            tracing::warn!(contract, stage = e.stage(), error = %e, "invocation failed");
        }
        result
    }

    async fn run(
        &self,
        contract: &str,
        runtime: Arc<dyn ContractRuntime>,
    ) -> Result<InvocationReport, PipelineError> {
        // Start → Fetched
        let payload = self.source.fetch_latest(contract).await?;
        tracing::debug!(contract, bytes = payload.len(), "fetched chain data");

        // Fetched → Decoded
        let operation = operation::decode(&payload)?;

        // Decoded → IdentityKnown
        let request_id = derive_request_id(contract, &operation.name)?;
        tracing::info!(
            contract,
            request_id = %request_id,
            operation = %operation.name,
            "processing contract operation"
        );

        let _guard = self.locks.acquire(&request_id).await;

        // IdentityKnown → Skipped | Invoked
        let created = self
            .ledger
            .insert_if_absent(&request_id, RequestStatus::Pending)
            .await?;
        if !created {
            let prior = self.ledger.get_status(&request_id).await?;
            if prior.is_terminal_success() {
                tracing::info!(request_id = %request_id, "already succeeded, skipping runtime call");
                return Ok(InvocationReport {
                    outcome: InvocationOutcome::succeeded(format!(
                        "request {} already succeeded; not re-invoked",
                        request_id
                    )),
                    request_id,
                    operation: operation.name,
                    status: prior,
                    skipped: true,
                });
            }
            tracing::info!(request_id = %request_id, prior = %prior, "retrying request");
        }

        // Invoked → Recorded
        let invoker = RuntimeInvoker::new(runtime, self.invoke_timeout);
        let result = invoker.invoke(&operation).await;
        let status = match &result {
            Ok(outcome) if outcome.success => RequestStatus::Succeeded,
            _ => RequestStatus::Failed,
        };
        self.ledger.set_status(&request_id, status).await?;
        tracing::info!(request_id = %request_id, status = %status, "recorded outcome");

        match result {
            Ok(outcome) => Ok(InvocationReport {
                request_id,
                operation: operation.name,
                status,
                skipped: false,
                outcome,
            }),
            Err(source) => Err(PipelineError::Invocation { request_id, source }),
        }
    }

    /// Read-only ledger lookup.
    pub async fn query_status(&self, request_id: &str) -> Result<RequestStatus, StorageError> {
        self.ledger.get_status(request_id).await
    }
}
