//! Contract runtime abstraction and the invoker that normalizes its replies.
//!
//! Two levels of abstraction:
//! - [`ContractRuntime`] — sends ONE `{name: arguments}` envelope to an
//!   execution engine and returns its raw reply text
//! - [`RuntimeInvoker`] — bounds the call with a timeout and turns the raw
//!   reply into an [`InvocationOutcome`]
//!
//! A runtime replies either with the bare sentinel `success` (fire-and-forget
//! functions) or with `{"status": bool, "message": "...", "result": ...}`.
//! Both shapes stop here; nothing past the invoker sees the difference.

pub mod command;
pub mod http;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::InvocationError;
use crate::operation::Operation;

const SUCCESS_SENTINEL: &str = "success";

/// Executes contract calls.
#[async_trait]
pub trait ContractRuntime: Send + Sync {
    /// Submit a call envelope and return the runtime's reply text.
    async fn call(&self, envelope: &str) -> Result<String, InvocationError>;

    /// Returns this runtime's identifier (e.g. "http", "command").
    fn runtime_id(&self) -> &str;
}

/// Normalized result of one runtime call.
///
/// Serialized with the field names callers already poll for:
/// `{"status": true, "message": "...", "result": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationOutcome {
    #[serde(rename = "status")]
    pub success: bool,
    pub message: String,
    #[serde(rename = "result", default)]
    pub raw: serde_json::Value,
}

impl InvocationOutcome {
    pub fn succeeded(message: impl Into<String>) -> Self {
        InvocationOutcome {
            success: true,
            message: message.into(),
            raw: serde_json::Value::Null,
        }
    }
}

/// Turn a raw runtime reply into an outcome.
pub fn normalize(op_name: &str, reply: &str) -> Result<InvocationOutcome, InvocationError> {
    let trimmed = reply.trim();
    if trimmed == SUCCESS_SENTINEL {
        return Ok(sentinel_outcome(op_name));
    }

    let unparseable = || InvocationError::UnparseableResponse {
        raw: reply.to_string(),
    };

    match serde_json::from_str::<serde_json::Value>(trimmed).map_err(|_| unparseable())? {
        serde_json::Value::String(s) if s.trim() == SUCCESS_SENTINEL => {
            Ok(sentinel_outcome(op_name))
        }
        serde_json::Value::Object(mut obj) => {
            let success = match obj.get("status") {
                Some(serde_json::Value::Bool(b)) => *b,
                _ => return Err(unparseable()),
            };
            let message = obj
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or_default()
                .to_string();
            let raw = obj.remove("result").unwrap_or(serde_json::Value::Null);
            Ok(InvocationOutcome {
                success,
                message,
                raw,
            })
        }
        _ => Err(unparseable()),
    }
}

fn sentinel_outcome(op_name: &str) -> InvocationOutcome {
    InvocationOutcome::succeeded(format!("{} executed successfully", op_name))
}

/// Drives one runtime with a deadline.
#[derive(Clone)]
pub struct RuntimeInvoker {
    runtime: Arc<dyn ContractRuntime>,
    timeout: Duration,
}

impl RuntimeInvoker {
    pub fn new(runtime: Arc<dyn ContractRuntime>, timeout: Duration) -> Self {
        RuntimeInvoker { runtime, timeout }
    }

    pub async fn invoke(&self, operation: &Operation) -> Result<InvocationOutcome, InvocationError> {
        tracing::debug!(
            runtime = self.runtime.runtime_id(),
            operation = %operation.name,
            "calling contract runtime"
        );
        let reply = tokio::time::timeout(self.timeout, self.runtime.call(operation.envelope()))
            .await
            .map_err(|_| InvocationError::Timeout {
                after: self.timeout,
            })??;
        normalize(&operation.name, &reply)
    }
}

/// Contract hash → runtime.
#[derive(Clone, Default)]
pub struct RuntimeRegistry {
    runtimes: HashMap<String, Arc<dyn ContractRuntime>>,
}

impl RuntimeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, contract: &str, runtime: Arc<dyn ContractRuntime>) {
        self.runtimes.insert(contract.to_string(), runtime);
    }

    pub fn get(&self, contract: &str) -> Option<Arc<dyn ContractRuntime>> {
        self.runtimes.get(contract).cloned()
    }

    pub fn len(&self) -> usize {
        self.runtimes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runtimes.is_empty()
    }
}
