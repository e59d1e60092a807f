//! Client for the blockchain node's HTTP API.
//!
//! Uses `ureq` (sync) wrapped in `tokio::task::spawn_blocking` to avoid
//! blocking the async runtime.
//!
//! - `POST /api/get-smart-contract-token-chain-data` — latest chain data for
//!   a contract; the last entry's `SmartContractData` is the current
//!   instruction.
//! - `POST /api/register-callback-url` — ask the node to call us back when a
//!   contract's chain data changes.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

const CHAIN_DATA_PATH: &str = "/api/get-smart-contract-token-chain-data";
const REGISTER_CALLBACK_PATH: &str = "/api/register-callback-url";

/// Anything that can produce the current on-chain payload for a contract.
#[async_trait]
pub trait ChainDataSource: Send + Sync {
    /// Fetch the latest operation payload recorded for `contract`.
    async fn fetch_latest(&self, contract: &str) -> Result<String, FetchError>;
}

#[derive(Debug, Serialize)]
struct ChainDataRequest<'a> {
    token: &'a str,
    latest: bool,
}

#[derive(Debug, Serialize)]
struct RegisterCallbackRequest<'a> {
    #[serde(rename = "SmartContractToken")]
    smart_contract_token: &'a str,
    #[serde(rename = "CallBackURL")]
    callback_url: &'a str,
}

/// Status/message envelope common to node replies.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BasicReply {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub message: String,
}

/// One chain-data entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainDataEntry {
    #[serde(rename = "BlockNo", default)]
    pub block_no: u64,
    #[serde(rename = "BlockId", default)]
    pub block_id: String,
    #[serde(rename = "SmartContractData", default)]
    pub smart_contract_data: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainDataReply {
    #[serde(flatten)]
    pub basic: BasicReply,
    #[serde(rename = "SCTDataReply", default)]
    pub entries: Option<Vec<ChainDataEntry>>,
}

/// Pick the current payload out of a raw chain-data reply.
///
/// The node returns entries oldest first; the last one is current.
pub fn latest_payload(contract: &str, body: &str) -> Result<String, FetchError> {
    let reply: ChainDataReply =
        serde_json::from_str(body).map_err(|e| FetchError::MalformedReply {
            message: e.to_string(),
        })?;

    let entries = reply.entries.unwrap_or_default();
    if entries.is_empty() && !reply.basic.status && !reply.basic.message.is_empty() {
        return Err(FetchError::Rejected {
            message: reply.basic.message,
        });
    }

    match entries.into_iter().last() {
        Some(entry) if !entry.smart_contract_data.trim().is_empty() => {
            tracing::debug!(
                contract,
                block_no = entry.block_no,
                block_id = %entry.block_id,
                "selected latest chain data entry"
            );
            Ok(entry.smart_contract_data)
        }
        _ => Err(FetchError::Empty {
            contract: contract.to_string(),
        }),
    }
}

/// HTTP client for a single node.
#[derive(Debug, Clone)]
pub struct NodeClient {
    address: String,
    timeout: Duration,
}

impl NodeClient {
    pub fn new(address: &str, timeout: Duration) -> Self {
        NodeClient {
            address: address.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Register `callback_url` as the node's callback for `contract`.
    pub async fn register_callback(
        &self,
        contract: &str,
        callback_url: &str,
    ) -> Result<BasicReply, FetchError> {
        let body = serde_json::to_value(RegisterCallbackRequest {
            smart_contract_token: contract,
            callback_url,
        })
        .map_err(|e| FetchError::MalformedReply {
            message: e.to_string(),
        })?;

        let text = self.post_json(REGISTER_CALLBACK_PATH, body).await?;
        let reply: BasicReply =
            serde_json::from_str(&text).map_err(|e| FetchError::MalformedReply {
                message: e.to_string(),
            })?;
        if !reply.status {
            return Err(FetchError::Rejected {
                message: reply.message,
            });
        }
        Ok(reply)
    }

    async fn post_json(&self, path: &str, body: serde_json::Value) -> Result<String, FetchError> {
        let url = format!("{}{}", self.address, path);
        let address = self.address.clone();
        let timeout = self.timeout;

        tokio::task::spawn_blocking(move || {
            let agent: ureq::Agent = ureq::Agent::config_builder()
                .timeout_global(Some(timeout))
                .build()
                .into();

            let response = agent
                .post(&url)
                .header("Content-Type", "application/json; charset=UTF-8")
                .send_json(&body)
                .map_err(|e| classify_error(e, &address, timeout))?;

            response
                .into_body()
                .read_to_string()
                .map_err(|e| FetchError::MalformedReply {
                    message: format!("failed to read response body: {}", e),
                })
        })
        .await
        .map_err(|e| FetchError::Unreachable {
            address: self.address.clone(),
            message: format!("task join error: {}", e),
        })?
    }
}

fn classify_error(err: ureq::Error, address: &str, timeout: Duration) -> FetchError {
    match err {
        ureq::Error::StatusCode(code) => FetchError::Rejected {
            message: format!("http status {}", code),
        },
        ureq::Error::Timeout(_) => FetchError::Timeout { after: timeout },
        other => FetchError::Unreachable {
            address: address.to_string(),
            message: other.to_string(),
        },
    }
}

#[async_trait]
impl ChainDataSource for NodeClient {
    async fn fetch_latest(&self, contract: &str) -> Result<String, FetchError> {
        let body = serde_json::to_value(ChainDataRequest {
            token: contract,
            latest: true,
        })
        .map_err(|e| FetchError::MalformedReply {
            message: e.to_string(),
        })?;

        let text = self.post_json(CHAIN_DATA_PATH, body).await?;
        latest_payload(contract, &text)
    }
}
