//! Relay configuration file (`relay.toml`).
//!
//! Maps each deployed contract to the route the node calls back on and the
//! runtime that executes it.
//!
//! # Example
//!
//! ```toml
//! user_did = "bafybmi..."
//! node_address = "http://localhost:20009"
//! ledger = "sqlite"
//! ledger_path = "requests.db"
//! callback_base_url = "http://localhost:8080"
//!
//! [contracts.nft]
//! contract_hash = "QmNft..."
//! callback_url = "/api/v1/nft-dapp"
//! runtime = { kind = "http", url = "http://localhost:9000/execute" }
//!
//! [contracts.ft]
//! contract_hash = "QmFt..."
//! callback_url = "/api/v1/ft-dapp"
//! runtime = { kind = "command", program = "wasm-exec", args = ["ft_contract.wasm"] }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Routes served by the relay itself; contract callbacks may not shadow them.
const RESERVED_ROUTES: [&str; 3] = ["/health", "/api/run-dapp", "/request-status"];

/// Characters axum reads as path captures or wildcards.
const ROUTE_SYNTAX: [char; 4] = [':', '{', '}', '*'];

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("node_address must not be empty")]
    EmptyNodeAddress,

    #[error("contract '{feature}' has an empty contract_hash")]
    EmptyHash { feature: String },

    #[error(
        "contract '{feature}' callback_url '{route}' must start with '/' and contain none of ':', '{{', '}}', '*'"
    )]
    CallbackRoute { feature: String, route: String },

    #[error("callback_url '{route}' is used more than once or shadows a built-in route")]
    DuplicateRoute { route: String },

    #[error("contract_hash '{hash}' is configured more than once")]
    DuplicateHash { hash: String },

    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },
}

/// Ledger backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerKind {
    #[default]
    Sqlite,
    Memory,
}

/// How a contract's calls are executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RuntimeConfig {
    /// POST the call envelope to an executor service.
    Http { url: String },
    /// Run a local program with the envelope as its last argument.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

/// `[contracts.<feature>]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractConfig {
    pub contract_hash: String,
    /// Path the node calls back on, e.g. `/api/v1/nft-dapp`.
    pub callback_url: String,
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// DID of the relay operator; logged at startup.
    #[serde(default)]
    pub user_did: Option<String>,
    #[serde(alias = "non_quorum_node_address")]
    pub node_address: String,
    #[serde(default)]
    pub ledger: LedgerKind,
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_invoke_timeout")]
    pub invoke_timeout_secs: u64,
    #[serde(default = "default_callback_base_url")]
    pub callback_base_url: String,
    /// Contracts keyed by feature name (`nft`, `ft`, ...).
    #[serde(default)]
    pub contracts: BTreeMap<String, ContractConfig>,
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("requests.db")
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_invoke_timeout() -> u64 {
    120
}

fn default_callback_base_url() -> String {
    "http://localhost:8080".to_string()
}

// ── Functions ─────────────────────────────────────────────────────────────────

impl RelayConfig {
    /// Read, apply `RELAY_*` environment overrides, and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&content, path)?;
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply `RELAY_NODE_ADDRESS` and `RELAY_LEDGER_PATH`. Empty values are
    /// ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(address) = lookup("RELAY_NODE_ADDRESS").filter(|v| !v.is_empty()) {
            self.node_address = address;
        }
        if let Some(path) = lookup("RELAY_LEDGER_PATH").filter(|v| !v.is_empty()) {
            self.ledger_path = PathBuf::from(path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_address.trim().is_empty() {
            return Err(ConfigError::EmptyNodeAddress);
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout {
                field: "fetch_timeout_secs",
            });
        }
        if self.invoke_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout {
                field: "invoke_timeout_secs",
            });
        }

        let mut routes: HashSet<&str> = RESERVED_ROUTES.into_iter().collect();
        let mut hashes = HashSet::new();
        for (feature, contract) in &self.contracts {
            if contract.contract_hash.trim().is_empty() {
                return Err(ConfigError::EmptyHash {
                    feature: feature.clone(),
                });
            }
            if !contract.callback_url.starts_with('/')
                || contract.callback_url.contains(ROUTE_SYNTAX)
            {
                return Err(ConfigError::CallbackRoute {
                    feature: feature.clone(),
                    route: contract.callback_url.clone(),
                });
            }
            if !routes.insert(contract.callback_url.as_str()) {
                return Err(ConfigError::DuplicateRoute {
                    route: contract.callback_url.clone(),
                });
            }
            if !hashes.insert(contract.contract_hash.as_str()) {
                return Err(ConfigError::DuplicateHash {
                    hash: contract.contract_hash.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn invoke_timeout(&self) -> Duration {
        Duration::from_secs(self.invoke_timeout_secs)
    }

    /// Full URL the node should call back on for `contract`.
    pub fn callback_endpoint(&self, contract: &ContractConfig) -> String {
        format!(
            "{}{}",
            self.callback_base_url.trim_end_matches('/'),
            contract.callback_url
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
