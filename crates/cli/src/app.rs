//! Builds the pipeline from a loaded [`RelayConfig`].

use std::sync::Arc;

use relay_core::{
    CommandRuntime, ContractRuntime, HttpRuntime, NodeClient, Orchestrator, RequestLedger,
    RuntimeRegistry, StorageError,
};
use relay_storage::{MemoryLedger, SqliteLedger};

use crate::config::{LedgerKind, RelayConfig, RuntimeConfig};

/// Everything a command needs to talk to the node and run contracts.
pub(crate) struct Relay {
    pub(crate) config: RelayConfig,
    pub(crate) orchestrator: Arc<Orchestrator>,
}

impl Relay {
    pub(crate) async fn build(config: RelayConfig) -> Result<Self, StorageError> {
        let ledger = open_ledger(&config).await?;
        let node = NodeClient::new(&config.node_address, config.fetch_timeout());
        let runtimes = build_runtimes(&config);

        tracing::info!(
            node = %node.address(),
            contracts = runtimes.len(),
            ledger = ?config.ledger,
            user_did = config.user_did.as_deref().unwrap_or("-"),
            "relay configured"
        );

        let orchestrator = Orchestrator::new(
            Arc::new(node),
            ledger,
            runtimes,
            config.invoke_timeout(),
        );
        Ok(Relay {
            config,
            orchestrator: Arc::new(orchestrator),
        })
    }
}

pub(crate) async fn open_ledger(
    config: &RelayConfig,
) -> Result<Arc<dyn RequestLedger>, StorageError> {
    match config.ledger {
        LedgerKind::Memory => Ok(Arc::new(MemoryLedger::new())),
        LedgerKind::Sqlite => {
            let ledger = SqliteLedger::open(&config.ledger_path).await?;
            tracing::debug!(path = %config.ledger_path.display(), "opened sqlite ledger");
            Ok(Arc::new(ledger))
        }
    }
}

fn build_runtimes(config: &RelayConfig) -> RuntimeRegistry {
    let mut registry = RuntimeRegistry::new();
    for (feature, contract) in &config.contracts {
        let runtime: Arc<dyn ContractRuntime> = match &contract.runtime {
            RuntimeConfig::Http { url } => Arc::new(HttpRuntime::new(url, config.invoke_timeout())),
            RuntimeConfig::Command { program, args } => {
                Arc::new(CommandRuntime::new(program, args.clone()))
            }
        };
        tracing::debug!(
            feature = %feature,
            contract = %contract.contract_hash,
            runtime = runtime.runtime_id(),
            "registered contract runtime"
        );
        registry.insert(&contract.contract_hash, runtime);
    }
    registry
}
