mod app;
mod config;
mod serve;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use relay_core::{InvocationReport, PipelineError, RequestStatus, StorageError};
use tracing_subscriber::EnvFilter;

use crate::app::Relay;
use crate::config::RelayConfig;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Idempotent smart-contract invocation relay.
#[derive(Parser)]
#[command(
    name = "dapp-relay",
    version,
    about = "Idempotent smart-contract invocation relay"
)]
struct Cli {
    /// Path to the relay configuration file
    #[arg(long, global = true, default_value = "relay.toml")]
    config: PathBuf,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay HTTP server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
        /// Path to TLS certificate PEM file (requires --tls-key)
        #[arg(long)]
        tls_cert: Option<PathBuf>,
        /// Path to TLS private key PEM file (requires --tls-cert)
        #[arg(long)]
        tls_key: Option<PathBuf>,
    },

    /// Run the pipeline once for a contract
    Invoke {
        /// Smart contract hash
        contract: String,
    },

    /// Show the ledger status of a request
    Status {
        /// Request id, e.g. <contract-hash>-mint
        request_id: String,
    },

    /// Register callback URLs for configured contracts with the node
    RegisterCallback {
        /// Contract feature name from the config (default: all)
        feature: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json, cli.quiet);

    let config = match RelayConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            report_error(&format!("config error: {}", e), cli.output, cli.quiet);
            process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(
                &format!("failed to create tokio runtime: {}", e),
                cli.output,
                cli.quiet,
            );
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Serve {
            port,
            tls_cert,
            tls_key,
        } => {
            if tls_cert.is_some() != tls_key.is_some() {
                report_error(
                    "error: --tls-cert and --tls-key must both be provided",
                    cli.output,
                    cli.quiet,
                );
                process::exit(1);
            }
            let result: Result<(), Box<dyn std::error::Error>> = rt.block_on(async {
                let relay = Relay::build(config).await?;
                serve::start_server(relay, port, tls_cert, tls_key).await
            });
            if let Err(e) = result {
                report_error(&format!("Server error: {}", e), cli.output, cli.quiet);
                process::exit(1);
            }
        }
        Commands::Invoke { contract } => {
            rt.block_on(cmd_invoke(config, &contract, cli.output, cli.quiet));
        }
        Commands::Status { request_id } => {
            rt.block_on(cmd_status(&config, &request_id, cli.output, cli.quiet));
        }
        Commands::RegisterCallback { feature } => {
            rt.block_on(cmd_register_callback(
                config,
                feature.as_deref(),
                cli.output,
                cli.quiet,
            ));
        }
    }
}

/// Logs go to stderr; stdout is reserved for command output.
fn init_tracing(json: bool, quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn build_relay(config: RelayConfig, output: OutputFormat, quiet: bool) -> Relay {
    match Relay::build(config).await {
        Ok(relay) => relay,
        Err(e) => {
            report_error(&format!("ledger error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

async fn cmd_invoke(config: RelayConfig, contract: &str, output: OutputFormat, quiet: bool) {
    let relay = build_relay(config, output, quiet).await;
    match relay.orchestrator.invoke(contract).await {
        Ok(report) => {
            print_report(&report, output);
            if report.status == RequestStatus::Failed {
                process::exit(1);
            }
        }
        Err(e) => {
            report_pipeline_error(&e, output, quiet);
            process::exit(1);
        }
    }
}

fn print_report(report: &InvocationReport, output: OutputFormat) {
    match output {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "request_id": report.request_id,
                "operation": report.operation,
                "status": report.status.code(),
                "state": report.status.as_str(),
                "skipped": report.skipped,
                "data": report.outcome,
            });
            let pretty = serde_json::to_string_pretty(&value)
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
        OutputFormat::Text => {
            let note = if report.skipped {
                " (already succeeded, not re-invoked)"
            } else {
                ""
            };
            println!(
                "{} [{}]: {}{}",
                report.request_id, report.operation, report.status, note
            );
            if !report.outcome.message.is_empty() {
                println!("  {}", report.outcome.message);
            }
        }
    }
}

async fn cmd_status(config: &RelayConfig, request_id: &str, output: OutputFormat, quiet: bool) {
    let ledger = match app::open_ledger(config).await {
        Ok(ledger) => ledger,
        Err(e) => {
            report_error(&format!("ledger error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    match ledger.get_status(request_id).await {
        Ok(status) => match output {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "request_id": request_id,
                    "status": status.code(),
                    "state": status.as_str(),
                });
                println!("{}", value);
            }
            OutputFormat::Text => println!("{}: {} ({})", request_id, status, status.code()),
        },
        Err(StorageError::NotFound { .. }) => {
            report_error(
                &format!("request '{}' not found", request_id),
                output,
                quiet,
            );
            process::exit(1);
        }
        Err(e) => {
            report_error(&format!("ledger error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

async fn cmd_register_callback(
    config: RelayConfig,
    feature: Option<&str>,
    output: OutputFormat,
    quiet: bool,
) {
    let selected: Vec<_> = match feature {
        Some(name) => match config.contracts.get_key_value(name) {
            Some(entry) => vec![entry],
            None => {
                report_error(&format!("no contract named '{}' in config", name), output, quiet);
                process::exit(1);
            }
        },
        None => config.contracts.iter().collect(),
    };
    if selected.is_empty() {
        report_error("no contracts configured", output, quiet);
        process::exit(1);
    }

    let node = relay_core::NodeClient::new(&config.node_address, config.fetch_timeout());
    let mut failed = false;
    for (name, contract) in selected {
        let url = config.callback_endpoint(contract);
        match node.register_callback(&contract.contract_hash, &url).await {
            Ok(reply) => {
                tracing::info!(feature = %name, contract = %contract.contract_hash, "callback registered");
                match output {
                    OutputFormat::Json => println!(
                        "{}",
                        serde_json::json!({
                            "feature": name,
                            "contract_hash": contract.contract_hash,
                            "callback_url": url,
                            "message": reply.message,
                        })
                    ),
                    OutputFormat::Text => {
                        if !quiet {
                            println!("{} ({}) -> {}", name, contract.contract_hash, url);
                        }
                    }
                }
            }
            Err(e) => {
                failed = true;
                report_error(
                    &format!("failed to register callback for '{}': {}", name, e),
                    output,
                    quiet,
                );
            }
        }
    }
    if failed {
        process::exit(1);
    }
}

fn report_pipeline_error(err: &PipelineError, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error [{}]: {}", err.stage(), err),
        OutputFormat::Json => eprintln!(
            "{}",
            serde_json::json!({
                "status": false,
                "stage": err.stage(),
                "message": err.to_string(),
            })
        ),
    }
}

/// Print an error message to stderr in the requested format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}
