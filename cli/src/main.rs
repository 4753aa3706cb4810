//! chainrelay CLI: run one relay execution and inspect the checkpoint.
//!
//! Usage:
//! ```bash
//! chainrelay run    --config relay.json
//! chainrelay status --config relay.json
//! chainrelay info
//! ```
//!
//! `run` is meant to be invoked by a scheduler (cron, systemd timer, ...).
//! Executions must not overlap.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

use chainrelay_core::checkpoint::{CheckpointStore, KeyValueStore};
use chainrelay_core::{EventKind, RelayConfig, RelayDriver};
use chainrelay_evm::{EventDef, HttpChainClient};
use chainrelay_http::HttpPublisher;

mod config;
mod logging;

use config::{RelayFileConfig, RPC_URL_ENV};

#[derive(Parser)]
#[command(
    name = "chainrelay",
    about = "Checkpointed relay of Locker contract events to a downstream endpoint",
    long_about = "
ChainRelay: scans a bounded window of blocks past the stored checkpoint,
publishes the Locker events found there in one batch, and advances the
checkpoint only after the publish succeeded.

ENVIRONMENT VARIABLES:
  CHAINRELAY_RPC_URL   JSON-RPC endpoint (overrides rpcUrl in the config file)
  RUST_LOG             Log filter (overrides the config file's log section)
",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one relay execution and print its outcome as JSON
    Run {
        /// Path to the JSON config file
        #[arg(short, long, default_value = "chainrelay.json")]
        config: PathBuf,
        /// Print the full execution report instead of the outcome only
        #[arg(long)]
        report: bool,
    },

    /// Print the stored checkpoint
    Status {
        /// Path to the JSON config file
        #[arg(short, long, default_value = "chainrelay.json")]
        config: PathBuf,
    },

    /// Show defaults and the watched events
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, report } => cmd_run(config, report).await,
        Commands::Status { config } => cmd_status(config).await,
        Commands::Info => cmd_info(),
    }
}

// ─── Command implementations ─────────────────────────────────────────────────

async fn cmd_run(path: PathBuf, full_report: bool) -> Result<()> {
    let file = RelayFileConfig::load(&path)?;
    logging::init_tracing(&file.log);

    let timeout = Duration::from_millis(file.relay.request_timeout_ms);
    let chain = HttpChainClient::new(file.rpc_url.clone(), timeout)?;
    let publisher = HttpPublisher::from_config(&file.relay)?;
    let store = file.storage.open().await?;

    let driver = RelayDriver::new(file.relay, chain, publisher, store)
        .context("building relay driver")?;
    let report = driver.run_once().await;

    // Every execution outcome, failures included, exits 0.
    if full_report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", serde_json::to_string(&report.outcome)?);
    }
    Ok(())
}

async fn cmd_status(path: PathBuf) -> Result<()> {
    let file = RelayFileConfig::load(&path)?;
    let store = file.storage.open().await?;
    let checkpoint = CheckpointStore::new(store, file.relay.checkpoint_key.clone());

    let stored = checkpoint
        .store()
        .get(checkpoint.key())
        .await
        .context("reading checkpoint")?;
    let effective = checkpoint
        .load(file.relay.default_start_block)
        .await
        .context("parsing checkpoint")?;

    let status = json!({
        "key": checkpoint.key(),
        "stored": stored,
        "checkpoint": effective,
        "nextFromBlock": effective.saturating_add(1),
        "blocksPerExecution": file.relay.blocks_per_execution(),
    });
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

fn cmd_info() -> Result<()> {
    let defaults = RelayConfig::default();
    println!("ChainRelay v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Defaults:");
    println!("  maxRangePerQuery:        {} blocks", defaults.max_range_per_query);
    println!("  maxQueriesPerExecution:  {}", defaults.max_queries_per_execution);
    println!("  publishEndpoint:         {}", defaults.publish_endpoint);
    println!("  headSafetyMargin:        {} block(s)", defaults.head_safety_margin);
    println!("  checkpointKey:           {}", defaults.checkpoint_key);
    println!("  requestTimeoutMs:        {}", defaults.request_timeout_ms);
    println!();
    println!("Watched events:");
    for kind in EventKind::ALL {
        let def = EventDef::for_kind(kind);
        println!("  {:<24} {}", kind.to_string(), def.signature);
        println!("  {:<24} topic0 {}", "", def.topic0_hex());
    }
    println!();
    println!("Storage backends:          memory, file (JSON), sqlite");
    println!("RPC override:              {RPC_URL_ENV}");
    Ok(())
}
