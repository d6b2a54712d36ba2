//! Rule router service.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                     RULE ROUTER                      │
//!                 │                                                      │
//!  REST client    │  ┌─────────┐    ┌──────────────┐    ┌────────────┐   │
//!  ───────────────┼─▶│  http   │───▶│ RuleService  │───▶│ RuleStore  │   │
//!                 │  │ server  │    │ (codec, ids) │    │ (snapshot) │   │
//!                 │  └─────────┘    └──────┬───────┘    └─────▲──────┘   │
//!                 │                        │                  │          │
//!  front end      │                        ▼                  │          │
//!  ───────────────┼─▶ /resolve ──▶ ┌──────────────┐           │          │
//!                 │                │   routing    │───────────┤          │
//!                 │                │ MatchEngine  │           │          │
//!                 │                └──────────────┘           │          │
//!                 │                                           │          │
//!                 │  ┌────────────────┐   ┌────────────────┐  │          │
//!                 │  │ PruneScheduler │──▶│ LifecycleGuard │──┘          │
//!                 │  └────────────────┘   └────────────────┘             │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use rule_router::config::{self, RouterConfig};
use rule_router::observability::{logging, metrics};
use rule_router::{HttpServer, MemoryRuleStore, PruneScheduler, RuleService, RuleStore, Shutdown};

#[derive(Parser)]
#[command(name = "rule-router")]
#[command(about = "Expiring routing-rule resolver", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => RouterConfig::default(),
    };

    logging::init_logging(&config.observability)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rule-router starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        snapshot_path = ?config.store.snapshot_path,
        prune_interval_secs = config.lifecycle.prune_interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store: Arc<dyn RuleStore> = match &config.store.snapshot_path {
        Some(path) => Arc::new(MemoryRuleStore::open(path)?),
        None => {
            tracing::warn!("No snapshot_path configured, rules will not survive a restart");
            Arc::new(MemoryRuleStore::new())
        }
    };
    metrics::record_rule_count(store.len()?);
    let service = RuleService::new(store);

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown.clone().trigger_on_ctrl_c());

    let scheduler = PruneScheduler::new(service.lifecycle_guard(), config.lifecycle.clone());
    let scheduler_task = tokio::spawn(scheduler.run(shutdown.subscribe()));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, service);
    server.run(listener, shutdown.subscribe()).await?;

    let _ = scheduler_task.await;
    tracing::info!("Shutdown complete");
    Ok(())
}
