//! Command-line entry point for cache-sync.
//!
//! ```bash
//! # Run with an explicit config file
//! cache-sync --config /etc/cache-sync.yaml
//!
//! # Or via the environment
//! CACHE_SYNC_CONFIG=/etc/cache-sync.yaml RUST_LOG=info cache-sync
//! ```
//!
//! The process runs sync cycles until it receives Ctrl-C, then finishes
//! in-flight work promptly and closes the cache connection.

use cache_sync::redis::RedisCache;
use cache_sync::{run_sync_loop, PostgresConnector, Settings, SyncContext};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "cache-sync")]
#[command(about = "Mirrors relational tables and views into a Redis cache on a fixed cadence")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, env = "CACHE_SYNC_CONFIG", default_value = "cache-sync.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)?;

    let cache = Arc::new(RedisCache::connect(&settings.redis_url).await?);
    let ctx = SyncContext::new(settings, cache);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            signal_cancel.cancel();
        }
    });

    let result = run_sync_loop(&ctx, &PostgresConnector, &cancel).await;
    ctx.shutdown().await;
    result
}
