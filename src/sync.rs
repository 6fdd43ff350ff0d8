//! The sync cycle scheduler.
//!
//! One long-lived loop drives the whole service: every cycle walks the
//! configured connections sequentially, enumerates each connection's sync
//! targets, fetches a bounded row set per target, and fans the rows out to
//! concurrent cache writes. The loop then sleeps for the configured
//! interval and repeats until shutdown is requested.
//!
//! # Failure isolation
//!
//! A connection that fails to open, or fails while being processed, is
//! logged and skipped for the cycle; other connections still run. Within a
//! source's row batch the first non-retryable write error aborts the
//! remaining fan-in and surfaces as that connection's failure. Cache
//! exhaustion is never a failure; the writer retries it until shutdown.

use crate::cache::CacheStore;
use crate::config::{ConnectionSettings, Settings};
use crate::keys::KeyStrategy;
use crate::source::RelationalSource;
use crate::types::SyncTarget;
use crate::writer::{self, WriteOutcome};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Everything a cycle needs, constructed once at startup.
pub struct SyncContext {
    pub settings: Settings,
    pub cache: Arc<dyn CacheStore>,
}

impl SyncContext {
    pub fn new(settings: Settings, cache: Arc<dyn CacheStore>) -> Self {
        SyncContext { settings, cache }
    }

    /// Tear down shared resources after the loop has exited.
    pub async fn shutdown(&self) {
        self.cache.close().await;
    }
}

/// Opens relational connections for the scheduler. Production uses
/// [`PostgresConnector`]; tests substitute in-memory sources.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    async fn connect(&self, conn: &ConnectionSettings)
        -> Result<Box<dyn RelationalSource>>;
}

/// Connects each configured URL as a PostgreSQL source.
pub struct PostgresConnector;

#[async_trait]
impl SourceConnector for PostgresConnector {
    async fn connect(&self, conn: &ConnectionSettings) -> Result<Box<dyn RelationalSource>> {
        let source = crate::postgresql::PostgresSource::connect(&conn.url).await?;
        Ok(Box::new(source))
    }
}

/// Run sync cycles until `cancel` is triggered.
pub async fn run_sync_loop(
    ctx: &SyncContext,
    connector: &dyn SourceConnector,
    cancel: &CancellationToken,
) -> Result<()> {
    let interval = ctx.settings.sync_interval_duration()?;

    while !cancel.is_cancelled() {
        info!("=== Sync cycle started ===");
        run_cycle(ctx, connector, cancel).await;
        info!("=== Sync cycle completed ===");

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = cancel.cancelled() => break,
        }
    }

    info!("Sync loop stopped");
    Ok(())
}

/// One pass over all configured connections. Never fails; per-connection
/// errors are logged and the cycle moves on.
pub async fn run_cycle(
    ctx: &SyncContext,
    connector: &dyn SourceConnector,
    cancel: &CancellationToken,
) {
    for conn in &ctx.settings.connections {
        if cancel.is_cancelled() {
            return;
        }
        if let Err(e) = sync_connection(ctx, connector, conn, cancel).await {
            error!("Error syncing database {}: {e:#}", conn.label());
        }
    }
}

/// Sync every target of one connection.
async fn sync_connection(
    ctx: &SyncContext,
    connector: &dyn SourceConnector,
    conn: &ConnectionSettings,
    cancel: &CancellationToken,
) -> Result<()> {
    let source = connector
        .connect(conn)
        .await
        .context("failed to open connection")?;
    let database = source.database_name().to_string();
    info!("Connected to database: {database}");

    let targets = source.list_targets(ctx.settings.mode).await?;
    info!("{} sources found in database {database}", targets.len());

    for target in &targets {
        sync_target(ctx, source.as_ref(), &database, target, cancel).await?;
        if cancel.is_cancelled() {
            break;
        }
    }

    info!("Completed syncing database: {database}");
    Ok(())
}

/// Fetch one target's rows and fan them out to the cache writer.
async fn sync_target(
    ctx: &SyncContext,
    source: &dyn RelationalSource,
    database: &str,
    target: &SyncTarget,
    cancel: &CancellationToken,
) -> Result<()> {
    info!("Syncing source: {}", target.name);

    let primary_keys = if target.is_table {
        source
            .primary_key_columns(&target.schema, &target.name)
            .await?
    } else {
        Vec::new()
    };

    let rows = source
        .fetch_top_rows(&target.schema, &target.name, ctx.settings.top_rows)
        .await?;

    if rows.is_empty() {
        info!("No rows found for source: {}", target.name);
        return Ok(());
    }

    // Key resolution is source-scoped; only the value substitution below
    // is per row.
    let strategy = KeyStrategy::for_source(
        &primary_keys,
        &ctx.settings.key_mapping,
        &target.name,
        rows[0].columns(),
    );

    let ttl = ctx.settings.cache_ttl_duration()?;
    let backoff = ctx.settings.retry_backoff_duration()?;
    let row_count = rows.len();

    info!("Syncing {row_count} rows from source {}", target.name);

    let outcomes: Vec<WriteOutcome> = stream::iter(rows)
        .map(|row| {
            let key = strategy.cache_key(database, &target.name, &row);
            write_one(ctx.cache.as_ref(), key, row, ttl, backoff, cancel)
        })
        .buffer_unordered(ctx.settings.max_concurrent_writes)
        .try_collect()
        .await?;

    let abandoned = outcomes
        .iter()
        .filter(|o| matches!(o, WriteOutcome::Cancelled))
        .count();
    if abandoned > 0 {
        info!(
            "Completed syncing source: {} ({abandoned} of {row_count} rows abandoned at shutdown)",
            target.name
        );
    } else {
        info!("Completed syncing source: {}", target.name);
    }
    Ok(())
}

async fn write_one(
    cache: &dyn CacheStore,
    key: String,
    row: crate::types::SourceRow,
    ttl: Duration,
    backoff: Duration,
    cancel: &CancellationToken,
) -> Result<WriteOutcome> {
    writer::write_row(cache, &key, &row, ttl, backoff, cancel).await
}
