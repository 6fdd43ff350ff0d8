//! Per-row cache-write pipeline.
//!
//! Each fetched row is encoded to canonical JSON, compacted and compressed
//! by the codec, and written to the cache under its derived key. A write
//! that fails because the cache is out of space is retried forever on a
//! fixed backoff; shutdown is the only thing that stops the loop. Every
//! other failure propagates to the scheduler, which abandons the rest of
//! the source's batch.

use crate::cache::{CacheError, CacheStore};
use crate::codec;
use crate::types::SourceRow;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Terminal outcome of one row write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The entry was stored.
    Written,
    /// Shutdown was requested while the write was retrying or about to
    /// start; the row was abandoned and logged, not silently dropped.
    Cancelled,
}

/// Encode `row` and write it under `key` with `ttl`, retrying exhaustion
/// errors every `backoff` until success or cancellation.
pub async fn write_row(
    cache: &dyn CacheStore,
    key: &str,
    row: &SourceRow,
    ttl: Duration,
    backoff: Duration,
    cancel: &CancellationToken,
) -> anyhow::Result<WriteOutcome> {
    let payload = codec::encode(&row.to_canonical_json())?;

    loop {
        if cancel.is_cancelled() {
            warn!("Shutdown requested; abandoning write for key {key}");
            return Ok(WriteOutcome::Cancelled);
        }

        match cache.set_with_ttl(key, &payload, ttl).await {
            Ok(()) => return Ok(WriteOutcome::Written),
            Err(CacheError::ResourceExhausted(reason)) => {
                warn!(
                    "Cache out of space ({reason}); waiting {}s before retrying key {key}",
                    backoff.as_secs()
                );
                tokio::select! {
                    _ = tokio::time::sleep(backoff) => {}
                    _ = cancel.cancelled() => {
                        warn!("Shutdown requested during backoff; abandoning write for key {key}");
                        return Ok(WriteOutcome::Cancelled);
                    }
                }
            }
            Err(CacheError::Other(err)) => {
                return Err(err.context(format!("cache write failed for key {key}")))
            }
        }
    }
}
