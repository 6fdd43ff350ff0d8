//! Cache-side contract for the sync engine.
//!
//! The engine only needs two things from a cache: a set-with-TTL write and a
//! way to tell "the store is out of space" apart from every other failure.
//! The former is retried indefinitely by the writer; the latter aborts the
//! source being synced.

use async_trait::async_trait;
use std::time::Duration;

/// Errors surfaced by a [`CacheStore`] write.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The store reported it has no memory/space left for the write. The
    /// writer backs off and retries these indefinitely.
    #[error("cache resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Any other cache failure. Not retried; fails the current source.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A key-value store that accepts expiring writes.
///
/// Implementations must map their store's out-of-space signal to
/// [`CacheError::ResourceExhausted`]; everything else goes through
/// [`CacheError::Other`].
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Write `value` under `key`, expiring after `ttl`. A failed write
    /// leaves no partial state behind.
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    /// Release the underlying connection. Called once at service shutdown.
    async fn close(&self);
}
