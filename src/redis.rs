//! Redis implementation of the cache contract.

use crate::cache::{CacheError, CacheStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::info;

/// Cache store backed by a single shared Redis connection.
///
/// `ConnectionManager` multiplexes concurrent commands over one connection
/// and reconnects on failure, so one instance is shared by every row write.
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// Connect to Redis at `url` (e.g. `redis://localhost:6379`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("invalid Redis URL")?;
        let connection = ConnectionManager::new(client)
            .await
            .context("failed to connect to Redis")?;
        info!("Connected to Redis at {url}");
        Ok(RedisCache { connection })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        // SET key value EX seconds; Redis TTLs are whole seconds.
        let ttl_secs = ttl.as_secs().max(1);
        let result: Result<(), redis::RedisError> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await;
        result.map_err(classify_redis_error)
    }

    async fn close(&self) {
        // ConnectionManager tears the connection down on drop; nothing to
        // flush for plain SETs.
        info!("Closing Redis connection");
    }
}

/// Map a Redis error to the engine's taxonomy. Redis rejects writes over
/// `maxmemory` with the `OOM` error code; that is the retryable case.
fn classify_redis_error(err: redis::RedisError) -> CacheError {
    if err.code() == Some("OOM") {
        CacheError::ResourceExhausted(err.to_string())
    } else {
        CacheError::Other(anyhow::Error::new(err).context("redis write failed"))
    }
}
