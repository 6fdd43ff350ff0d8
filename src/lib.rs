//! cache-sync library
//!
//! A service that mirrors selected relational tables or views into a Redis
//! cache on a fixed cadence, so readers get low-latency access to a recent
//! snapshot without touching the source database.
//!
//! # How a cycle works
//!
//! 1. For each configured connection, enumerate the sync targets (base
//!    tables or views, fixed per process by [`source::SourceMode`]).
//! 2. For each target, fetch at most `top_rows` rows and derive the
//!    identity-key strategy once ([`keys::KeyStrategy`]): primary keys,
//!    then the configured mapping, then a column-type heuristic.
//! 3. Fan the rows out to bounded concurrent cache writes. Each payload is
//!    run-compacted and zstd-compressed ([`codec`]) and stored with a TTL
//!    under `<database>:<source>:<identity>`.
//! 4. Cache out-of-space errors are retried forever on a fixed backoff;
//!    anything else fails that connection's cycle without stopping the
//!    others.
//!
//! The loop sleeps between cycles and exits promptly on shutdown, including
//! out of an in-flight backoff wait.

pub mod cache;
pub mod codec;
pub mod config;
pub mod keys;
pub mod postgresql;
pub mod redis;
pub mod source;
pub mod sync;
pub mod types;
pub mod writer;

pub use cache::{CacheError, CacheStore};
pub use config::{ConnectionSettings, Settings};
pub use keys::KeyStrategy;
pub use source::{RelationalSource, SourceMode};
pub use sync::{run_sync_loop, PostgresConnector, SourceConnector, SyncContext};
pub use types::{ColumnMeta, ColumnType, SourceRow, SourceValue, SyncTarget};
pub use writer::WriteOutcome;
