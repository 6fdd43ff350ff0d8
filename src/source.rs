//! Relational-source contract for the sync engine.
//!
//! The scheduler only needs metadata enumeration and bounded row fetches
//! from a source; everything database-specific lives behind this trait.
//! [`crate::postgresql::PostgresSource`] is the production implementation,
//! and the scheduler tests drive an in-memory fake.

use crate::types::{SourceRow, SyncTarget};
use async_trait::async_trait;
use serde::Deserialize;

/// Which kind of source a whole process enumerates. Fixed by configuration;
/// a cycle never mixes the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    Tables,
    Views,
}

/// One open connection to a relational database.
#[async_trait]
pub trait RelationalSource: Send + Sync {
    /// Name of the connected database; the first segment of every cache key
    /// derived from this connection.
    fn database_name(&self) -> &str;

    /// List the sync targets for this cycle: base tables or views,
    /// depending on `mode`. Order is whatever the metadata interface
    /// returns.
    async fn list_targets(&self, mode: SourceMode) -> anyhow::Result<Vec<SyncTarget>>;

    /// Primary-key column names of a table in ordinal order. Empty for
    /// key-less tables; never called for views.
    async fn primary_key_columns(&self, schema: &str, name: &str)
        -> anyhow::Result<Vec<String>>;

    /// Fetch at most `limit` rows with their column metadata. No ordering
    /// is assumed.
    async fn fetch_top_rows(
        &self,
        schema: &str,
        name: &str,
        limit: u32,
    ) -> anyhow::Result<Vec<SourceRow>>;
}
