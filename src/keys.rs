//! Identity-key derivation for cached rows.
//!
//! Every cached row is stored under `<database>:<source>:<identity>`. How
//! the identity part is derived is decided once per source, then applied to
//! each row of the batch:
//!
//! 1. Primary-key columns, when the table has any: their values for the row,
//!    colon-joined in ordinal order.
//! 2. An explicit column named for this source in the configured key
//!    mapping.
//! 3. The first column whose declared type is integer, long-integer, or
//!    date/time; failing that, the first column in natural order.

use crate::types::{ColumnMeta, SourceRow};
use std::collections::HashMap;

/// Per-source key-derivation strategy, resolved before fanning out rows.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyStrategy {
    /// Join the primary-key column values in ordinal order.
    PrimaryKeys(Vec<String>),
    /// Use the column configured for this source.
    MappedColumn(String),
    /// Use the heuristic-or-first column chosen from the batch metadata.
    FallbackColumn(String),
}

impl KeyStrategy {
    /// Resolve the strategy for one source. `primary_keys` is empty for
    /// views and key-less tables; `mapping` is the static source-name to
    /// column-name configuration.
    pub fn for_source(
        primary_keys: &[String],
        mapping: &HashMap<String, String>,
        source_name: &str,
        columns: &[ColumnMeta],
    ) -> Self {
        if !primary_keys.is_empty() {
            return KeyStrategy::PrimaryKeys(primary_keys.to_vec());
        }
        if let Some(column) = mapping.get(source_name) {
            return KeyStrategy::MappedColumn(column.clone());
        }
        let column = columns
            .iter()
            .find(|c| c.column_type.is_key_candidate())
            .or_else(|| columns.first())
            .map(|c| c.name.clone())
            .unwrap_or_default();
        KeyStrategy::FallbackColumn(column)
    }

    /// Derive the identity portion of the cache key for one row.
    pub fn identity(&self, row: &SourceRow) -> String {
        match self {
            KeyStrategy::PrimaryKeys(columns) => columns
                .iter()
                .map(|c| {
                    row.get(c)
                        .map(|v| v.to_key_segment())
                        .unwrap_or_else(|| "null".to_string())
                })
                .collect::<Vec<_>>()
                .join(":"),
            KeyStrategy::MappedColumn(column) | KeyStrategy::FallbackColumn(column) => row
                .get(column)
                .map(|v| v.to_key_segment())
                .unwrap_or_else(|| "null".to_string()),
        }
    }

    /// Full cache key: `<database>:<source>:<identity>`.
    pub fn cache_key(&self, database: &str, source: &str, row: &SourceRow) -> String {
        format!("{database}:{source}:{}", self.identity(row))
    }
}
