//! Core data types for cache-sync.
//!
//! This module provides the fundamental types used throughout cache-sync for
//! representing rows fetched from a relational source, independent of any
//! specific database client.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::sync::Arc;

/// A scalar value fetched from a source column.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl SourceValue {
    /// Render the value the way it appears inside a cache key.
    ///
    /// Identity keys are plain text, so every variant formats to a stable,
    /// deterministic string. Null becomes the literal `null` rather than an
    /// empty segment so a missing value is still visible in the key.
    pub fn to_key_segment(&self) -> String {
        match self {
            SourceValue::Null => "null".to_string(),
            SourceValue::Bool(b) => b.to_string(),
            SourceValue::Int(i) => i.to_string(),
            SourceValue::Float(f) => f.to_string(),
            SourceValue::String(s) => s.clone(),
            SourceValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            SourceValue::DateTime(dt) => dt.to_rfc3339(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            SourceValue::Null => serde_json::Value::Null,
            SourceValue::Bool(b) => serde_json::Value::Bool(*b),
            SourceValue::Int(i) => serde_json::Value::from(*i),
            SourceValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                // Non-finite floats have no JSON form; fall back to text.
                .unwrap_or_else(|| serde_json::Value::String(f.to_string())),
            SourceValue::String(s) => serde_json::Value::String(s.clone()),
            SourceValue::Date(d) => {
                serde_json::Value::String(d.format("%Y-%m-%d").to_string())
            }
            SourceValue::DateTime(dt) => serde_json::Value::String(dt.to_rfc3339()),
        }
    }
}

impl fmt::Display for SourceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_key_segment())
    }
}

/// Declared type of a source column, reduced to the categories the sync
/// engine cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Bool,
    Int,
    BigInt,
    Float,
    String,
    Date,
    DateTime,
    /// Any source type without a dedicated category; carries the source's
    /// own type name for diagnostics.
    Other(String),
}

impl ColumnType {
    /// Whether a column of this type qualifies for the fallback identity-key
    /// heuristic: integer, long-integer, or date/time columns do.
    pub fn is_key_candidate(&self) -> bool {
        matches!(
            self,
            ColumnType::Int | ColumnType::BigInt | ColumnType::Date | ColumnType::DateTime
        )
    }
}

/// Name and declared type of one source column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    pub name: String,
    pub column_type: ColumnType,
}

/// One row fetched from a source, with its column metadata.
///
/// Column order is the source's natural order; the metadata is shared across
/// all rows of a batch.
#[derive(Debug, Clone)]
pub struct SourceRow {
    columns: Arc<[ColumnMeta]>,
    values: Vec<SourceValue>,
}

impl SourceRow {
    pub fn new(columns: Arc<[ColumnMeta]>, values: Vec<SourceValue>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        SourceRow { columns, values }
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    /// Look up a value by column name.
    pub fn get(&self, column: &str) -> Option<&SourceValue> {
        self.columns
            .iter()
            .position(|c| c.name == column)
            .map(|i| &self.values[i])
    }

    /// Serialize the row to its canonical textual form: a JSON object whose
    /// keys appear in the source's column order. This text is what the codec
    /// compacts and compresses.
    pub fn to_canonical_json(&self) -> String {
        let mut map = serde_json::Map::with_capacity(self.columns.len());
        for (column, value) in self.columns.iter().zip(&self.values) {
            map.insert(column.name.clone(), value.to_json());
        }
        serde_json::Value::Object(map).to_string()
    }
}

/// A table or view selected for one sync cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncTarget {
    pub schema: String,
    pub name: String,
    pub is_table: bool,
}

impl fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn columns() -> Arc<[ColumnMeta]> {
        vec![
            ColumnMeta {
                name: "id".to_string(),
                column_type: ColumnType::Int,
            },
            ColumnMeta {
                name: "name".to_string(),
                column_type: ColumnType::String,
            },
            ColumnMeta {
                name: "created".to_string(),
                column_type: ColumnType::DateTime,
            },
            ColumnMeta {
                name: "note".to_string(),
                column_type: ColumnType::String,
            },
        ]
        .into()
    }

    #[test]
    fn canonical_json_preserves_column_order_and_null() {
        let row = SourceRow::new(
            columns(),
            vec![
                SourceValue::Int(7),
                SourceValue::String("widget".to_string()),
                SourceValue::DateTime(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
                SourceValue::Null,
            ],
        );
        assert_eq!(
            row.to_canonical_json(),
            r#"{"id":7,"name":"widget","created":"2024-05-01T12:00:00+00:00","note":null}"#
        );
    }

    #[test]
    fn lookup_by_column_name() {
        let row = SourceRow::new(
            columns(),
            vec![
                SourceValue::Int(7),
                SourceValue::String("widget".to_string()),
                SourceValue::Null,
                SourceValue::Null,
            ],
        );
        assert_eq!(row.get("id"), Some(&SourceValue::Int(7)));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn key_candidate_types() {
        assert!(ColumnType::Int.is_key_candidate());
        assert!(ColumnType::BigInt.is_key_candidate());
        assert!(ColumnType::DateTime.is_key_candidate());
        assert!(ColumnType::Date.is_key_candidate());
        assert!(!ColumnType::String.is_key_candidate());
        assert!(!ColumnType::Float.is_key_candidate());
        assert!(!ColumnType::Bool.is_key_candidate());
    }

    #[test]
    fn key_segment_rendering() {
        assert_eq!(SourceValue::Null.to_key_segment(), "null");
        assert_eq!(SourceValue::Int(-3).to_key_segment(), "-3");
        assert_eq!(
            SourceValue::Date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()).to_key_segment(),
            "2024-05-01"
        );
    }
}
