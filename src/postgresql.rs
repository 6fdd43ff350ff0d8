//! PostgreSQL implementation of the relational-source contract.
//!
//! Metadata comes from the standard `information_schema` views, so the
//! queries stay portable across PostgreSQL versions. Row fetches are plain
//! `SELECT * ... LIMIT n` with type-aware conversion of each column into a
//! [`SourceValue`].

use crate::source::{RelationalSource, SourceMode};
use crate::types::{ColumnMeta, ColumnType, SourceRow, SourceValue, SyncTarget};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::sync::Arc;
use tokio_postgres::types::Type;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error};

/// An open PostgreSQL connection plus the task driving its socket.
pub struct PostgresSource {
    client: Client,
    database: String,
    connection_task: tokio::task::JoinHandle<()>,
}

impl PostgresSource {
    /// Connect using a libpq-style connection string or URL.
    pub async fn connect(conn_string: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(conn_string, NoTls)
            .await
            .context("failed to open PostgreSQL connection")?;

        // The connection object performs the actual I/O and must be polled
        // for the client to make progress.
        let connection_task = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("PostgreSQL connection error: {e}");
            }
        });

        let row = client
            .query_one("SELECT current_database()", &[])
            .await
            .context("failed to resolve database name")?;
        let database: String = row.get(0);

        Ok(PostgresSource {
            client,
            database,
            connection_task,
        })
    }
}

impl Drop for PostgresSource {
    fn drop(&mut self) {
        self.connection_task.abort();
    }
}

#[async_trait]
impl RelationalSource for PostgresSource {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn list_targets(&self, mode: SourceMode) -> Result<Vec<SyncTarget>> {
        let (query, is_table) = match mode {
            SourceMode::Tables => (
                "SELECT table_schema, table_name
                 FROM information_schema.tables
                 WHERE table_type = 'BASE TABLE'
                   AND table_schema NOT IN ('pg_catalog', 'information_schema')",
                true,
            ),
            SourceMode::Views => (
                "SELECT table_schema, table_name
                 FROM information_schema.views
                 WHERE table_schema NOT IN ('pg_catalog', 'information_schema')",
                false,
            ),
        };

        let rows = self.client.query(query, &[]).await?;
        Ok(rows
            .iter()
            .map(|row| SyncTarget {
                schema: row.get(0),
                name: row.get(1),
                is_table,
            })
            .collect())
    }

    async fn primary_key_columns(&self, schema: &str, name: &str) -> Result<Vec<String>> {
        let query = "
            SELECT kcu.column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
            WHERE tc.table_schema = $1
              AND tc.table_name = $2
              AND tc.constraint_type = 'PRIMARY KEY'
            ORDER BY kcu.ordinal_position";

        let rows = self.client.query(query, &[&schema, &name]).await?;
        Ok(rows.iter().map(|row| row.get::<_, String>(0)).collect())
    }

    async fn fetch_top_rows(&self, schema: &str, name: &str, limit: u32) -> Result<Vec<SourceRow>> {
        // Schema and name come from information_schema, not user input;
        // quoting guards against names needing case preservation.
        let query = format!("SELECT * FROM \"{schema}\".\"{name}\" LIMIT {limit}");
        debug!("Fetching rows with: {query}");
        let rows = self.client.query(&query, &[]).await?;

        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };

        let columns: Arc<[ColumnMeta]> = first
            .columns()
            .iter()
            .map(|c| ColumnMeta {
                name: c.name().to_string(),
                column_type: column_type_from_pg(c.type_()),
            })
            .collect::<Vec<_>>()
            .into();

        rows.iter()
            .map(|row| {
                let values = (0..columns.len())
                    .map(|i| convert_postgres_value(row, i))
                    .collect::<Result<Vec<_>>>()?;
                Ok(SourceRow::new(Arc::clone(&columns), values))
            })
            .collect()
    }
}

/// Reduce a PostgreSQL type to the engine's column-type categories.
fn column_type_from_pg(pg_type: &Type) -> ColumnType {
    match *pg_type {
        Type::BOOL => ColumnType::Bool,
        Type::INT2 | Type::INT4 => ColumnType::Int,
        Type::INT8 => ColumnType::BigInt,
        Type::FLOAT4 | Type::FLOAT8 | Type::NUMERIC => ColumnType::Float,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => ColumnType::String,
        Type::DATE => ColumnType::Date,
        Type::TIMESTAMP | Type::TIMESTAMPTZ => ColumnType::DateTime,
        ref other => ColumnType::Other(other.name().to_string()),
    }
}

/// Convert one column of a fetched row to a [`SourceValue`].
fn convert_postgres_value(row: &Row, index: usize) -> Result<SourceValue> {
    let column = &row.columns()[index];

    let value = match *column.type_() {
        Type::BOOL => match row.try_get::<_, Option<bool>>(index)? {
            Some(b) => SourceValue::Bool(b),
            None => SourceValue::Null,
        },
        Type::INT2 => match row.try_get::<_, Option<i16>>(index)? {
            Some(i) => SourceValue::Int(i as i64),
            None => SourceValue::Null,
        },
        Type::INT4 => match row.try_get::<_, Option<i32>>(index)? {
            Some(i) => SourceValue::Int(i as i64),
            None => SourceValue::Null,
        },
        Type::INT8 => match row.try_get::<_, Option<i64>>(index)? {
            Some(i) => SourceValue::Int(i),
            None => SourceValue::Null,
        },
        Type::FLOAT4 => match row.try_get::<_, Option<f32>>(index)? {
            Some(f) => SourceValue::Float(f as f64),
            None => SourceValue::Null,
        },
        Type::FLOAT8 => match row.try_get::<_, Option<f64>>(index)? {
            Some(f) => SourceValue::Float(f),
            None => SourceValue::Null,
        },
        Type::NUMERIC => match row.try_get::<_, Option<rust_decimal::Decimal>>(index)? {
            // Render as text to keep full precision in the payload.
            Some(d) => SourceValue::String(d.to_string()),
            None => SourceValue::Null,
        },
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            match row.try_get::<_, Option<String>>(index)? {
                Some(s) => SourceValue::String(s),
                None => SourceValue::Null,
            }
        }
        Type::DATE => match row.try_get::<_, Option<NaiveDate>>(index)? {
            Some(d) => SourceValue::Date(d),
            None => SourceValue::Null,
        },
        Type::TIMESTAMP => match row.try_get::<_, Option<NaiveDateTime>>(index)? {
            Some(ndt) => SourceValue::DateTime(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc)),
            None => SourceValue::Null,
        },
        Type::TIMESTAMPTZ => match row.try_get::<_, Option<DateTime<Utc>>>(index)? {
            Some(dt) => SourceValue::DateTime(dt),
            None => SourceValue::Null,
        },
        ref other => {
            // Anything without a dedicated category syncs as its text form
            // when the driver can produce one.
            match row.try_get::<_, Option<String>>(index) {
                Ok(Some(s)) => SourceValue::String(s),
                Ok(None) => SourceValue::Null,
                Err(_) => anyhow::bail!(
                    "unsupported PostgreSQL type '{}' for column '{}'",
                    other.name(),
                    column.name()
                ),
            }
        }
    };

    Ok(value)
}
