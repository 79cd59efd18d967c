//! SQLite record store
//!
//! Rows are keyed by SQLite `rowid`. Table and column names are checked
//! against a plain-identifier pattern and against `PRAGMA table_info` before
//! they are placed into SQL text.
//!
//! Cell updates and their `corrections_log` entries share one transaction.

use serde_json::json;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool, ValueRef};
use vocab_common::{RawValue, RowKey};

use crate::collaborators::{AppliedCorrection, RecordStore};
use crate::db::log;
use crate::error::{CurationError, CurationResult};

/// [`RecordStore`] over tables in a SQLite database
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Canonical column name, or an error if the table/column is unknown
    async fn resolve_column(&self, table: &str, column: &str) -> CurationResult<String> {
        check_identifier(column)?;
        let columns = self.list_columns(table).await?;
        columns
            .into_iter()
            .find(|c| c.eq_ignore_ascii_case(column))
            .ok_or_else(|| CurationError::NotFound(format!("column {}.{}", table, column)))
    }
}

/// Validate a table or column name (prevents SQL injection)
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() < 100
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_identifier(name: &str) -> CurationResult<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(CurationError::InvalidIdentifier(name.to_string()))
    }
}

/// Convert one SQLite cell to a raw value
fn cell_value(row: &SqliteRow, index: usize) -> RawValue {
    match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return RawValue::Null,
        Ok(_) => {}
        Err(_) => return RawValue::Null,
    }

    if let Ok(text) = row.try_get::<String, _>(index) {
        return RawValue::Text(text);
    }
    if let Ok(n) = row.try_get::<i64, _>(index) {
        return RawValue::Other(json!(n));
    }
    if let Ok(f) = row.try_get::<f64, _>(index) {
        return RawValue::Other(json!(f));
    }

    tracing::debug!(index, "Unsupported cell type (blob?), treating as null");
    RawValue::Null
}

#[async_trait::async_trait]
impl RecordStore for SqliteRecordStore {
    async fn list_columns(&self, table: &str) -> CurationResult<Vec<String>> {
        check_identifier(table)?;

        let rows = sqlx::query(&format!("PRAGMA table_info(\"{}\")", table))
            .fetch_all(&self.pool)
            .await?;

        if rows.is_empty() {
            return Err(CurationError::NotFound(format!("table {}", table)));
        }

        // PRAGMA table_info returns: (cid, name, type, notnull, dflt_value, pk)
        Ok(rows.iter().map(|row| row.get::<String, _>(1)).collect())
    }

    async fn read_column(
        &self,
        table: &str,
        column: &str,
    ) -> CurationResult<Vec<(RowKey, RawValue)>> {
        let column = self.resolve_column(table, column).await?;

        let sql = format!(
            "SELECT rowid, \"{}\" FROM \"{}\" ORDER BY rowid",
            column, table
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut values = Vec::with_capacity(rows.len());
        for row in &rows {
            let row_key: i64 = row.try_get(0)?;
            values.push((row_key, cell_value(row, 1)));
        }

        tracing::debug!(table = %table, column = %column, rows = values.len(), "Column read");
        Ok(values)
    }

    async fn write_corrections(
        &self,
        table: &str,
        column: &str,
        corrections: &[AppliedCorrection],
    ) -> CurationResult<u64> {
        if corrections.is_empty() {
            return Ok(0);
        }
        let column = self.resolve_column(table, column).await?;

        let sql = format!("UPDATE \"{}\" SET \"{}\" = ? WHERE rowid = ?", table, column);

        let mut tx = self.pool.begin().await?;
        let mut updated = 0;
        for correction in corrections {
            let record = &correction.record;
            let result = sqlx::query(&sql)
                .bind(record.selected_value.to_cell_text())
                .bind(record.row_index)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() > 0 {
                log::insert_entry(&mut tx, table, record, &correction.disposition).await?;
            }
            updated += result.rows_affected();
        }
        // Dropping the transaction on an early return rolls everything back
        tx.commit().await?;

        tracing::info!(table = %table, column = %column, updated, "Corrections written");
        Ok(updated)
    }
}
