//! Corrections log
//!
//! Append-only record of every correction written to a table, in the
//! exported interchange shape plus how it was decided. Entries are written
//! by [`SqliteRecordStore`](super::SqliteRecordStore) together with the
//! cell update.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqliteConnection, SqlitePool};
use vocab_common::CorrectionRecord;

use crate::error::CurationResult;

/// A logged correction
#[derive(Debug, Clone, Serialize)]
pub struct LoggedCorrection {
    pub id: i64,
    pub table_name: String,
    #[serde(flatten)]
    pub record: CorrectionRecord,
    /// `auto_accept`, `auto_accept_audit`, `review_accept` or `review_replace`
    pub disposition: String,
    pub applied_at: DateTime<Utc>,
}

/// Append one entry on `conn`
///
/// Called by the record store inside the transaction that writes the cell,
/// so a row is never updated without its log entry.
pub(crate) async fn insert_entry(
    conn: &mut SqliteConnection,
    table: &str,
    record: &CorrectionRecord,
    disposition: &str,
) -> CurationResult<()> {
    sqlx::query(
        r#"
        INSERT INTO corrections_log (
            table_name, row_index, column_name, original_value,
            suggested_values, selected_value, reason, disposition, applied_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(table)
    .bind(record.row_index)
    .bind(&record.column_name)
    .bind(serde_json::to_string(&record.original_value)?)
    .bind(serde_json::to_string(&record.suggested_values)?)
    .bind(serde_json::to_string(&record.selected_value)?)
    .bind(&record.reason)
    .bind(disposition)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Read access to the `corrections_log` table
#[derive(Clone)]
pub struct CorrectionLog {
    pool: SqlitePool,
}

impl CorrectionLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Logged corrections, newest first
    pub async fn list(
        &self,
        table: Option<&str>,
        limit: i64,
    ) -> CurationResult<Vec<LoggedCorrection>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM corrections_log
            WHERE (?1 IS NULL OR table_name = ?1)
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )
        .bind(table)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut logged = Vec::with_capacity(rows.len());
        for row in &rows {
            let applied_at: String = row.try_get("applied_at")?;
            logged.push(LoggedCorrection {
                id: row.try_get("id")?,
                table_name: row.try_get("table_name")?,
                record: CorrectionRecord {
                    row_index: row.try_get("row_index")?,
                    column_name: row.try_get("column_name")?,
                    original_value: serde_json::from_str(row.try_get("original_value")?)?,
                    suggested_values: serde_json::from_str(row.try_get("suggested_values")?)?,
                    selected_value: serde_json::from_str(row.try_get("selected_value")?)?,
                    reason: row.try_get("reason")?,
                },
                disposition: row.try_get("disposition")?,
                applied_at: DateTime::parse_from_rfc3339(&applied_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| {
                        vocab_common::Error::InvalidInput(format!(
                            "bad timestamp {}: {}",
                            applied_at, e
                        ))
                    })?,
            });
        }

        Ok(logged)
    }
}
