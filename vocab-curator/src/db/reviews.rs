//! Review queue
//!
//! Escalated suggestions wait here until a reviewer accepts, replaces or
//! rejects them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;
use vocab_common::{CorrectionDisposition, CorrectionSuggestion, MatchCandidate, RawValue, RowKey};

use crate::collaborators::DecisionEscalator;
use crate::error::{CurationError, CurationResult};

/// Lifecycle of a review item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Accepted,
    Replaced,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Accepted => "accepted",
            ReviewStatus::Replaced => "replaced",
            ReviewStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReviewStatus::Pending),
            "accepted" => Some(ReviewStatus::Accepted),
            "replaced" => Some(ReviewStatus::Replaced),
            "rejected" => Some(ReviewStatus::Rejected),
            _ => None,
        }
    }
}

/// One escalated suggestion
#[derive(Debug, Clone, Serialize)]
pub struct ReviewItem {
    pub id: Uuid,
    pub table_name: String,
    pub column_name: String,
    pub row_key: RowKey,
    pub original_value: RawValue,
    pub candidates: Vec<MatchCandidate>,
    /// Candidates rebuilt in the cell's shape, best first
    pub suggested_values: Vec<RawValue>,
    pub selected_value: RawValue,
    pub confidence: f64,
    pub reason: String,
    pub status: ReviewStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_value: Option<RawValue>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// [`DecisionEscalator`] that parks suggestions in the `review_queue` table
#[derive(Clone)]
pub struct ReviewQueueEscalator {
    pool: SqlitePool,
}

impl ReviewQueueEscalator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a suggestion as a pending review item
    pub async fn enqueue(
        &self,
        table: &str,
        suggestion: &CorrectionSuggestion,
        confidence: f64,
    ) -> CurationResult<Uuid> {
        let id = Uuid::new_v4();
        let original = serde_json::to_string(&suggestion.original_value)?;
        let candidates = serde_json::to_string(&suggestion.candidates)?;
        let suggested = serde_json::to_string(&suggestion.suggested)?;
        let selected = serde_json::to_string(&suggestion.selected)?;

        sqlx::query(
            r#"
            INSERT INTO review_queue (
                id, table_name, column_name, row_key, original_value,
                candidates, suggested_values, selected_value, confidence, reason,
                status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(id.to_string())
        .bind(table)
        .bind(&suggestion.column_name)
        .bind(suggestion.row_key)
        .bind(&original)
        .bind(&candidates)
        .bind(&suggested)
        .bind(&selected)
        .bind(confidence)
        .bind(&suggestion.reason)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Review items, oldest first, optionally filtered by status
    pub async fn list(&self, status: Option<ReviewStatus>) -> CurationResult<Vec<ReviewItem>> {
        let rows = match status {
            Some(status) => {
                sqlx::query("SELECT * FROM review_queue WHERE status = ? ORDER BY created_at, rowid")
                    .bind(status.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT * FROM review_queue ORDER BY created_at, rowid")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(review_from_row).collect()
    }

    pub async fn get(&self, id: Uuid) -> CurationResult<Option<ReviewItem>> {
        let row = sqlx::query("SELECT * FROM review_queue WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(review_from_row).transpose()
    }

    /// Mark a pending item resolved
    ///
    /// Fails with `Conflict` when the item was already resolved.
    pub async fn resolve(
        &self,
        id: Uuid,
        status: ReviewStatus,
        resolved_value: Option<&RawValue>,
    ) -> CurationResult<()> {
        let resolved_value = resolved_value.map(serde_json::to_string).transpose()?;

        let result = sqlx::query(
            r#"
            UPDATE review_queue
            SET status = ?, resolved_value = ?, resolved_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(status.as_str())
        .bind(resolved_value)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CurationError::Conflict(format!(
                "review {} is not pending",
                id
            )));
        }
        Ok(())
    }

    /// Put a resolved item back to `pending`
    ///
    /// Undoes a [`resolve`](Self::resolve) whose correction could not be
    /// written. Only an item still in `status` is reopened.
    pub async fn reopen(&self, id: Uuid, status: ReviewStatus) -> CurationResult<()> {
        sqlx::query(
            r#"
            UPDATE review_queue
            SET status = 'pending', resolved_value = NULL, resolved_at = NULL
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(id.to_string())
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DecisionEscalator for ReviewQueueEscalator {
    async fn request_judgment(
        &self,
        table: &str,
        suggestion: &CorrectionSuggestion,
        confidence: f64,
    ) -> CurationResult<CorrectionDisposition> {
        let id = self.enqueue(table, suggestion, confidence).await?;
        tracing::info!(
            review_id = %id,
            table = %table,
            column = %suggestion.column_name,
            row_key = suggestion.row_key,
            confidence,
            "Correction escalated for review"
        );
        Ok(CorrectionDisposition::Escalate)
    }
}

fn parse_timestamp(value: &str) -> CurationResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            vocab_common::Error::InvalidInput(format!("bad timestamp {}: {}", value, e)).into()
        })
}

fn review_from_row(row: &SqliteRow) -> CurationResult<ReviewItem> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let resolved_value: Option<String> = row.try_get("resolved_value")?;
    let created_at: String = row.try_get("created_at")?;
    let resolved_at: Option<String> = row.try_get("resolved_at")?;

    Ok(ReviewItem {
        id: Uuid::parse_str(&id)
            .map_err(|e| vocab_common::Error::InvalidInput(format!("bad review id: {}", e)))?,
        table_name: row.try_get("table_name")?,
        column_name: row.try_get("column_name")?,
        row_key: row.try_get("row_key")?,
        original_value: serde_json::from_str(row.try_get("original_value")?)?,
        candidates: serde_json::from_str(row.try_get("candidates")?)?,
        suggested_values: serde_json::from_str(row.try_get("suggested_values")?)?,
        selected_value: serde_json::from_str(row.try_get("selected_value")?)?,
        confidence: row.try_get("confidence")?,
        reason: row.try_get("reason")?,
        status: ReviewStatus::parse(&status).ok_or_else(|| {
            vocab_common::Error::InvalidInput(format!("unknown review status {}", status))
        })?,
        resolved_value: resolved_value
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?,
        created_at: parse_timestamp(&created_at)?,
        resolved_at: resolved_at.as_deref().map(parse_timestamp).transpose()?,
    })
}
