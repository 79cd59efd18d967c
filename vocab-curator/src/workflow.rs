//! Curation workflow
//!
//! One run over a table:
//! 1. List the columns (or take the requested ones)
//! 2. Map each column to a schema attribute
//! 3. Look up the attribute's controlled vocabulary
//! 4. Read and evaluate each column on a blocking worker (one per column)
//! 5. Classify every suggestion: accept, escalate or reject
//! 6. Write accepted corrections (the store logs them in the same transaction)
//!
//! Reviewer decisions on escalated items are applied by [`resolve_review`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use vocab_common::columns::{ColumnMapper, ColumnMapping, SkipReason};
use vocab_common::correction::UnmappableCell;
use vocab_common::{
    ColumnReport, CorrectionDisposition, CorrectionEngine, CorrectionPolicy, CorrectionRecord,
    CorrectionSuggestion, RawValue, VocabularyLookup,
};

use crate::collaborators::{AppliedCorrection, DecisionEscalator, RecordStore, SchemaProvider};
use crate::db::{ReviewItem, ReviewQueueEscalator, ReviewStatus};
use crate::error::{CurationError, CurationResult};

// ============================================================================
// Requests and reports
// ============================================================================

/// Parameters of one run
#[derive(Debug, Clone, Deserialize)]
pub struct CurationRequest {
    pub table: String,
    /// Columns to curate; all table columns when absent or empty
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    /// Evaluate and classify, but write nothing
    #[serde(default)]
    pub dry_run: bool,
}

impl CurationRequest {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: None,
            dry_run: false,
        }
    }
}

/// What happened to a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnStatus {
    Evaluated,
    Skipped,
    Unmapped,
    NoVocabulary,
}

/// Per-column result of a run
#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub status: ColumnStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    pub evaluated: usize,
    pub valid: usize,
    pub suggestions: usize,
    /// Auto-accepted (including audit-flagged)
    pub accepted: usize,
    pub audited: usize,
    pub escalated: usize,
    pub rejected: usize,
    /// Rows actually updated (0 for dry runs)
    pub applied: u64,
    pub unmappable: Vec<UnmappableCell>,
}

impl ColumnSummary {
    fn new(column: String, status: ColumnStatus) -> Self {
        Self {
            column,
            status,
            attribute: None,
            skip_reason: None,
            evaluated: 0,
            valid: 0,
            suggestions: 0,
            accepted: 0,
            audited: 0,
            escalated: 0,
            rejected: 0,
            applied: 0,
            unmappable: Vec::new(),
        }
    }
}

/// Exported correction with its policy outcome
#[derive(Debug, Clone, Serialize)]
pub struct ExportedCorrection {
    #[serde(flatten)]
    pub record: CorrectionRecord,
    pub confidence: f64,
    pub disposition: String,
}

/// Result of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub table: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub columns: Vec<ColumnSummary>,
    pub records: Vec<ExportedCorrection>,
}

impl RunReport {
    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.column == name)
    }

    /// Total rows updated across columns
    pub fn applied(&self) -> u64 {
        self.columns.iter().map(|c| c.applied).sum()
    }
}

// ============================================================================
// Workflow
// ============================================================================

pub struct CurationWorkflow {
    schema: Arc<dyn SchemaProvider>,
    store: Arc<dyn RecordStore>,
    escalator: Arc<dyn DecisionEscalator>,
    engine: CorrectionEngine,
    policy: CorrectionPolicy,
    mapper: ColumnMapper,
}

impl CurationWorkflow {
    pub fn new(
        schema: Arc<dyn SchemaProvider>,
        store: Arc<dyn RecordStore>,
        escalator: Arc<dyn DecisionEscalator>,
    ) -> Self {
        Self {
            schema,
            store,
            escalator,
            engine: CorrectionEngine::default(),
            policy: CorrectionPolicy::default(),
            mapper: ColumnMapper::default(),
        }
    }

    pub fn with_engine(mut self, engine: CorrectionEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_policy(mut self, policy: CorrectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_mapper(mut self, mapper: ColumnMapper) -> Self {
        self.mapper = mapper;
        self
    }

    /// Run the workflow over one table
    pub async fn run(&self, request: &CurationRequest) -> CurationResult<RunReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let table = request.table.as_str();

        info!(run_id = %run_id, table = %table, dry_run = request.dry_run, "Curation run started");

        let columns = match &request.columns {
            Some(columns) if !columns.is_empty() => columns.clone(),
            _ => self.store.list_columns(table).await?,
        };

        // One snapshot for the whole run, even if the schema reloads meanwhile
        let catalog = self.schema.catalog().await;

        let mut summaries = Vec::with_capacity(columns.len());
        let mut pending = Vec::new();

        for column in columns {
            let attribute = match self.mapper.map_column(&column, &catalog) {
                ColumnMapping::Mapped(attribute) => attribute,
                ColumnMapping::Skipped(reason) => {
                    let mut summary = ColumnSummary::new(column, ColumnStatus::Skipped);
                    summary.skip_reason = Some(reason);
                    summaries.push(summary);
                    continue;
                }
                ColumnMapping::Unmapped => {
                    summaries.push(ColumnSummary::new(column, ColumnStatus::Unmapped));
                    continue;
                }
            };

            let vocabulary = match catalog.lookup(&attribute) {
                VocabularyLookup::Found(index) => index,
                VocabularyLookup::NotFound => {
                    info!(column = %column, attribute = %attribute, "No controlled vocabulary, skipping column");
                    let mut summary = ColumnSummary::new(column, ColumnStatus::NoVocabulary);
                    summary.attribute = Some(attribute);
                    summaries.push(summary);
                    continue;
                }
            };

            let values = self.store.read_column(table, &column).await?;

            let engine = self.engine;
            let name = column.clone();
            let handle = tokio::task::spawn_blocking(move || {
                engine.evaluate_column(&name, &values, &vocabulary)
            });

            let mut summary = ColumnSummary::new(column, ColumnStatus::Evaluated);
            summary.attribute = Some(attribute);
            summaries.push(summary);
            pending.push((summaries.len() - 1, handle));
        }

        let mut records = Vec::new();
        for (slot, handle) in pending {
            let report = handle.await?;
            self.apply_column(table, request.dry_run, report, &mut summaries[slot], &mut records)
                .await?;
        }

        let report = RunReport {
            run_id,
            table: table.to_string(),
            dry_run: request.dry_run,
            started_at,
            finished_at: Utc::now(),
            columns: summaries,
            records,
        };

        info!(
            run_id = %run_id,
            table = %table,
            columns = report.columns.len(),
            suggestions = report.records.len(),
            applied = report.applied(),
            "Curation run finished"
        );

        Ok(report)
    }

    /// Classify a column's suggestions and act on them
    ///
    /// Auto-accepted corrections are committed before anything is escalated,
    /// so a failed write never leaves review items behind.
    async fn apply_column(
        &self,
        table: &str,
        dry_run: bool,
        report: ColumnReport,
        summary: &mut ColumnSummary,
        records: &mut Vec<ExportedCorrection>,
    ) -> CurationResult<()> {
        summary.evaluated = report.evaluated;
        summary.valid = report.valid;
        summary.suggestions = report.suggestions.len();
        summary.unmappable = report.unmappable;

        let suggestions = report.suggestions;
        let column = summary.column.clone();

        let mut dispositions = suggestions
            .iter()
            .map(|s| self.policy.classify(s.confidence()))
            .collect::<vocab_common::Result<Vec<_>>>()?;

        if !dry_run {
            let accepted: Vec<usize> = (0..suggestions.len())
                .filter(|&i| dispositions[i].is_accept())
                .collect();
            summary.applied += self
                .write_batch(table, &column, &suggestions, &dispositions, &accepted)
                .await?;

            let mut judged = Vec::new();
            for (i, suggestion) in suggestions.iter().enumerate() {
                if dispositions[i] != CorrectionDisposition::Escalate {
                    continue;
                }
                let decision = self
                    .escalator
                    .request_judgment(table, suggestion, suggestion.confidence())
                    .await?;
                if decision.is_accept() {
                    judged.push(i);
                }
                dispositions[i] = decision;
            }
            summary.applied += self
                .write_batch(table, &column, &suggestions, &dispositions, &judged)
                .await?;
        }

        for (suggestion, disposition) in suggestions.iter().zip(&dispositions) {
            let confidence = suggestion.confidence();
            match disposition {
                CorrectionDisposition::AutoAccept { audit } => {
                    summary.accepted += 1;
                    if *audit {
                        summary.audited += 1;
                        warn!(
                            table = %table,
                            column = %suggestion.column_name,
                            row_key = suggestion.row_key,
                            confidence,
                            original = ?suggestion.original_value,
                            selected = ?suggestion.selected,
                            "Low-margin correction auto-accepted (audit)"
                        );
                    } else {
                        debug!(
                            column = %suggestion.column_name,
                            row_key = suggestion.row_key,
                            confidence,
                            "Correction auto-accepted"
                        );
                    }
                }
                CorrectionDisposition::Escalate => {
                    summary.escalated += 1;
                }
                CorrectionDisposition::AutoReject => {
                    summary.rejected += 1;
                    info!(
                        column = %suggestion.column_name,
                        row_key = suggestion.row_key,
                        confidence,
                        reason = %suggestion.reason,
                        "Correction rejected"
                    );
                }
            }

            records.push(ExportedCorrection {
                record: CorrectionRecord::from(suggestion),
                confidence,
                disposition: disposition.as_str().to_string(),
            });
        }

        info!(
            table = %table,
            column = %summary.column,
            evaluated = summary.evaluated,
            valid = summary.valid,
            accepted = summary.accepted,
            escalated = summary.escalated,
            rejected = summary.rejected,
            applied = summary.applied,
            unmappable = summary.unmappable.len(),
            "Column curated"
        );

        Ok(())
    }

    /// Write the suggestions at `indices` in one store transaction
    async fn write_batch(
        &self,
        table: &str,
        column: &str,
        suggestions: &[CorrectionSuggestion],
        dispositions: &[CorrectionDisposition],
        indices: &[usize],
    ) -> CurationResult<u64> {
        if indices.is_empty() {
            return Ok(0);
        }
        let corrections: Vec<AppliedCorrection> = indices
            .iter()
            .map(|&i| AppliedCorrection {
                record: CorrectionRecord::from(&suggestions[i]),
                disposition: dispositions[i].as_str().to_string(),
            })
            .collect();
        self.store.write_corrections(table, column, &corrections).await
    }
}

// ============================================================================
// Review resolution
// ============================================================================

/// Reviewer action on an escalated item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    /// Apply the suggested value
    Accept,
    /// Apply a reviewer-supplied value
    Replace,
    /// Discard the suggestion
    Reject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewDecision {
    pub action: ReviewAction,
    /// Replacement value (required for `replace`)
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

/// Apply a reviewer decision to a pending review item
///
/// Accepted and replaced values are written to the record store (which logs
/// them). If that write fails the item goes back to `pending`.
pub async fn resolve_review(
    reviews: &ReviewQueueEscalator,
    store: &dyn RecordStore,
    id: Uuid,
    decision: ReviewDecision,
) -> CurationResult<ReviewItem> {
    let item = reviews
        .get(id)
        .await?
        .ok_or_else(|| CurationError::NotFound(format!("review {}", id)))?;

    if item.status != ReviewStatus::Pending {
        return Err(CurationError::Conflict(format!(
            "review {} is already {}",
            id,
            item.status.as_str()
        )));
    }

    let (status, value, disposition) = match decision.action {
        ReviewAction::Accept => (
            ReviewStatus::Accepted,
            Some(item.selected_value.clone()),
            "review_accept",
        ),
        ReviewAction::Replace => {
            let value = decision.value.map(RawValue::from).ok_or_else(|| {
                vocab_common::Error::InvalidInput("replace requires a value".to_string())
            })?;
            if value.is_missing() {
                return Err(vocab_common::Error::InvalidInput(
                    "replacement value is empty".to_string(),
                )
                .into());
            }
            (ReviewStatus::Replaced, Some(value), "review_replace")
        }
        ReviewAction::Reject => (ReviewStatus::Rejected, None, "review_reject"),
    };

    // Claim the item first so concurrent decisions cannot both apply
    reviews.resolve(id, status, value.as_ref()).await?;

    if let Some(value) = value {
        let correction = AppliedCorrection {
            record: CorrectionRecord {
                row_index: item.row_key,
                column_name: item.column_name.clone(),
                original_value: item.original_value.clone(),
                suggested_values: item.suggested_values.clone(),
                selected_value: value,
                reason: item.reason.clone(),
            },
            disposition: disposition.to_string(),
        };

        if let Err(e) = store
            .write_corrections(&item.table_name, &item.column_name, &[correction])
            .await
        {
            warn!(review_id = %id, error = %e, "Review decision not applied, reopening item");
            if let Err(reopen) = reviews.reopen(id, status).await {
                error!(review_id = %id, error = %reopen, "Failed to reopen review item");
            }
            return Err(e);
        }
    }

    info!(
        review_id = %id,
        table = %item.table_name,
        column = %item.column_name,
        row_key = item.row_key,
        decision = disposition,
        "Review resolved"
    );

    reviews
        .get(id)
        .await?
        .ok_or_else(|| CurationError::NotFound(format!("review {}", id)))
}
