//! Collaborator interfaces around the correction engine
//!
//! The workflow only talks to these traits, so the SQLite store, the JSON-LD
//! provider and the review queue can be swapped for other backends (or test
//! doubles) without touching it.

use std::sync::Arc;
use vocab_common::{
    CorrectionDisposition, CorrectionRecord, CorrectionSuggestion, RawValue, RowKey,
    VocabularyCatalog, VocabularyLookup,
};

use crate::error::CurationResult;

/// Resolves attribute names to controlled vocabularies
#[async_trait::async_trait]
pub trait SchemaProvider: Send + Sync {
    /// Current immutable catalog snapshot
    async fn catalog(&self) -> Arc<VocabularyCatalog>;

    /// Valid values for one attribute
    ///
    /// `NotFound` means the schema has no controlled vocabulary for the
    /// attribute; it is not an error.
    async fn get_valid_values(&self, attribute: &str) -> VocabularyLookup {
        self.catalog().await.lookup(attribute)
    }
}

/// A correction to write and how it was decided
///
/// The row is `record.row_index`; the new value is `record.selected_value`.
#[derive(Debug, Clone)]
pub struct AppliedCorrection {
    pub record: CorrectionRecord,
    /// `auto_accept`, `auto_accept_audit`, `review_accept` or `review_replace`
    pub disposition: String,
}

/// Reads and writes cells of named tables
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Column names of a table, in table order
    async fn list_columns(&self, table: &str) -> CurationResult<Vec<String>>;

    /// All cells of one column, keyed by row
    async fn read_column(&self, table: &str, column: &str)
        -> CurationResult<Vec<(RowKey, RawValue)>>;

    /// Replace cell values and journal each updated row, all or nothing
    ///
    /// Returns the number of rows updated.
    async fn write_corrections(
        &self,
        table: &str,
        column: &str,
        corrections: &[AppliedCorrection],
    ) -> CurationResult<u64>;
}

/// Defers low-confidence suggestions to a human or secondary oracle
#[async_trait::async_trait]
pub trait DecisionEscalator: Send + Sync {
    /// Ask for a judgment on `suggestion`
    ///
    /// Returning `Escalate` means the decision is still pending.
    async fn request_judgment(
        &self,
        table: &str,
        suggestion: &CorrectionSuggestion,
        confidence: f64,
    ) -> CurationResult<CorrectionDisposition>;
}
