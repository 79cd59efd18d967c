//! Column to attribute mapping
//!
//! Decides which schema attribute (if any) governs a table column. Platform
//! bookkeeping columns are skipped before any name matching.

use serde::{Deserialize, Serialize};

use crate::vocabulary::{match_key, VocabularyCatalog};

/// Bookkeeping columns never curated
pub const SYSTEM_COLUMNS: &[&str] = &[
    "name",
    "type",
    "id",
    "etag",
    "createdOn",
    "modifiedOn",
    "createdBy",
    "modifiedBy",
    "parentId",
    "currentVersion",
    "benefactorId",
    "projectId",
    "concreteType",
    "versionNumber",
    "versionLabel",
    "versionComment",
    "dataFileHandleId",
    "columnId",
    "ROW_ID",
    "ROW_VERSION",
    "ROW_ETAG",
    "entityId",
    "fundingAgency",
    "accessType",
];

/// Substrings marking a column as an identifier or version column
const SKIP_SUBSTRINGS: &[&str] = &["id", "version"];

/// Why a column was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Listed system column or identifier/version-like name
    SystemColumn,
    /// Listed in the `[columns] skip` configuration
    Configured,
}

/// Mapping decision for one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mapping", content = "detail")]
pub enum ColumnMapping {
    Mapped(String),
    Skipped(SkipReason),
    Unmapped,
}

/// Maps columns onto catalog attributes
#[derive(Debug, Clone, Default)]
pub struct ColumnMapper {
    extra_skip: Vec<String>,
}

impl ColumnMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Additional columns to skip (case-insensitive)
    pub fn with_skip_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extra_skip = columns.into_iter().map(|c| match_key(c.as_ref())).collect();
        self
    }

    /// Decide the attribute for `column`
    ///
    /// Exact (case-insensitive, trimmed) name matches win; otherwise the first
    /// attribute in catalog order where either name contains the other.
    pub fn map_column(&self, column: &str, catalog: &VocabularyCatalog) -> ColumnMapping {
        let key = match_key(column);

        if is_system_column(&key) {
            tracing::debug!(column = %column, "Skipping system column");
            return ColumnMapping::Skipped(SkipReason::SystemColumn);
        }
        if self.extra_skip.contains(&key) {
            tracing::debug!(column = %column, "Skipping configured column");
            return ColumnMapping::Skipped(SkipReason::Configured);
        }

        if let Some(attribute) = catalog
            .attribute_names()
            .find(|attribute| match_key(attribute) == key)
        {
            tracing::debug!(column = %column, attribute = %attribute, "Exact column match");
            return ColumnMapping::Mapped(attribute.to_string());
        }

        if let Some(attribute) = catalog.attribute_names().find(|attribute| {
            let attribute = match_key(attribute);
            attribute.contains(&key) || key.contains(&attribute)
        }) {
            tracing::debug!(column = %column, attribute = %attribute, "Partial column match");
            return ColumnMapping::Mapped(attribute.to_string());
        }

        tracing::debug!(column = %column, "No attribute for column");
        ColumnMapping::Unmapped
    }
}

fn is_system_column(key: &str) -> bool {
    SYSTEM_COLUMNS.iter().any(|c| c.to_lowercase() == key)
        || SKIP_SUBSTRINGS.iter().any(|s| key.contains(s))
}
