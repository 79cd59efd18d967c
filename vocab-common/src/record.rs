//! Exported correction record
//!
//! The serializable interchange shape of a correction, used by the
//! corrections log and audit exports.

use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::correction::CorrectionSuggestion;
use crate::value::{RawValue, RowKey};
use crate::Result;

/// One correction as exported for audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionRecord {
    pub row_index: RowKey,
    pub column_name: String,
    pub original_value: RawValue,
    /// Ranked candidates in the cell's own shape, best first
    pub suggested_values: Vec<RawValue>,
    pub selected_value: RawValue,
    pub reason: String,
}

impl From<&CorrectionSuggestion> for CorrectionRecord {
    fn from(suggestion: &CorrectionSuggestion) -> Self {
        Self {
            row_index: suggestion.row_key,
            column_name: suggestion.column_name.clone(),
            original_value: suggestion.original_value.clone(),
            suggested_values: suggestion.suggested.clone(),
            selected_value: suggestion.selected.clone(),
            reason: suggestion.reason.clone(),
        }
    }
}

/// Write records as a pretty-printed JSON array
pub fn export_json<W: Write>(records: &[CorrectionRecord], writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::MatchCandidate;
    use crate::vocabulary::VocabularyEntry;

    #[test]
    fn test_record_from_suggestion() {
        let suggestion = CorrectionSuggestion {
            row_key: 7,
            column_name: "tumorType".to_string(),
            original_value: RawValue::from("Schwanoma"),
            candidates: vec![
                MatchCandidate {
                    entry: VocabularyEntry::new("Schwannoma", "Schwannoma"),
                    score: 0.95,
                    reason: "Similarity: 0.95".to_string(),
                },
                MatchCandidate {
                    entry: VocabularyEntry::new("Fibroma", "Fibroma"),
                    score: 0.5,
                    reason: "Similarity: 0.50".to_string(),
                },
            ],
            suggested: vec![RawValue::from("Schwannoma"), RawValue::from("Fibroma")],
            selected: RawValue::from("Schwannoma"),
            reason: "Not a valid option for tumorType".to_string(),
        };

        let record = CorrectionRecord::from(&suggestion);
        assert_eq!(record.row_index, 7);
        assert_eq!(
            record.suggested_values,
            vec![RawValue::from("Schwannoma"), RawValue::from("Fibroma")]
        );
        assert_eq!(record.suggested_values[0], record.selected_value);

        let mut out = Vec::new();
        export_json(&[record], &mut out).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0]["selected_value"], "Schwannoma");
        assert_eq!(parsed[0]["original_value"], "Schwanoma");
    }
}
