//! Correction engine
//!
//! Evaluates the cells of one column against a vocabulary index. Valid cells
//! produce nothing; invalid cells produce a [`CorrectionSuggestion`] carrying
//! the ranked candidates and the top candidate rebuilt in the cell's original
//! shape.
//!
//! **Validity:** a scalar cell is valid when its value is in the vocabulary;
//! an array cell is valid only when every element is. A partially valid array
//! is flagged as a whole.

use serde::{Deserialize, Serialize};

use crate::similarity::{MatchCandidate, SimilarityMetric, SimilarityScorer};
use crate::value::{normalize, NormalizedValue, RawValue, RowKey};
use crate::vocabulary::VocabularyIndex;
use crate::{Error, Result};

/// Default number of ranked candidates kept per suggestion
pub const DEFAULT_MAX_MATCHES: usize = 3;

/// Which elements of an array cell are scored and replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayMatchMode {
    /// Score only the first element and replace it; keep the rest verbatim
    #[default]
    FirstElement,
    /// Replace every invalid element with its own top candidate
    EachElement,
}

/// Proposed replacement for one invalid cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionSuggestion {
    pub row_key: RowKey,
    pub column_name: String,
    pub original_value: RawValue,
    /// Ranked alternatives, never empty
    pub candidates: Vec<MatchCandidate>,
    /// Each candidate rebuilt in the original value's shape, best first
    pub suggested: Vec<RawValue>,
    /// Top candidate rebuilt in the original value's shape (`suggested[0]`)
    pub selected: RawValue,
    pub reason: String,
}

impl CorrectionSuggestion {
    /// Top candidate score clamped to [0, 1]
    pub fn confidence(&self) -> f64 {
        self.candidates
            .first()
            .map(|c| c.score.clamp(0.0, 1.0))
            .unwrap_or(0.0)
    }
}

/// A cell whose evaluation failed; siblings are unaffected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmappableCell {
    pub row_key: RowKey,
    pub original_value: RawValue,
    pub reason: String,
}

/// Outcome of evaluating one column
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnReport {
    pub column_name: String,
    /// Cells with an evaluable value
    pub evaluated: usize,
    /// Cells skipped as null, blank or empty arrays
    pub skipped: usize,
    /// Cells whose values are all in the vocabulary
    pub valid: usize,
    /// Invalid cells with nothing to suggest (empty vocabulary)
    pub unmatched: usize,
    pub suggestions: Vec<CorrectionSuggestion>,
    pub unmappable: Vec<UnmappableCell>,
}

/// Verdict for a single cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellVerdict {
    /// No evaluable value
    Skipped,
    Valid,
    /// Invalid, but the vocabulary is empty
    Unmatched,
    Invalid(CorrectionSuggestion),
}

/// Column evaluator
///
/// Holds only configuration; all inputs are passed per call, so one engine
/// can evaluate many columns from many threads.
#[derive(Debug, Clone, Copy)]
pub struct CorrectionEngine {
    max_matches: usize,
    array_mode: ArrayMatchMode,
    scorer: SimilarityScorer,
}

impl Default for CorrectionEngine {
    fn default() -> Self {
        Self {
            max_matches: DEFAULT_MAX_MATCHES,
            array_mode: ArrayMatchMode::default(),
            scorer: SimilarityScorer::default(),
        }
    }
}

impl CorrectionEngine {
    /// Create an engine keeping at most `max_matches` candidates per suggestion
    pub fn new(max_matches: usize) -> Result<Self> {
        if max_matches == 0 {
            return Err(Error::InvalidInput(
                "max_matches must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_matches,
            ..Self::default()
        })
    }

    pub fn with_array_mode(mut self, mode: ArrayMatchMode) -> Self {
        self.array_mode = mode;
        self
    }

    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.scorer = SimilarityScorer::new(metric);
        self
    }

    pub fn max_matches(&self) -> usize {
        self.max_matches
    }

    pub fn array_mode(&self) -> ArrayMatchMode {
        self.array_mode
    }

    /// Evaluate every cell of a column
    ///
    /// A failing cell is recorded as unmappable and evaluation continues with
    /// the next one.
    pub fn evaluate_column(
        &self,
        column_name: &str,
        values: &[(RowKey, RawValue)],
        vocabulary: &VocabularyIndex,
    ) -> ColumnReport {
        let mut report = ColumnReport {
            column_name: column_name.to_string(),
            ..ColumnReport::default()
        };

        for (row_key, raw) in values {
            match self.evaluate_cell(*row_key, column_name, raw, vocabulary) {
                Ok(CellVerdict::Skipped) => report.skipped += 1,
                Ok(CellVerdict::Valid) => {
                    report.evaluated += 1;
                    report.valid += 1;
                }
                Ok(CellVerdict::Unmatched) => {
                    report.evaluated += 1;
                    report.unmatched += 1;
                }
                Ok(CellVerdict::Invalid(suggestion)) => {
                    report.evaluated += 1;
                    report.suggestions.push(suggestion);
                }
                Err(e) => {
                    tracing::warn!(column = %column_name, row_key, error = %e, "Cell could not be evaluated");
                    report.evaluated += 1;
                    report.unmappable.push(UnmappableCell {
                        row_key: *row_key,
                        original_value: raw.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::debug!(
            column = %column_name,
            evaluated = report.evaluated,
            valid = report.valid,
            suggestions = report.suggestions.len(),
            unmappable = report.unmappable.len(),
            "Column evaluated"
        );

        report
    }

    /// Evaluate one cell
    pub fn evaluate_cell(
        &self,
        row_key: RowKey,
        column_name: &str,
        raw: &RawValue,
        vocabulary: &VocabularyIndex,
    ) -> Result<CellVerdict> {
        if raw.is_missing() {
            return Ok(CellVerdict::Skipped);
        }
        let normalized = match normalize(raw) {
            Some(n) => n,
            None => return Ok(CellVerdict::Skipped),
        };

        let invalid_positions: Vec<usize> = normalized
            .scalars
            .iter()
            .enumerate()
            .filter(|(_, s)| !vocabulary.contains(s))
            .map(|(i, _)| i)
            .collect();

        // Scalars only ever have position 0
        if invalid_positions.is_empty() {
            return Ok(CellVerdict::Valid);
        }
        if vocabulary.is_empty() {
            return Ok(CellVerdict::Unmatched);
        }

        let (candidates, suggested) = match self.array_mode {
            ArrayMatchMode::FirstElement => self.replace_first(&normalized, vocabulary)?,
            ArrayMatchMode::EachElement => {
                self.replace_each(&normalized, &invalid_positions, vocabulary)?
            }
        };
        let selected = suggested
            .first()
            .cloned()
            .ok_or_else(|| Error::InvalidInput("no candidates to select from".to_string()))?;

        Ok(CellVerdict::Invalid(CorrectionSuggestion {
            row_key,
            column_name: column_name.to_string(),
            original_value: raw.clone(),
            candidates,
            suggested,
            selected,
            reason: format!("Not a valid option for {}", column_name),
        }))
    }

    fn ranked(&self, value: &str, vocabulary: &VocabularyIndex) -> Vec<MatchCandidate> {
        let mut ranked = self.scorer.score(value, vocabulary.all_entries());
        ranked.truncate(self.max_matches);
        ranked
    }

    /// Rank the first element; each candidate replaces it in turn
    fn replace_first(
        &self,
        normalized: &NormalizedValue,
        vocabulary: &VocabularyIndex,
    ) -> Result<(Vec<MatchCandidate>, Vec<RawValue>)> {
        let candidates = self.ranked(normalized.first(), vocabulary);
        let suggested = candidates
            .iter()
            .map(|c| normalized.with_replacements(&[(0, c.entry.label.clone())]))
            .collect::<Result<Vec<_>>>()?;
        Ok((candidates, suggested))
    }

    /// Replace every invalid element with its top candidate
    ///
    /// Alternatives vary the first invalid element only; the others keep
    /// their top candidate.
    fn replace_each(
        &self,
        normalized: &NormalizedValue,
        invalid_positions: &[usize],
        vocabulary: &VocabularyIndex,
    ) -> Result<(Vec<MatchCandidate>, Vec<RawValue>)> {
        let mut reported = Vec::new();
        let mut replacements = Vec::with_capacity(invalid_positions.len());

        for &position in invalid_positions {
            let candidates = self.ranked(&normalized.scalars[position], vocabulary);
            replacements.push((position, top_label(&candidates)?));
            if reported.is_empty() {
                reported = candidates;
            }
        }

        let mut suggested = Vec::with_capacity(reported.len());
        for candidate in &reported {
            replacements[0].1 = candidate.entry.label.clone();
            suggested.push(normalized.with_replacements(&replacements)?);
        }
        Ok((reported, suggested))
    }
}

fn top_label(candidates: &[MatchCandidate]) -> Result<String> {
    candidates
        .first()
        .map(|c| c.entry.label.clone())
        .ok_or_else(|| Error::InvalidInput("no candidates to select from".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::VocabularyEntry;
    use serde_json::json;

    fn vocabulary() -> VocabularyIndex {
        VocabularyIndex::build(vec![
            VocabularyEntry::new("Schwannoma", "Schwannoma"),
            VocabularyEntry::new("Fibroma", "Fibroma"),
            VocabularyEntry::new("Glioma", "Glioma"),
            VocabularyEntry::new("Meningioma", "Meningioma"),
        ])
    }

    fn suggestion(verdict: CellVerdict) -> CorrectionSuggestion {
        match verdict {
            CellVerdict::Invalid(s) => s,
            other => panic!("expected a suggestion, got {:?}", other),
        }
    }

    #[test]
    fn test_new_rejects_zero_matches() {
        assert!(matches!(CorrectionEngine::new(0), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_candidates_truncated_to_max_matches() {
        let engine = CorrectionEngine::new(2).unwrap();
        let s = suggestion(
            engine
                .evaluate_cell(1, "tumorType", &RawValue::from("Schwanoma"), &vocabulary())
                .unwrap(),
        );
        assert_eq!(s.candidates.len(), 2);
        assert_eq!(s.candidates[0].entry.label, "Schwannoma");
        assert_eq!(s.reason, "Not a valid option for tumorType");
        assert_eq!(s.suggested.len(), 2);
    }

    #[test]
    fn test_partially_valid_array_is_flagged_whole() {
        let engine = CorrectionEngine::default();
        let raw = RawValue::from(r#"["Fibroma", "Glyoma"]"#);
        let s = suggestion(engine.evaluate_cell(1, "t", &raw, &vocabulary()).unwrap());
        // first element is scored even though it is the valid one
        assert_eq!(s.candidates[0].entry.label, "Fibroma");
        assert_eq!(s.selected, RawValue::Text(r#"["Fibroma","Glyoma"]"#.to_string()));
    }

    #[test]
    fn test_each_element_mode_replaces_all_invalid() {
        let engine = CorrectionEngine::default().with_array_mode(ArrayMatchMode::EachElement);
        let raw = RawValue::List(vec![json!("Fibroma"), json!("Glyoma"), json!("Meningoma")]);
        let s = suggestion(engine.evaluate_cell(4, "t", &raw, &vocabulary()).unwrap());
        assert_eq!(
            s.selected,
            RawValue::List(vec![json!("Fibroma"), json!("Glioma"), json!("Meningioma")])
        );
        assert_eq!(s.candidates[0].entry.label, "Glioma");
        assert_eq!(s.suggested[0], s.selected);
        for (candidate, alternative) in s.candidates.iter().zip(&s.suggested) {
            assert_eq!(
                alternative,
                &RawValue::List(vec![
                    json!("Fibroma"),
                    json!(candidate.entry.label),
                    json!("Meningioma"),
                ])
            );
        }
    }

    #[test]
    fn test_suggested_values_keep_json_array_shape() {
        let engine = CorrectionEngine::default();
        let raw = RawValue::from(r#"["Schwanoma","Fibroma"]"#);
        let s = suggestion(engine.evaluate_cell(1, "t", &raw, &vocabulary()).unwrap());
        assert_eq!(s.selected, RawValue::from(r#"["Schwannoma","Fibroma"]"#));
        assert_eq!(s.suggested[0], s.selected);
        assert_eq!(s.suggested.len(), s.candidates.len());
        for (candidate, alternative) in s.candidates.iter().zip(&s.suggested) {
            let expected = format!(r#"["{}","Fibroma"]"#, candidate.entry.label);
            assert_eq!(alternative, &RawValue::Text(expected));
        }
    }

    #[test]
    fn test_suggested_values_keep_native_list_shape() {
        let engine = CorrectionEngine::default();
        let raw = RawValue::List(vec![json!("Glyoma"), json!(3)]);
        let s = suggestion(engine.evaluate_cell(1, "t", &raw, &vocabulary()).unwrap());
        assert_eq!(s.selected, RawValue::List(vec![json!("Glioma"), json!(3)]));
        assert_eq!(s.suggested[0], s.selected);
        assert!(s.suggested.iter().all(|v| matches!(v, RawValue::List(items) if items.len() == 2)));
    }

    #[test]
    fn test_non_string_scalar_is_scored_as_text() {
        let engine = CorrectionEngine::default();
        let s = suggestion(
            engine
                .evaluate_cell(2, "t", &RawValue::Other(json!(42)), &vocabulary())
                .unwrap(),
        );
        assert!(matches!(s.selected, RawValue::Text(_)));
    }

    #[test]
    fn test_verdicts_for_skipped_and_unmatched() {
        let engine = CorrectionEngine::default();
        let empty = VocabularyIndex::build(vec![]);
        assert_eq!(
            engine.evaluate_cell(1, "t", &RawValue::from(" "), &vocabulary()).unwrap(),
            CellVerdict::Skipped
        );
        assert_eq!(
            engine.evaluate_cell(1, "t", &RawValue::from("[]"), &vocabulary()).unwrap(),
            CellVerdict::Skipped
        );
        assert_eq!(
            engine.evaluate_cell(1, "t", &RawValue::from("x"), &empty).unwrap(),
            CellVerdict::Unmatched
        );
    }

    #[test]
    fn test_column_report_counts() {
        let engine = CorrectionEngine::default();
        let values = vec![
            (1, RawValue::from("Fibroma")),
            (2, RawValue::Null),
            (3, RawValue::from("Schwanoma")),
            (4, RawValue::from("glioma ")),
        ];
        let report = engine.evaluate_column("tumorType", &values, &vocabulary());
        assert_eq!(report.column_name, "tumorType");
        assert_eq!(report.evaluated, 3);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.valid, 2);
        assert_eq!(report.suggestions.len(), 1);
        assert_eq!(report.suggestions[0].row_key, 3);
        assert!(report.unmappable.is_empty());
    }

    #[test]
    fn test_confidence_is_clamped() {
        let engine = CorrectionEngine::default();
        // "fibrom" is a substring of "fibroma": boosted past 1.0
        let s = suggestion(
            engine
                .evaluate_cell(1, "t", &RawValue::from("Fibrom"), &vocabulary())
                .unwrap(),
        );
        assert!(s.candidates[0].score > 1.0);
        assert_eq!(s.confidence(), 1.0);
    }
}
