//! Similarity scoring against a controlled vocabulary
//!
//! Every entry is scored against the input value (best of label and id),
//! boosted for substring containment, then ranked descending with ties kept
//! in vocabulary order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::vocabulary::{match_key, VocabularyEntry};

/// Added when the value is a substring of the entry label
pub const VALUE_IN_LABEL_BOOST: f64 = 0.2;

/// Added when the entry label is a substring of the value
pub const LABEL_IN_VALUE_BOOST: f64 = 0.1;

/// String similarity measure used for the base score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Longest-matching-blocks ratio `2M / (|a| + |b|)`
    #[default]
    Ratio,
    /// Normalized Levenshtein similarity
    Levenshtein,
}

impl SimilarityMetric {
    /// Similarity of two already-normalized strings in [0, 1]
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        match self {
            SimilarityMetric::Ratio => matching_blocks_ratio(a, b),
            SimilarityMetric::Levenshtein => strsim::normalized_levenshtein(a, b),
        }
    }
}

/// One ranked vocabulary entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub entry: VocabularyEntry,
    /// Base similarity plus boost (not clamped, range [0, 1.2])
    pub score: f64,
    /// Human-readable base similarity, e.g. "Similarity: 0.83"
    pub reason: String,
}

/// Scores a value against vocabulary entries
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityScorer {
    metric: SimilarityMetric,
}

impl SimilarityScorer {
    pub fn new(metric: SimilarityMetric) -> Self {
        Self { metric }
    }

    /// Score `value` against every entry, ranked by score descending
    ///
    /// The sort is stable, so equal scores keep vocabulary order.
    pub fn score(&self, value: &str, entries: &[VocabularyEntry]) -> Vec<MatchCandidate> {
        let value = match_key(value);

        let mut candidates: Vec<MatchCandidate> = entries
            .iter()
            .map(|entry| {
                let label = match_key(&entry.label);
                let id = match_key(&entry.id);

                let base = self
                    .metric
                    .similarity(&value, &label)
                    .max(self.metric.similarity(&value, &id));

                MatchCandidate {
                    entry: entry.clone(),
                    score: base + substring_boost(&value, &label),
                    reason: format!("Similarity: {:.2}", base),
                }
            })
            .collect();

        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        candidates
    }
}

/// Containment boost; at most one of the two boosts applies
fn substring_boost(value: &str, label: &str) -> f64 {
    if label.contains(value) {
        VALUE_IN_LABEL_BOOST
    } else if value.contains(label) {
        LABEL_IN_VALUE_BOOST
    } else {
        0.0
    }
}

// ============================================================================
// Longest-matching-blocks ratio
// ============================================================================

/// Ratcliff/Obershelp similarity over Unicode scalar values
///
/// Finds the longest common block, recurses on both sides of it, and returns
/// `2 * matched / (len_a + len_b)`. Two empty strings are identical (1.0).
pub fn matching_blocks_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let matched = matched_chars(&a, &b);
    2.0 * matched as f64 / total as f64
}

fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }

    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`
///
/// Ties resolve to the block starting earliest in `a`, then earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    let width = bhi - blo;

    // current[j - blo + 1] = length of the common run ending at a[i], b[j]
    let mut previous = vec![0usize; width + 1];
    let mut current = vec![0usize; width + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let slot = j - blo + 1;
            if a[i] == b[j] {
                let k = previous[slot - 1] + 1;
                current[slot] = k;
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
            } else {
                current[slot] = 0;
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }

    (best_i, best_j, best_k)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_ratio_known_values() {
        assert!(approx(matching_blocks_ratio("", ""), 1.0));
        assert!(approx(matching_blocks_ratio("abc", ""), 0.0));
        assert!(approx(matching_blocks_ratio("abcd", "abcd"), 1.0));
        // "schwan" + "oma" = 9 matched of 19
        assert!(approx(matching_blocks_ratio("schwanoma", "schwannoma"), 18.0 / 19.0));
        // difflib: SequenceMatcher(None, "abcd", "bcde").ratio() == 0.75
        assert!(approx(matching_blocks_ratio("abcd", "bcde"), 0.75));
    }

    #[test]
    fn test_ratio_is_symmetric_for_simple_inputs() {
        let pairs = [("fibroma", "fibrosarcoma"), ("glioma", "glioblastoma")];
        for (a, b) in pairs {
            assert!(approx(matching_blocks_ratio(a, b), matching_blocks_ratio(b, a)));
        }
    }

    #[test]
    fn test_ratio_counts_unicode_scalars() {
        assert!(approx(matching_blocks_ratio("café", "cafe"), 0.75));
    }

    #[test]
    fn test_value_in_label_boost() {
        let scorer = SimilarityScorer::default();
        let entries = vec![VocabularyEntry::new("x1", "Neurofibroma")];
        let ranked = scorer.score("fibroma", &entries);
        let base = matching_blocks_ratio("fibroma", "neurofibroma");
        assert!(approx(ranked[0].score, base + VALUE_IN_LABEL_BOOST));
        assert_eq!(ranked[0].reason, format!("Similarity: {:.2}", base));
    }

    #[test]
    fn test_label_in_value_boost_only_when_first_fails() {
        let scorer = SimilarityScorer::default();
        let entries = vec![VocabularyEntry::new("x1", "Glioma")];
        let ranked = scorer.score("low grade glioma", &entries);
        let base = matching_blocks_ratio("low grade glioma", "glioma")
            .max(matching_blocks_ratio("low grade glioma", "x1"));
        assert!(approx(ranked[0].score, base + LABEL_IN_VALUE_BOOST));
    }

    #[test]
    fn test_identical_value_gets_single_boost() {
        let scorer = SimilarityScorer::default();
        let entries = vec![VocabularyEntry::new("g", "Glioma")];
        let ranked = scorer.score("glioma", &entries);
        assert!(approx(ranked[0].score, 1.0 + VALUE_IN_LABEL_BOOST));
    }

    #[test]
    fn test_ties_keep_vocabulary_order() {
        let scorer = SimilarityScorer::default();
        let entries = vec![
            VocabularyEntry::new("1", "zzz"),
            VocabularyEntry::new("2", "yyy"),
            VocabularyEntry::new("3", "abc"),
            VocabularyEntry::new("4", "www"),
        ];
        let ranked = scorer.score("abc", &entries);
        let ids: Vec<&str> = ranked.iter().map(|c| c.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2", "4"]);
    }

    #[test]
    fn test_id_similarity_can_win() {
        let scorer = SimilarityScorer::default();
        let entries = vec![VocabularyEntry::new("NF1", "Neurofibromatosis type 1")];
        let ranked = scorer.score("nf1", &entries);
        assert!(ranked[0].reason.starts_with("Similarity: 1.00"));
    }

    #[test]
    fn test_levenshtein_metric() {
        let scorer = SimilarityScorer::new(SimilarityMetric::Levenshtein);
        let entries = vec![VocabularyEntry::new("s", "Schwannoma")];
        let ranked = scorer.score("Schwanoma", &entries);
        assert!(approx(ranked[0].score, 0.9));
    }
}
