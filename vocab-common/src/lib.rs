//! # Vocab Common Library
//!
//! Shared code for the vocabulary curation service including:
//! - Cell value normalization (scalars, JSON-encoded arrays, native arrays)
//! - Controlled vocabulary index and JSON-LD schema extraction
//! - Similarity scoring and ranked correction suggestions
//! - Confidence policy (auto-accept / escalate / auto-reject)
//! - Column to schema attribute mapping
//! - Configuration loading
//!
//! Everything in this crate is synchronous and free of I/O apart from
//! configuration file loading. Evaluation of independent columns can be
//! spread across threads by the caller.

pub mod columns;
pub mod config;
pub mod correction;
pub mod error;
pub mod policy;
pub mod record;
pub mod schema;
pub mod similarity;
pub mod value;
pub mod vocabulary;

pub use correction::{ArrayMatchMode, ColumnReport, CorrectionEngine, CorrectionSuggestion};
pub use error::{Error, Result};
pub use policy::{CorrectionDisposition, CorrectionPolicy, PolicyThresholds};
pub use record::CorrectionRecord;
pub use similarity::{MatchCandidate, SimilarityMetric, SimilarityScorer};
pub use value::{NormalizedValue, RawValue, RowKey, ValueShape};
pub use vocabulary::{VocabularyCatalog, VocabularyEntry, VocabularyIndex, VocabularyLookup};
