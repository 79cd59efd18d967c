//! Controlled vocabulary index
//!
//! A [`VocabularyIndex`] holds the valid terms for one attribute. A
//! [`VocabularyCatalog`] maps attribute names to their indexes and is the
//! immutable snapshot a schema provider hands out.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single valid term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    /// Term identifier (unique within an index)
    pub id: String,
    /// Display label
    pub label: String,
}

impl VocabularyEntry {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Comparison key used for membership: lowercase, trimmed
pub fn match_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Valid values for one attribute
///
/// Read-only after construction. Entries keep insertion order for display;
/// membership ignores case and surrounding whitespace and matches either the
/// label or the id.
#[derive(Debug, Clone, Default)]
pub struct VocabularyIndex {
    entries: Vec<VocabularyEntry>,
    keys: HashSet<String>,
}

impl VocabularyIndex {
    /// Build an index from entries
    ///
    /// Duplicate ids keep the first occurrence; later ones are dropped with a
    /// debug log. Entries sharing a label under different ids are kept as
    /// distinct targets.
    pub fn build(entries: impl IntoIterator<Item = VocabularyEntry>) -> Self {
        let mut seen_ids = HashSet::new();
        let mut kept = Vec::new();
        let mut keys = HashSet::new();

        for entry in entries {
            if !seen_ids.insert(entry.id.clone()) {
                tracing::debug!(id = %entry.id, label = %entry.label, "Dropping duplicate vocabulary entry");
                continue;
            }
            keys.insert(match_key(&entry.label));
            keys.insert(match_key(&entry.id));
            kept.push(entry);
        }

        Self {
            entries: kept,
            keys,
        }
    }

    /// True if `value` equals any entry's label or id (case-insensitive, trimmed)
    pub fn contains(&self, value: &str) -> bool {
        self.keys.contains(&match_key(value))
    }

    /// All entries in insertion order
    pub fn all_entries(&self) -> &[VocabularyEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Result of looking an attribute up in a schema
#[derive(Debug, Clone)]
pub enum VocabularyLookup {
    /// The attribute has a controlled vocabulary (possibly empty)
    Found(VocabularyIndex),
    /// The attribute has no controlled vocabulary in this schema
    NotFound,
}

/// Attribute name → vocabulary index, in schema order
#[derive(Debug, Clone, Default)]
pub struct VocabularyCatalog {
    attributes: Vec<(String, VocabularyIndex)>,
}

impl VocabularyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an attribute's vocabulary
    pub fn insert(&mut self, attribute: impl Into<String>, index: VocabularyIndex) {
        let attribute = attribute.into();
        let key = match_key(&attribute);
        if let Some(slot) = self
            .attributes
            .iter_mut()
            .find(|(name, _)| match_key(name) == key)
        {
            slot.1 = index;
        } else {
            self.attributes.push((attribute, index));
        }
    }

    /// Case-insensitive, trimmed attribute lookup
    pub fn lookup(&self, attribute: &str) -> VocabularyLookup {
        let key = match_key(attribute);
        self.attributes
            .iter()
            .find(|(name, _)| match_key(name) == key)
            .map(|(_, index)| VocabularyLookup::Found(index.clone()))
            .unwrap_or(VocabularyLookup::NotFound)
    }

    /// Attribute names in schema order
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}
