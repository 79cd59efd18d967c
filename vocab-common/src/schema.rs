//! JSON-LD schema extraction
//!
//! Builds a [`VocabularyCatalog`] from a JSON-LD data model document. Valid
//! values of an attribute come from `schema:rangeIncludes`, from the
//! `rdfs:oneOf` list of its `rdfs:range` class, and from
//! `sms:validationRules`.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

use crate::vocabulary::{VocabularyCatalog, VocabularyEntry, VocabularyIndex};
use crate::{Error, Result};

const DISPLAY_NAME: &str = "sms:displayName";
const LABEL: &str = "rdfs:label";
const NAME: &str = "schema:name";
const RANGE_INCLUDES: &str = "schema:rangeIncludes";
const RANGE: &str = "rdfs:range";
const ONE_OF: &str = "rdfs:oneOf";
const VALIDATION_RULES: &str = "sms:validationRules";

type Node = Map<String, Value>;

/// Parse a JSON-LD document into a vocabulary catalog
///
/// Fails with [`Error::Schema`] when the text is not JSON or has no
/// `@graph` array. Attributes without any valid values are left out of the
/// catalog.
pub fn parse_jsonld(text: &str) -> Result<VocabularyCatalog> {
    let document: Value = serde_json::from_str(text)
        .map_err(|e| Error::Schema(format!("invalid JSON-LD document: {}", e)))?;

    let graph = document
        .get("@graph")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Schema("document has no @graph array".to_string()))?;

    let nodes: Vec<&Node> = graph.iter().filter_map(Value::as_object).collect();

    let mut display_names: HashMap<&str, String> = HashMap::new();
    let mut by_id: HashMap<&str, &Node> = HashMap::new();
    for &node in &nodes {
        if let Some(id) = node_id(node) {
            display_names.insert(id, display_name(node, id));
            by_id.entry(id).or_insert(node);
        }
    }

    let mut catalog = VocabularyCatalog::new();
    for &node in &nodes {
        let attribute = match attribute_name(node) {
            Some(name) => name,
            None => continue,
        };

        let mut values = Vec::new();

        for id in reference_ids(node.get(RANGE_INCLUDES)) {
            if let Some(label) = display_names.get(id) {
                values.push(VocabularyEntry::new(id, label.clone()));
            }
        }

        let range_class = node
            .get(RANGE)
            .and_then(Value::as_object)
            .and_then(|range| range.get("@id"))
            .and_then(Value::as_str)
            .and_then(|range_id| by_id.get(range_id));
        if let Some(class) = range_class {
            for id in reference_ids(class.get(ONE_OF)) {
                if let Some(label) = display_names.get(id) {
                    values.push(VocabularyEntry::new(id, label.clone()));
                }
            }
        }

        if let Some(rules) = node.get(VALIDATION_RULES).and_then(Value::as_array) {
            for rule in rules.iter().filter_map(Value::as_str) {
                values.push(VocabularyEntry::new(rule, rule));
            }
        }

        if !values.is_empty() {
            catalog.insert(attribute, VocabularyIndex::build(values));
        }
    }

    tracing::info!(
        nodes = nodes.len(),
        attributes = catalog.len(),
        "Extracted controlled vocabularies"
    );

    Ok(catalog)
}

/// Read and parse a JSON-LD file
pub fn load_jsonld(path: &Path) -> Result<VocabularyCatalog> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        Error::Schema(format!("cannot read schema file {}: {}", path.display(), e))
    })?;
    parse_jsonld(&text)
}

fn node_id(node: &Node) -> Option<&str> {
    node.get("@id").and_then(Value::as_str)
}

fn string_field<'a>(node: &'a Node, key: &str) -> Option<&'a str> {
    node.get(key).and_then(Value::as_str)
}

/// `prefix:Name` → `Name`
fn id_suffix(id: &str) -> &str {
    id.rsplit(':').next().unwrap_or(id)
}

fn display_name(node: &Node, id: &str) -> String {
    string_field(node, DISPLAY_NAME)
        .or_else(|| string_field(node, LABEL))
        .or_else(|| string_field(node, NAME))
        .unwrap_or_else(|| id_suffix(id))
        .to_string()
}

fn attribute_name(node: &Node) -> Option<String> {
    string_field(node, DISPLAY_NAME)
        .or_else(|| string_field(node, LABEL))
        .or_else(|| node_id(node).map(id_suffix))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// `@id`s of the `{"@id": ...}` objects in a list field
fn reference_ids(field: Option<&Value>) -> impl Iterator<Item = &str> {
    field
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| item.get("@id").and_then(Value::as_str))
}
