//! Scratch tables handed between resolver passes.
//!
//! Both are fully memory-resident while their producing and consuming passes
//! run; their size grows with the number of statement nodes, not triples.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Statement-node id → predicate token of the edge that declared it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntermediateNodes(AHashMap<String, String>);

impl IntermediateNodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, node: String, predicate_token: String) {
        self.0.insert(node, predicate_token);
    }

    pub fn owner(&self, node: &str) -> Option<&str> {
        self.0.get(node).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Subject → object → predicate token of the resolved primary fact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupTable(AHashMap<String, AHashMap<String, String>>);

impl DedupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resolved fact; returns the token previously stored for the pair.
    pub fn record(&mut self, subject: &str, object: &str, predicate_token: &str) -> Option<String> {
        self.0
            .entry(subject.to_string())
            .or_default()
            .insert(object.to_string(), predicate_token.to_string())
    }

    pub fn get(&self, subject: &str, object: &str) -> Option<&str> {
        self.0
            .get(subject)
            .and_then(|objects| objects.get(object))
            .map(String::as_str)
    }

    /// `(object, predicate token)` pairs recorded under `subject`.
    pub fn objects_of<'a>(&'a self, subject: &str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.0
            .get(subject)
            .into_iter()
            .flat_map(|objects| objects.iter().map(|(o, p)| (o.as_str(), p.as_str())))
    }

    pub fn contains_subject(&self, subject: &str) -> bool {
        self.0.contains_key(subject)
    }

    /// Number of recorded `(subject, object)` pairs.
    pub fn len(&self) -> usize {
        self.0.values().map(|objects| objects.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_serialize_as_plain_json_objects() {
        let mut nodes = IntermediateNodes::new();
        nodes.declare("Q1-abc".to_string(), "P6-0".to_string());
        let json = serde_json::to_string(&nodes).unwrap();
        assert_eq!(json, r#"{"Q1-abc":"P6-0"}"#);

        let mut dedup = DedupTable::new();
        assert_eq!(dedup.record("Q1", "Q2", "P6-0"), None);
        assert_eq!(dedup.record("Q1", "Q2", "P6-0").as_deref(), Some("P6-0"));
        let json = serde_json::to_string(&dedup).unwrap();
        assert_eq!(json, r#"{"Q1":{"Q2":"P6-0"}}"#);
        let back: DedupTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("Q1", "Q2"), Some("P6-0"));
        assert_eq!(back.len(), 1);
    }

    #[test]
    fn objects_of_unknown_subject_is_empty() {
        let dedup = DedupTable::new();
        assert_eq!(dedup.objects_of("Q1").count(), 0);
        assert!(!dedup.contains_subject("Q1"));
    }

    #[test]
    fn len_counts_pairs_across_subjects() {
        let mut dedup = DedupTable::new();
        assert!(dedup.is_empty());
        dedup.record("Q1", "Q2", "P6-0");
        dedup.record("Q1", "Q5", "P31-0");
        dedup.record("Q3", "Q2", "P6-1");
        assert_eq!(dedup.record("Q1", "Q2", "P6-2"), Some("P6-0".to_string()));
        assert_eq!(dedup.len(), 3);
        assert!(!dedup.is_empty());
    }
}
