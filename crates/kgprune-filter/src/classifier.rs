//! Discovery scan for external-identifier and geo properties.
//!
//! Properties declare their value type with
//! `<…/entity/P214> <http://wikiba.se/ontology#propertyType> <…#ExternalId> .`;
//! one read-only pass over the dump collects those declarations.

use crate::FilterError;
use kgprune_ntriples::{parse_line, split_fields, vocab, LineReader};
use kgprune_storage::SpecialPredicates;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

/// Object fields shorter than this (line ending stripped, ` .` kept) are
/// treated as truncated. No value-type declaration is that short.
pub const MIN_OBJECT_FIELD_LEN: usize = 34;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifierReport {
    pub lines: u64,
    pub malformed: u64,
    pub truncated: u64,
    pub external_ids: usize,
    pub geo: usize,
}

#[derive(Debug, Default)]
pub struct PredicateClassifier {
    sets: SpecialPredicates,
    report: ClassifierReport,
}

impl PredicateClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_line(&mut self, line: &str) {
        self.report.lines += 1;
        let Some((_, predicate, object)) = split_fields(line) else {
            self.report.malformed += 1;
            return;
        };
        if object.len() < MIN_OBJECT_FIELD_LEN {
            self.report.truncated += 1;
            return;
        }
        if predicate.strip_prefix('<').and_then(|p| p.strip_suffix('>')) != Some(vocab::PROPERTY_TYPE) {
            return;
        }

        let triple = match parse_line(line) {
            Ok(triple) => triple,
            Err(err) => {
                self.report.malformed += 1;
                tracing::debug!(error = %err, "skipping malformed declaration");
                return;
            }
        };
        let (Some(property), Some(value_type)) = (triple.subject.as_iri(), triple.object.as_iri())
        else {
            return;
        };
        let property_id = vocab::local_id(property);

        match value_type {
            vocab::EXTERNAL_ID_TYPE => {
                self.sets.external_ids.insert(property_id.to_string());
            }
            vocab::GEO_SHAPE_TYPE | vocab::GLOBE_COORDINATE_TYPE => {
                self.sets.geo.insert(property_id.to_string());
            }
            _ => {}
        }
    }

    pub fn scan<R: BufRead>(&mut self, reader: R) -> io::Result<()> {
        let mut lines = LineReader::new(reader);
        while let Some((_, line)) = lines.next_line()? {
            self.observe_line(&line);
        }
        Ok(())
    }

    pub fn finish(self) -> (SpecialPredicates, ClassifierReport) {
        let Self { sets, mut report } = self;
        report.external_ids = sets.external_ids.len();
        report.geo = sets.geo.len();
        (sets, report)
    }
}

pub fn classify_dump(path: &Path) -> Result<(SpecialPredicates, ClassifierReport), FilterError> {
    let started = Instant::now();
    tracing::info!(dump = %path.display(), "classifying predicates");

    let file = File::open(path).map_err(|e| FilterError::io(path, e))?;
    let mut classifier = PredicateClassifier::new();
    classifier
        .scan(BufReader::new(file))
        .map_err(|e| FilterError::io(path, e))?;
    let (sets, report) = classifier.finish();

    tracing::info!(
        lines = report.lines,
        malformed = report.malformed,
        truncated = report.truncated,
        external_ids = report.external_ids,
        geo = report.geo,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "classification finished"
    );
    Ok((sets, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use std::io::Cursor;

    fn declaration(property: &str, value_type: &str) -> String {
        format!(
            "<http://www.wikidata.org/entity/{property}> <{}> <http://wikiba.se/ontology#{value_type}> .",
            vocab::PROPERTY_TYPE
        )
    }

    fn classify(lines: &[String]) -> (SpecialPredicates, ClassifierReport) {
        let mut classifier = PredicateClassifier::new();
        classifier
            .scan(Cursor::new(lines.join("\n")))
            .expect("in-memory scan");
        classifier.finish()
    }

    #[test]
    fn collects_declared_value_types() {
        let (sets, report) = classify(&[
            declaration("P214", "ExternalId"),
            declaration("P625", "GlobeCoordinate"),
            declaration("P3896", "GeoShape"),
            declaration("P17", "WikibaseItem"),
            declaration("P214", "ExternalId"),
        ]);
        assert_eq!(sets.external_ids, BTreeSet::from(["P214".to_string()]));
        assert_eq!(
            sets.geo,
            BTreeSet::from(["P3896".to_string(), "P625".to_string()])
        );
        assert_eq!(report.lines, 5);
        assert_eq!(report.external_ids, 1);
        assert_eq!(report.geo, 2);
    }

    #[test]
    fn short_and_malformed_lines_are_skipped() {
        let (sets, report) = classify(&[
            "<http://www.wikidata.org/entity/Q1> <http://schema.org/name> \"B\"@en .".to_string(),
            "garbage".to_string(),
            declaration("P214", "ExternalId"),
        ]);
        assert_eq!(report.truncated, 1);
        assert_eq!(report.malformed, 1);
        assert!(sets.is_external_id("P214"));
    }

    #[test]
    fn broken_declaration_counts_as_malformed() {
        let broken = format!(
            "<http://www.wikidata.org/entity/P214> <{}> <http://wikiba.se/ontology#ExternalId .",
            vocab::PROPERTY_TYPE
        );
        let (sets, report) = classify(&[broken]);
        assert_eq!(report.malformed, 1);
        assert!(sets.external_ids.is_empty());
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let text = format!("{}\r\n", declaration("P214", "ExternalId"));
        let mut classifier = PredicateClassifier::new();
        classifier.scan(Cursor::new(text)).unwrap();
        let (sets, _) = classifier.finish();
        assert!(sets.is_external_id("P214"));
    }

    #[test]
    fn classify_dump_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = classify_dump(&dir.path().join("missing.nt")).unwrap_err();
        assert!(err.to_string().contains("missing.nt"), "{err}");
    }

    proptest! {
        #[test]
        fn result_does_not_depend_on_line_order(
            lines in Just(vec![
                declaration("P214", "ExternalId"),
                declaration("P227", "ExternalId"),
                declaration("P625", "GlobeCoordinate"),
                declaration("P3896", "GeoShape"),
                declaration("P17", "WikibaseItem"),
                "<http://www.wikidata.org/entity/Q1> <http://schema.org/name> \"Berlin\"@en .".to_string(),
            ]).prop_shuffle()
        ) {
            let (shuffled, _) = classify(&lines);
            let mut sorted = lines.clone();
            sorted.sort();
            let (baseline, _) = classify(&sorted);
            prop_assert_eq!(shuffled, baseline);
        }
    }
}
