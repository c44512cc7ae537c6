//! One shard worker: extraction, exclusion chain, batched output.

use crate::extract::{entity_subject, extract_entity_tables, extract_wikipedia_mapping};
use crate::rules::{first_matching_rule, FilterRule};
use crate::writer::{Batch, OutputSink};
use crate::{FilterConfig, FilterError};
use kgprune_ntriples::{parse_line, LineReader};
use kgprune_storage::{SideTables, SpecialPredicates};
use std::collections::BTreeMap;
use std::io::BufRead;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardReport {
    pub shard_id: usize,
    pub lines: u64,
    pub parse_errors: u64,
    /// Lines whose subject is not an entity or statement reference.
    pub foreign_subjects: u64,
    pub kept: u64,
    pub dropped: BTreeMap<FilterRule, u64>,
}

impl ShardReport {
    pub fn dropped_total(&self) -> u64 {
        self.dropped.values().sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShardOutcome {
    pub tables: SideTables,
    pub report: ShardReport,
}

pub struct ShardFilter<'a> {
    shard_id: usize,
    special: &'a SpecialPredicates,
    flush_threshold: usize,
}

impl<'a> ShardFilter<'a> {
    pub fn new(shard_id: usize, special: &'a SpecialPredicates, config: FilterConfig) -> Self {
        Self {
            shard_id,
            special,
            flush_threshold: config.flush_threshold.max(1),
        }
    }

    /// Classify one line. Returns the canonical line to keep, if any.
    pub fn process_line(
        &self,
        line_no: u64,
        line: &str,
        tables: &mut SideTables,
        report: &mut ShardReport,
    ) -> Option<String> {
        let triple = match parse_line(line) {
            Ok(triple) => triple,
            Err(err) => {
                report.parse_errors += 1;
                tracing::warn!(
                    shard = self.shard_id,
                    line = line_no,
                    error = %err,
                    "skipping malformed line"
                );
                return None;
            }
        };

        extract_wikipedia_mapping(&triple, tables);

        let Some(entity_id) = entity_subject(&triple) else {
            report.foreign_subjects += 1;
            return None;
        };
        extract_entity_tables(entity_id, &triple, tables);

        if let Some(rule) = first_matching_rule(&triple, self.special) {
            *report.dropped.entry(rule).or_default() += 1;
            return None;
        }

        report.kept += 1;
        Some(triple.to_string())
    }

    pub fn run<R: BufRead>(&self, reader: R, sink: &OutputSink) -> Result<ShardOutcome, FilterError> {
        let mut tables = SideTables::new();
        let mut report = ShardReport {
            shard_id: self.shard_id,
            ..ShardReport::default()
        };
        let mut batch: Batch = Vec::new();
        let mut lines = LineReader::new(reader);

        while let Some((line_no, line)) = lines
            .next_line()
            .map_err(|e| FilterError::shard_io(self.shard_id, e))?
        {
            if sink.is_aborted() {
                return Err(FilterError::Aborted);
            }
            if line.is_empty() {
                continue;
            }
            if let Some(kept) = self.process_line(line_no, &line, &mut tables, &mut report) {
                batch.push(kept);
                if batch.len() >= self.flush_threshold {
                    tracing::debug!(shard = self.shard_id, lines = batch.len(), "flushing batch");
                    sink.send(std::mem::take(&mut batch))?;
                }
            }
        }
        report.lines = lines.lines_read();
        sink.send(batch)?;

        Ok(ShardOutcome { tables, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::AggregatingWriter;
    use kgprune_ntriples::Triple;
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use std::io::Cursor;

    fn special() -> SpecialPredicates {
        SpecialPredicates {
            external_ids: BTreeSet::from(["P214".to_string()]),
            geo: BTreeSet::from(["P625".to_string()]),
        }
    }

    fn run_shard(input: &str, threshold: usize) -> (ShardOutcome, Vec<String>) {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("clean.nt");
        let writer = AggregatingWriter::append_to(&out, 2).unwrap();
        let sink = writer.sink();
        let sets = special();
        let config = FilterConfig {
            flush_threshold: threshold,
            ..FilterConfig::default()
        };
        let outcome = ShardFilter::new(0, &sets, config)
            .run(Cursor::new(input.to_string()), &sink)
            .unwrap();
        drop(sink);
        writer.finish().unwrap();
        let lines = std::fs::read_to_string(&out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        (outcome, lines)
    }

    const SAMPLE: &str = r#"<http://www.wikidata.org/entity/Q1> <http://schema.org/name> "Berlin"@en .
<http://www.wikidata.org/entity/Q1> <http://schema.org/name> "Berlín"@es .
<http://www.wikidata.org/entity/Q1> <http://www.wikidata.org/prop/direct/P1448> "Berlín"@es .
<http://www.wikidata.org/entity/Q1> <http://www.wikidata.org/prop/direct/P17> <http://www.wikidata.org/entity/Q183> .
<http://www.wikidata.org/entity/Q1> <http://www.wikidata.org/prop/direct/P214> "152617178" .
<https://en.wikipedia.org/wiki/Berlin> <http://schema.org/about> <http://www.wikidata.org/entity/Q1> .
this line is garbage
<http://www.wikidata.org/entity/Q1> <http://www.wikidata.org/prop/direct/P1448> "Berlin"@en .
"#;

    #[test]
    fn keeps_facts_and_extracts_tables() {
        let (outcome, lines) = run_shard(SAMPLE, 1);
        assert_eq!(
            lines,
            vec![
                "<http://www.wikidata.org/entity/Q1> <http://www.wikidata.org/prop/direct/P17> <http://www.wikidata.org/entity/Q183> .",
                "<http://www.wikidata.org/entity/Q1> <http://www.wikidata.org/prop/direct/P1448> \"Berlin\"@en .",
            ]
        );
        assert_eq!(outcome.tables.labels["Q1"], BTreeSet::from(["Berlin".to_string()]));
        assert_eq!(outcome.tables.wikipedia["Q1"], "Berlin");

        let report = &outcome.report;
        assert_eq!(report.lines, 8);
        assert_eq!(report.parse_errors, 1);
        assert_eq!(report.foreign_subjects, 1);
        assert_eq!(report.kept, 2);
        assert_eq!(report.dropped[&FilterRule::OntologyPredicate], 2);
        assert_eq!(report.dropped[&FilterRule::ForeignLabel], 1);
        assert_eq!(report.dropped[&FilterRule::ExternalIdPredicate], 1);
        assert_eq!(report.dropped_total() + report.kept + 2, report.lines);
    }

    #[test]
    fn flush_threshold_does_not_change_output() {
        let (_, small) = run_shard(SAMPLE, 1);
        let (_, large) = run_shard(SAMPLE, 1_000_000);
        assert_eq!(small, large);
    }

    fn iri() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("http://www.wikidata.org/entity/Q64".to_string()),
            Just("http://www.wikidata.org/entity/P31".to_string()),
            Just("http://www.wikidata.org/entity/statement/Q64-1".to_string()),
            Just("http://www.wikidata.org/entity/L7-S1".to_string()),
            Just("http://www.wikidata.org/value/abc".to_string()),
            Just("http://www.wikidata.org/reference/abc".to_string()),
            Just("http://www.wikidata.org/.well-known/genid/abc".to_string()),
            Just("https://example.org/x".to_string()),
        ]
    }

    fn predicate() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("http://www.wikidata.org/prop/direct/P17".to_string()),
            Just("http://www.wikidata.org/prop/direct/P214".to_string()),
            Just("http://www.wikidata.org/prop/direct/P625".to_string()),
            Just("http://www.wikidata.org/prop/qualifier/P580".to_string()),
            Just("http://schema.org/name".to_string()),
            Just("http://www.w3.org/2000/01/rdf-schema#label".to_string()),
        ]
    }

    fn object() -> impl Strategy<Value = String> {
        prop_oneof![
            iri().prop_map(|i| format!("<{i}>")),
            Just("_:genid7".to_string()),
            "[a-z]{1,6}".prop_map(|t| format!("\"{t}\"")),
            ("[a-z]{1,6}", prop_oneof![Just("en"), Just("en-gb"), Just("de"), Just("DE"), Just("zh-hant")])
                .prop_map(|(t, l)| format!("\"{t}\"@{l}")),
        ]
    }

    proptest! {
        #[test]
        fn kept_iff_no_rule_matches(s in iri(), p in predicate(), o in object()) {
            let line = format!("<{s}> <{p}> {o} .");
            let sets = special();
            let filter = ShardFilter::new(0, &sets, FilterConfig::default());
            let mut tables = SideTables::new();
            let mut report = ShardReport::default();
            let kept = filter.process_line(1, &line, &mut tables, &mut report);

            let triple: Triple = kgprune_ntriples::parse_line(&line).unwrap();
            let matching: Vec<FilterRule> = FilterRule::ALL
                .into_iter()
                .filter(|r| r.matches(&triple, &sets))
                .collect();

            if report.foreign_subjects == 0 {
                prop_assert_eq!(kept.is_some(), matching.is_empty());
            } else {
                prop_assert!(kept.is_none());
            }
        }
    }
}
