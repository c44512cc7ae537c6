//! Pass 1: normalize, index predicates and types, mark statement declarations.

use crate::tables::IntermediateNodes;
use crate::tokens::{recased, OccurrenceCounter};
use crate::ResolveError;
use kgprune_ntriples::row::{normalize_iri, normalize_subject};
use kgprune_ntriples::{normalize_object, parse_line, vocab, LineReader, Row};
use std::io::{BufRead, Write};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub lines: u64,
    pub parse_errors: u64,
    /// `entity → statement node` edges recorded in the intermediate table.
    pub declarations: u64,
    /// Declarations in the property casing, dropped without recording.
    pub redundant: u64,
    pub emitted: u64,
    pub distinct_predicates: usize,
    pub distinct_types: usize,
}

/// What pass 1 does with one triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Indexed {
    Emit(Row),
    Declaration,
    Redundant,
}

/// Pass-1 state: occurrence counters plus the intermediate-node table.
#[derive(Debug, Default)]
pub struct Indexer {
    predicates: OccurrenceCounter,
    types: OccurrenceCounter,
    nodes: IntermediateNodes,
}

impl Indexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index one normalized triple.
    ///
    /// The instance-of type index and the predicate index are consumed for
    /// every triple, declarations included, so tokens depend only on input
    /// order.
    pub fn index(&mut self, subject: String, predicate: &str, object: String) -> Indexed {
        let typed_object = if predicate == vocab::INSTANCE_OF {
            Some(self.types.next_token(&object))
        } else {
            None
        };
        let predicate_token = self.predicates.next_token(predicate);

        if let Some((base, _)) = object.split_once('-') {
            if base == subject || recased(&subject, 'q').is_some_and(|q| q == base) {
                self.nodes.declare(object, predicate_token);
                return Indexed::Declaration;
            }
            if recased(&subject, 'p').is_some_and(|p| p == base) {
                return Indexed::Redundant;
            }
        }

        Indexed::Emit(Row::new(
            subject,
            predicate_token,
            typed_object.unwrap_or(object),
        ))
    }

    pub fn finish(self) -> (IntermediateNodes, usize, usize) {
        (
            self.nodes,
            self.predicates.distinct_keys(),
            self.types.distinct_keys(),
        )
    }
}

pub fn index_pass<R: BufRead, W: Write>(
    input: R,
    mut output: W,
) -> Result<(IntermediateNodes, IndexReport), ResolveError> {
    let mut indexer = Indexer::new();
    let mut report = IndexReport::default();
    let mut lines = LineReader::new(input);

    while let Some((line_no, line)) = lines
        .next_line()
        .map_err(|e| ResolveError::stream("pass 1 input", e))?
    {
        if line.is_empty() {
            continue;
        }
        let triple = match parse_line(&line) {
            Ok(triple) => triple,
            Err(err) => {
                report.parse_errors += 1;
                tracing::warn!(pass = 1, line = line_no, error = %err, "skipping malformed triple");
                continue;
            }
        };

        let subject = normalize_subject(&triple.subject);
        let predicate = normalize_iri(&triple.predicate);
        let object = normalize_object(&triple.object);

        match indexer.index(subject, predicate, object) {
            Indexed::Emit(row) => {
                writeln!(output, "{row}").map_err(|e| ResolveError::stream("pass 1 output", e))?;
                report.emitted += 1;
            }
            Indexed::Declaration => report.declarations += 1,
            Indexed::Redundant => report.redundant += 1,
        }
    }
    output
        .flush()
        .map_err(|e| ResolveError::stream("pass 1 output", e))?;

    report.lines = lines.lines_read();
    let (nodes, predicates, types) = indexer.finish();
    report.distinct_predicates = predicates;
    report.distinct_types = types;
    Ok((nodes, report))
}
