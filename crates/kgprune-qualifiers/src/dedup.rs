//! Pass 3: drop direct facts superseded by a resolved statement.

use crate::tables::DedupTable;
use crate::tokens::base_of;
use crate::ResolveError;
use kgprune_ntriples::{vocab, LineReader, Row};
use std::io::{BufRead, Write};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupReport {
    pub rows: u64,
    pub parse_errors: u64,
    pub superseded: u64,
    pub type_aliases: u64,
    pub emitted: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Supersession {
    /// Same subject and object, same base predicate, other occurrence.
    SameFact,
    /// An instance-of row whose type shares its base with a recorded type.
    TypeAlias,
}

pub fn superseded_by(row: &Row, table: &DedupTable) -> Option<Supersession> {
    if !table.contains_subject(&row.subject) {
        return None;
    }
    let predicate_base = base_of(&row.predicate);

    if let Some(recorded) = table.get(&row.subject, &row.object) {
        if recorded != row.predicate && base_of(recorded) == predicate_base {
            return Some(Supersession::SameFact);
        }
    }

    if predicate_base == vocab::INSTANCE_OF {
        let type_base = base_of(&row.object);
        let alias = table
            .objects_of(&row.subject)
            .any(|(object, recorded)| {
                object != row.object
                    && base_of(object) == type_base
                    && recorded != row.predicate
                    && base_of(recorded) == predicate_base
            });
        if alias {
            return Some(Supersession::TypeAlias);
        }
    }
    None
}

pub fn dedup_pass<R: BufRead, W: Write>(
    input: R,
    table: &DedupTable,
    mut output: W,
) -> Result<DedupReport, ResolveError> {
    let mut report = DedupReport::default();
    let mut lines = LineReader::new(input);

    while let Some((line_no, line)) = lines
        .next_line()
        .map_err(|e| ResolveError::stream("pass 3 input", e))?
    {
        if line.is_empty() {
            continue;
        }
        let row = match Row::parse(&line) {
            Ok(row) => row,
            Err(err) => {
                report.parse_errors += 1;
                tracing::warn!(pass = 3, line = line_no, error = %err, "skipping malformed row");
                continue;
            }
        };

        match superseded_by(&row, table) {
            Some(Supersession::SameFact) => report.superseded += 1,
            Some(Supersession::TypeAlias) => report.type_aliases += 1,
            None => {
                writeln!(output, "{row}").map_err(|e| ResolveError::stream("pass 3 output", e))?;
                report.emitted += 1;
            }
        }
    }
    output
        .flush()
        .map_err(|e| ResolveError::stream("pass 3 output", e))?;

    report.rows = lines.lines_read();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn run(input: &str, table: &DedupTable) -> (DedupReport, String) {
        let mut out = Vec::new();
        let report = dedup_pass(Cursor::new(input.to_string()), table, &mut out).unwrap();
        (report, String::from_utf8(out).unwrap())
    }

    #[test]
    fn legacy_direct_fact_is_dropped() {
        let mut table = DedupTable::new();
        table.record("Q1", "Q2", "P6-0");
        let (report, out) = run("Q1,P6-0,Q2\nQ1,P6-3,Q2\nQ1,P17-0,Q2\nP6-0,P580-0,\"1871\"\n", &table);
        assert_eq!(out, "Q1,P6-0,Q2\nQ1,P17-0,Q2\nP6-0,P580-0,\"1871\"\n");
        assert_eq!(report.superseded, 1);
        assert_eq!(report.emitted, 3);
    }

    #[test]
    fn instance_of_aliases_are_dropped() {
        let mut table = DedupTable::new();
        table.record("Q1", "Q5-0", "P31-0");
        let (report, out) = run("Q1,P31-0,Q5-0\nQ1,P31-4,Q5-1\nQ1,P31-5,Q6-0\n", &table);
        assert_eq!(out, "Q1,P31-0,Q5-0\nQ1,P31-5,Q6-0\n");
        assert_eq!(report.type_aliases, 1);
    }

    #[test]
    fn rows_of_unrecorded_subjects_pass() {
        let (report, out) = run("Q7,P6-9,Q2\n", &DedupTable::new());
        assert_eq!(out, "Q7,P6-9,Q2\n");
        assert_eq!(report.emitted, 1);
    }

    fn row() -> impl Strategy<Value = String> {
        (1u8..4, prop_oneof![Just("P6"), Just("P31")], 0u8..4, 1u8..4, 0u8..3)
            .prop_map(|(s, p, pi, o, oi)| format!("Q{s},{p}-{pi},Q{o}-{oi}"))
    }

    proptest! {
        #[test]
        fn second_run_removes_nothing(
            rows in proptest::collection::vec(row(), 0..30),
            recorded in proptest::collection::vec((1u8..4, 1u8..4, 0u8..3, prop_oneof![Just("P6"), Just("P31")], 0u8..4), 0..10),
        ) {
            let mut table = DedupTable::new();
            for (s, o, oi, p, pi) in recorded {
                table.record(&format!("Q{s}"), &format!("Q{o}-{oi}"), &format!("{p}-{pi}"));
            }
            let mut input = rows.join("\n");
            input.push('\n');
            let (_, once) = run(&input, &table);
            let (report, twice) = run(&once, &table);
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(report.superseded + report.type_aliases, 0);
        }
    }
}
