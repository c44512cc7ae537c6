//! Pass 2: rewrite statement-node rows into direct facts and qualifier edges.

use crate::tables::{DedupTable, IntermediateNodes};
use crate::tokens::{base_of, entity_form, is_statement_node};
use crate::ResolveError;
use kgprune_ntriples::{LineReader, Row};
use std::io::{BufRead, Write};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveReport {
    pub rows: u64,
    pub parse_errors: u64,
    /// Statement rows whose declaration was pruned upstream.
    pub orphaned: u64,
    pub primary: u64,
    pub qualifiers: u64,
    /// Primary facts already emitted with the same owning token.
    pub duplicates: u64,
    pub emitted: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Not a statement row; emitted unchanged.
    Direct(Row),
    /// The fact the statement represents, hung off its entity.
    Primary(Row),
    /// A qualifier, hung off the owning predicate occurrence.
    Qualifier(Row),
    Orphaned,
    Duplicate,
}

/// Resolve one pass-1 row, recording primary facts in `dedup`.
pub fn resolve_row(row: Row, nodes: &IntermediateNodes, dedup: &mut DedupTable) -> Resolved {
    if !is_statement_node(&row.subject) {
        return Resolved::Direct(row);
    }
    let Some(owner) = nodes.owner(&row.subject) else {
        return Resolved::Orphaned;
    };

    if base_of(&row.predicate) != base_of(owner) {
        return Resolved::Qualifier(Row::new(owner, row.predicate, row.object));
    }

    let entity = entity_form(&row.subject);
    if dedup.record(&entity, &row.object, owner).as_deref() == Some(owner) {
        return Resolved::Duplicate;
    }
    Resolved::Primary(Row::new(entity, owner, row.object))
}

pub fn resolve_pass<R: BufRead, W: Write>(
    input: R,
    nodes: &IntermediateNodes,
    mut output: W,
) -> Result<(DedupTable, ResolveReport), ResolveError> {
    let mut dedup = DedupTable::new();
    let mut report = ResolveReport::default();
    let mut lines = LineReader::new(input);

    while let Some((line_no, line)) = lines
        .next_line()
        .map_err(|e| ResolveError::stream("pass 2 input", e))?
    {
        if line.is_empty() {
            continue;
        }
        let row = match Row::parse(&line) {
            Ok(row) => row,
            Err(err) => {
                report.parse_errors += 1;
                tracing::warn!(pass = 2, line = line_no, error = %err, "skipping malformed row");
                continue;
            }
        };

        let row = match resolve_row(row, nodes, &mut dedup) {
            Resolved::Direct(row) => row,
            Resolved::Primary(row) => {
                report.primary += 1;
                row
            }
            Resolved::Qualifier(row) => {
                report.qualifiers += 1;
                row
            }
            Resolved::Orphaned => {
                report.orphaned += 1;
                continue;
            }
            Resolved::Duplicate => {
                report.duplicates += 1;
                continue;
            }
        };
        writeln!(output, "{row}").map_err(|e| ResolveError::stream("pass 2 output", e))?;
        report.emitted += 1;
    }
    output
        .flush()
        .map_err(|e| ResolveError::stream("pass 2 output", e))?;

    report.rows = lines.lines_read();
    Ok((dedup, report))
}
