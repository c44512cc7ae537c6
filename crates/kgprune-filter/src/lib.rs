//! kgprune filtering stages
//!
//! ```text
//!   raw dump ──► PredicateClassifier ──► SpecialPredicates
//!
//!   shard_0 ──► ShardFilter ─┐                       ┌──► labels_0.json …
//!   shard_1 ──► ShardFilter ─┼──► AggregatingWriter ─┤
//!   shard_n ──► ShardFilter ─┘    (one thread)       └──► wikidata_clean.nt
//!
//!   barrier ──► DictionaryMerger ──► labels_dict.json …
//! ```
//!
//! Shard workers share nothing mutable. Kept lines travel to the writer in
//! batches over a bounded channel; side tables travel to the merger through
//! per-shard JSON documents.

pub mod classifier;
pub mod extract;
pub mod merge;
pub mod rules;
pub mod shard;
pub mod writer;

use kgprune_storage::{DictLayout, SideTables, SpecialPredicates, StorageError};
use rayon::prelude::*;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub use classifier::{classify_dump, ClassifierReport, PredicateClassifier};
pub use merge::{merge_shard_tables, DictionaryMerger};
pub use rules::{first_matching_rule, FilterRule};
pub use shard::{ShardFilter, ShardOutcome, ShardReport};
pub use writer::{AggregatingWriter, OutputSink};

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("I/O error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("output writer stopped accepting batches")]
    WriterClosed,
    #[error("output writer thread panicked")]
    WriterPanicked,
    #[error("stopped after another shard failed")]
    Aborted,
    #[error("worker pool: {0}")]
    Pool(String),
}

impl FilterError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            context: path.display().to_string(),
            source,
        }
    }

    pub fn shard_io(shard_id: usize, source: io::Error) -> Self {
        Self::Io {
            context: format!("reading shard {shard_id}"),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterConfig {
    /// Kept lines buffered per shard before a batch is handed to the writer.
    pub flush_threshold: usize,
    /// Batches that may wait in the writer queue.
    pub channel_capacity: usize,
    /// Worker threads; `0` means one per shard.
    pub workers: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            flush_threshold: 1_000_000,
            channel_capacity: 4,
            workers: 0,
        }
    }
}

/// Result of [`filter_shards`].
#[derive(Debug, Clone)]
pub struct FilterRun {
    /// Per-shard reports, in shard-id order.
    pub reports: Vec<ShardReport>,
    /// Dataset-wide side tables, as written by the merger.
    pub tables: SideTables,
    pub lines_written: u64,
}

/// Filter every shard concurrently, then merge the shard side tables.
///
/// Shard ids are positions in `shards`. Kept lines are appended to `output`.
pub fn filter_shards(
    shards: &[PathBuf],
    special: &SpecialPredicates,
    layout: &DictLayout,
    config: FilterConfig,
    output: &Path,
) -> Result<FilterRun, FilterError> {
    let started = Instant::now();
    let threads = match config.workers {
        0 => shards.len().max(1),
        n => n,
    };
    tracing::info!(
        shards = shards.len(),
        threads,
        output = %output.display(),
        "filtering shards"
    );

    let writer = AggregatingWriter::append_to(output, config.channel_capacity)?;
    let jobs: Vec<(usize, &PathBuf, OutputSink)> = shards
        .iter()
        .enumerate()
        .map(|(shard_id, path)| (shard_id, path, writer.sink()))
        .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("kgprune_shard_{i}"))
        .build()
        .map_err(|e| FilterError::Pool(e.to_string()))?;

    let results: Vec<Result<ShardReport, FilterError>> = pool.install(|| {
        jobs.into_par_iter()
            .map(|(shard_id, path, sink)| {
                if sink.is_aborted() {
                    return Err(FilterError::Aborted);
                }
                let result = filter_one_shard(shard_id, path, special, layout, config, &sink);
                if let Err(err) = &result {
                    if !matches!(err, FilterError::Aborted) {
                        tracing::error!(shard = shard_id, error = %err, "shard failed, aborting run");
                        sink.abort();
                    }
                }
                result
            })
            .collect()
    });

    let mut reports = Vec::with_capacity(results.len());
    let mut failure = None;
    for result in results {
        match result {
            Ok(report) => reports.push(report),
            Err(FilterError::Aborted) => {}
            Err(err) => {
                failure.get_or_insert(err);
            }
        }
    }

    // All sinks are gone once the jobs are consumed; writer failures win
    // over the `WriterClosed` they cause in the workers.
    let lines_written = match (writer.finish(), failure) {
        (Ok(written), None) => written,
        (Err(err), _) | (Ok(_), Some(err)) => {
            discard_shard_tables(layout, shards.len());
            return Err(err);
        }
    };

    let shard_ids: Vec<usize> = reports.iter().map(|r| r.shard_id).collect();
    let tables = merge_shard_tables(layout, &shard_ids)?;

    tracing::info!(
        shards = reports.len(),
        lines_written,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "filtering finished"
    );
    Ok(FilterRun {
        reports,
        tables,
        lines_written,
    })
}

/// Remove whatever per-shard documents a failed run left behind.
fn discard_shard_tables(layout: &DictLayout, shard_count: usize) {
    for shard_id in 0..shard_count {
        if let Err(err) = SideTables::remove_shard(layout, shard_id) {
            tracing::warn!(shard = shard_id, error = %err, "could not remove shard tables");
        }
    }
}

fn filter_one_shard(
    shard_id: usize,
    path: &Path,
    special: &SpecialPredicates,
    layout: &DictLayout,
    config: FilterConfig,
    sink: &OutputSink,
) -> Result<ShardReport, FilterError> {
    let started = Instant::now();
    let file = File::open(path).map_err(|e| FilterError::io(path, e))?;
    let outcome = ShardFilter::new(shard_id, special, config).run(BufReader::new(file), sink)?;
    outcome.tables.save_shard(layout, shard_id)?;

    let report = outcome.report;
    tracing::info!(
        shard = shard_id,
        path = %path.display(),
        lines = report.lines,
        kept = report.kept,
        dropped = report.dropped_total(),
        parse_errors = report.parse_errors,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "shard filtered"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    const WD: &str = "http://www.wikidata.org";

    fn write_shard(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
        let path = dir.join(name);
        let mut text = lines.join("\n");
        text.push('\n');
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn shards_feed_one_output_and_merged_tables() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DictLayout::new(dir.path().join("dicts"));
        let output = dir.path().join("dumps/clean.nt");

        let shard_a = write_shard(
            dir.path(),
            "wd_a",
            &[
                format!("<{WD}/entity/Q1> <http://schema.org/name> \"Berlin\"@en ."),
                format!("<{WD}/entity/Q1> <{WD}/prop/direct/P17> <{WD}/entity/Q183> ."),
            ],
        );
        let shard_b = write_shard(
            dir.path(),
            "wd_b",
            &[
                format!("<{WD}/entity/Q1> <http://www.w3.org/2004/02/skos/core#altLabel> \"Berlin, Germany\"@en ."),
                format!("<{WD}/entity/Q64> <{WD}/prop/direct/P31> <{WD}/entity/Q515> ."),
                format!("<{WD}/entity/Q64> <{WD}/prop/direct/P625> \"Point(1 2)\" ."),
            ],
        );

        let special = SpecialPredicates {
            external_ids: BTreeSet::new(),
            geo: BTreeSet::from(["P625".to_string()]),
        };
        let config = FilterConfig {
            flush_threshold: 1,
            channel_capacity: 1,
            workers: 2,
        };
        let run = filter_shards(&[shard_a, shard_b], &special, &layout, config, &output).unwrap();

        assert_eq!(run.lines_written, 2);
        assert_eq!(run.reports.len(), 2);
        assert_eq!(run.reports[1].dropped[&FilterRule::GeoPredicate], 1);

        let mut written: Vec<String> = std::fs::read_to_string(&output)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        written.sort();
        assert_eq!(
            written,
            vec![
                format!("<{WD}/entity/Q1> <{WD}/prop/direct/P17> <{WD}/entity/Q183> ."),
                format!("<{WD}/entity/Q64> <{WD}/prop/direct/P31> <{WD}/entity/Q515> ."),
            ]
        );

        assert_eq!(
            run.tables.labels["Q1"],
            BTreeSet::from(["Berlin".to_string(), "Berlin, Germany".to_string()])
        );
        assert_eq!(SideTables::load_merged(&layout).unwrap(), run.tables);
        assert!(!layout
            .shard_path(kgprune_storage::TableKind::Labels, 0)
            .exists());
    }

    #[test]
    fn missing_shard_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DictLayout::new(dir.path());
        let err = filter_shards(
            &[dir.path().join("nope")],
            &SpecialPredicates::default(),
            &layout,
            FilterConfig::default(),
            &dir.path().join("out.nt"),
        )
        .unwrap_err();
        assert!(matches!(err, FilterError::Io { .. }), "{err}");
    }

    fn many_lines(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| format!("<{WD}/entity/Q{i}> <{WD}/prop/direct/P31> <{WD}/entity/Q5> ."))
            .collect()
    }

    #[test]
    fn failing_shard_stops_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DictLayout::new(dir.path().join("dicts"));
        let output = dir.path().join("out.nt");
        let healthy = write_shard(dir.path(), "wd_b", &many_lines(5_000));

        let config = FilterConfig {
            flush_threshold: 100,
            channel_capacity: 1,
            workers: 1,
        };
        let err = filter_shards(
            &[dir.path().join("wd_a_missing"), healthy],
            &SpecialPredicates::default(),
            &layout,
            config,
            &output,
        )
        .unwrap_err();

        assert!(matches!(err, FilterError::Io { .. }), "{err}");
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "");
        for kind in kgprune_storage::TableKind::ALL {
            assert!(!layout.shard_path(kind, 1).exists(), "{kind:?}");
        }
    }

    #[test]
    fn failed_run_leaves_no_shard_tables() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DictLayout::new(dir.path().join("dicts"));
        let mut lines = many_lines(10);
        lines.push(format!("<{WD}/entity/Q1> <http://schema.org/name> \"Berlin\"@en ."));
        let healthy = write_shard(dir.path(), "wd_a", &lines);

        let err = filter_shards(
            &[healthy, dir.path().join("wd_b_missing")],
            &SpecialPredicates::default(),
            &layout,
            FilterConfig::default(),
            &dir.path().join("out.nt"),
        )
        .unwrap_err();

        assert!(matches!(err, FilterError::Io { .. }), "{err}");
        for shard_id in 0..2 {
            for kind in kgprune_storage::TableKind::ALL {
                assert!(!layout.shard_path(kind, shard_id).exists());
            }
        }
        assert!(!layout.merged_path(kgprune_storage::TableKind::Labels).exists());
    }
}
