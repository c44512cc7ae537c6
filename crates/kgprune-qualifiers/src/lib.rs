//! kgprune qualifier resolution
//!
//! Wikidata reifies every statement as its own node:
//!
//! ```text
//!   Q1 ──p:P6──► Q1-abc ──ps:P6──► Q2            (primary value)
//!                       └─pq:P580─► "1871"      (qualifier)
//!   Q1 ──wdt:P6─────────────────► Q2            (truthy duplicate)
//! ```
//!
//! Three sequential passes fold this back into direct relations:
//!
//! ```text
//!   Q1,P6-0,Q2                  primary value, owned by occurrence P6-0
//!   P6-0,P580-0,"1871"          qualifier hangs off the occurrence
//! ```
//!
//! | pass | reads | writes |
//! |------|-------|--------|
//! | 1 index   | filtered N-Triples | indexed rows + [`IntermediateNodes`] |
//! | 2 resolve | indexed rows + [`IntermediateNodes`] | resolved rows + [`DedupTable`] |
//! | 3 dedup   | resolved rows + [`DedupTable`] | final rows |
//!
//! The pass functions work on any reader/writer pair. The stage handles
//! ([`RawStream`] → [`IndexedStream`] → [`ResolvedStream`] → [`DedupedStream`])
//! run them over files and pass the tables through the scratch directory.

pub mod dedup;
pub mod index;
pub mod resolve;
pub mod tables;
pub mod tokens;

use kgprune_storage::scratch::{self, ScratchDir};
use kgprune_storage::StorageError;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub use dedup::{dedup_pass, DedupReport};
pub use index::{index_pass, IndexReport};
pub use resolve::{resolve_pass, ResolveReport};
pub use tables::{DedupTable, IntermediateNodes};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("I/O error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl ResolveError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            context: path.display().to_string(),
            source,
        }
    }

    pub fn stream(context: &'static str, source: io::Error) -> Self {
        Self::Io {
            context: context.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;

// ============================================================================
// Stage handles
// ============================================================================

#[derive(Debug, Clone)]
struct StageFiles {
    scratch: ScratchDir,
    stem: String,
}

impl StageFiles {
    fn rows(&self, stage: &str) -> PathBuf {
        self.scratch.stage_rows(&self.stem, stage)
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| ResolveError::io(path, e))
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ResolveError::io(parent, e))?;
    }
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| ResolveError::io(path, e))
}

/// The filtered triple file, not yet indexed.
#[derive(Debug, Clone)]
pub struct RawStream {
    files: StageFiles,
    input: PathBuf,
}

/// Pass 1 done: indexed rows on disk, intermediate nodes in scratch.
#[derive(Debug, Clone)]
pub struct IndexedStream {
    files: StageFiles,
    rows: PathBuf,
    index: IndexReport,
}

/// Pass 2 done: resolved rows on disk, dedup table in scratch.
#[derive(Debug, Clone)]
pub struct ResolvedStream {
    files: StageFiles,
    rows: PathBuf,
    index: IndexReport,
    resolve: ResolveReport,
}

/// Pass 3 done: the final row stream.
#[derive(Debug, Clone)]
pub struct DedupedStream {
    pub path: PathBuf,
    pub index: IndexReport,
    pub resolve: ResolveReport,
    pub dedup: DedupReport,
}

impl RawStream {
    /// Stage files are named after the input's file stem.
    pub fn new(scratch: ScratchDir, input: impl Into<PathBuf>) -> Self {
        let input = input.into();
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "triples".to_string());
        Self {
            files: StageFiles { scratch, stem },
            input,
        }
    }

    pub fn index(self) -> Result<IndexedStream> {
        let started = Instant::now();
        let rows = self.files.rows("unique_predicates");
        let (nodes, report) = index_pass(open(&self.input)?, create(&rows)?)?;
        scratch::persist(&self.files.scratch.intermediate_nodes(), &nodes)?;

        tracing::info!(
            lines = report.lines,
            emitted = report.emitted,
            declarations = report.declarations,
            predicates = report.distinct_predicates,
            parse_errors = report.parse_errors,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pass 1 (index) finished"
        );
        Ok(IndexedStream {
            files: self.files,
            rows,
            index: report,
        })
    }
}

impl IndexedStream {
    pub fn report(&self) -> &IndexReport {
        &self.index
    }

    pub fn rows(&self) -> &Path {
        &self.rows
    }

    pub fn resolve(self) -> Result<ResolvedStream> {
        let started = Instant::now();
        let nodes: IntermediateNodes = scratch::take(&self.files.scratch.intermediate_nodes())?;
        let rows = self.files.rows("qualifiers_resolved");
        let (dedup, report) = resolve_pass(open(&self.rows)?, &nodes, create(&rows)?)?;
        drop(nodes);
        scratch::persist(&self.files.scratch.qualifier_triples(), &dedup)?;
        kgprune_storage::remove_file(&self.rows)?;

        tracing::info!(
            rows = report.rows,
            primary = report.primary,
            qualifiers = report.qualifiers,
            orphaned = report.orphaned,
            recorded = dedup.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pass 2 (resolve) finished"
        );
        Ok(ResolvedStream {
            files: self.files,
            rows,
            index: self.index,
            resolve: report,
        })
    }
}

impl ResolvedStream {
    pub fn report(&self) -> &ResolveReport {
        &self.resolve
    }

    pub fn rows(&self) -> &Path {
        &self.rows
    }

    pub fn dedup(self, output: &Path) -> Result<DedupedStream> {
        let started = Instant::now();
        let table: DedupTable = scratch::take(&self.files.scratch.qualifier_triples())?;
        let report = dedup_pass(open(&self.rows)?, &table, create(output)?)?;
        kgprune_storage::remove_file(&self.rows)?;

        tracing::info!(
            rows = report.rows,
            emitted = report.emitted,
            superseded = report.superseded,
            type_aliases = report.type_aliases,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pass 3 (dedup) finished"
        );
        Ok(DedupedStream {
            path: output.to_path_buf(),
            index: self.index,
            resolve: self.resolve,
            dedup: report,
        })
    }
}

/// Runs the three passes over files, using `scratch` for stage files.
#[derive(Debug, Clone)]
pub struct QualifierResolver {
    scratch: ScratchDir,
}

impl QualifierResolver {
    pub fn new(scratch: ScratchDir) -> Self {
        Self { scratch }
    }

    pub fn run(&self, input: &Path, output: &Path) -> Result<DedupedStream> {
        RawStream::new(self.scratch.clone(), input)
            .index()?
            .resolve()?
            .dedup(output)
    }
}
