//! kgprune persisted structures
//!
//! Everything that outlives a single pass goes through this crate:
//!
//! ```text
//!   classify ──► identifier_predicates.bin / geo_predicates.bin   (bincode lists)
//!   filter   ──► labels_{shard}.json … (per shard)  ──merge──► labels_dict.json …
//!   resolve  ──► qualifier_intermediate_nodes.json / qualifier_triples.json (scratch)
//! ```
//!
//! JSON documents are written compactly through a temp file + rename so a
//! crashed run never leaves a half-written table behind under the final name.

pub mod scratch;
pub mod side_tables;
pub mod special_predicates;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub use side_tables::SideTables;
pub use special_predicates::SpecialPredicates;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON document {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid predicate snapshot {}: {source}", .path.display())]
    Bincode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
}

impl StorageError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ============================================================================
// Layout
// ============================================================================

/// The five side tables extracted by the shard filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Labels,
    Aliases,
    Descriptions,
    WikipediaMappings,
    InverseWikipediaMappings,
}

impl TableKind {
    pub const ALL: [TableKind; 5] = [
        TableKind::Labels,
        TableKind::Aliases,
        TableKind::Descriptions,
        TableKind::WikipediaMappings,
        TableKind::InverseWikipediaMappings,
    ];

    fn shard_stem(self) -> &'static str {
        match self {
            TableKind::Labels => "labels",
            TableKind::Aliases => "aliases",
            TableKind::Descriptions => "descriptions",
            TableKind::WikipediaMappings => "wikipedia_mappings",
            TableKind::InverseWikipediaMappings => "inverse_wikipedia_mappings",
        }
    }

    fn merged_file_name(self) -> &'static str {
        match self {
            TableKind::Labels => "labels_dict.json",
            TableKind::Aliases => "aliases_dict.json",
            TableKind::Descriptions => "descriptions_dict.json",
            TableKind::WikipediaMappings => "wikipedia_mappings.json",
            TableKind::InverseWikipediaMappings => "inverse_wikipedia_mappings.json",
        }
    }
}

/// File naming inside the dictionaries directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictLayout {
    pub dir: PathBuf,
}

impl DictLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn external_ids_path(&self) -> PathBuf {
        self.dir.join("identifier_predicates.bin")
    }

    pub fn geo_path(&self) -> PathBuf {
        self.dir.join("geo_predicates.bin")
    }

    pub fn shard_path(&self, kind: TableKind, shard_id: usize) -> PathBuf {
        self.dir
            .join(format!("{}_{shard_id}.json", kind.shard_stem()))
    }

    pub fn merged_path(&self, kind: TableKind) -> PathBuf {
        self.dir.join(kind.merged_file_name())
    }
}

// ============================================================================
// Document helpers
// ============================================================================

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }
    Ok(())
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let tmp = path.with_extension("json.tmp");
    let file = fs::File::create(&tmp).map_err(|e| StorageError::io(&tmp, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(|e| StorageError::io(&tmp, e))?;
    drop(writer);
    fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))?;
    tracing::debug!(path = %path.display(), "wrote JSON document");
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = fs::File::open(path).map_err(|e| StorageError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Remove a file; a file that is already gone is not an error.
pub fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::io(path, e)),
    }
}
