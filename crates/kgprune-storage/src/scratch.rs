//! Scratch tables handed from one sequential pass to the next.
//!
//! A scratch table is written once by its producing pass and consumed exactly
//! once by the following pass; [`take`] deletes the file after loading it.

use crate::{read_json, remove_file, write_json, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const INTERMEDIATE_NODES_FILE: &str = "qualifier_intermediate_nodes.json";
pub const QUALIFIER_TRIPLES_FILE: &str = "qualifier_triples.json";

/// Scratch directory of one resolver run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchDir {
    pub dir: PathBuf,
}

impl ScratchDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn intermediate_nodes(&self) -> PathBuf {
        self.dir.join(INTERMEDIATE_NODES_FILE)
    }

    pub fn qualifier_triples(&self) -> PathBuf {
        self.dir.join(QUALIFIER_TRIPLES_FILE)
    }

    /// Row stream written by one resolver stage.
    pub fn stage_rows(&self, stem: &str, stage: &str) -> PathBuf {
        self.dir.join(format!("{stem}_{stage}.csv"))
    }
}

pub fn persist<T: Serialize + ?Sized>(path: &Path, table: &T) -> Result<()> {
    write_json(path, table)
}

pub fn take<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let table = read_json(path)?;
    remove_file(path)?;
    Ok(table)
}
