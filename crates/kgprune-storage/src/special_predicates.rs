//! Predicate sets discovered by the classifier.
//!
//! Persisted as two bincode-encoded lists of property ids (`P227`, `P625`, …)
//! and loaded read-only by every shard worker.

use crate::{DictLayout, Result, StorageError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialPredicates {
    /// Properties whose value type is `wikibase:ExternalId`.
    pub external_ids: BTreeSet<String>,
    /// Properties whose value type is `wikibase:GeoShape` or `wikibase:GlobeCoordinate`.
    pub geo: BTreeSet<String>,
}

impl SpecialPredicates {
    pub fn is_external_id(&self, property_id: &str) -> bool {
        self.external_ids.contains(property_id)
    }

    pub fn is_geo(&self, property_id: &str) -> bool {
        self.geo.contains(property_id)
    }

    pub fn save(&self, layout: &DictLayout) -> Result<()> {
        write_list(&layout.external_ids_path(), &self.external_ids)?;
        write_list(&layout.geo_path(), &self.geo)
    }

    pub fn load(layout: &DictLayout) -> Result<Self> {
        Ok(Self {
            external_ids: read_list(&layout.external_ids_path())?,
            geo: read_list(&layout.geo_path())?,
        })
    }
}

fn write_list(path: &Path, ids: &BTreeSet<String>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }
    let list: Vec<&String> = ids.iter().collect();
    let file = fs::File::create(path).map_err(|e| StorageError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, &list).map_err(|source| StorageError::Bincode {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(|e| StorageError::io(path, e))?;
    Ok(())
}

fn read_list(path: &Path) -> Result<BTreeSet<String>> {
    let file = fs::File::open(path).map_err(|e| StorageError::io(path, e))?;
    let list: Vec<String> =
        bincode::deserialize_from(BufReader::new(file)).map_err(|source| {
            StorageError::Bincode {
                path: path.to_path_buf(),
                source,
            }
        })?;
    Ok(list.into_iter().collect())
}
