//! Label / alias / description / Wikipedia side tables.

use crate::{read_json, remove_file, write_json, DictLayout, Result, TableKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type MultiValued = BTreeMap<String, BTreeSet<String>>;
pub type SingleValued = BTreeMap<String, String>;

/// Side tables of one shard, or of the whole dataset after merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideTables {
    /// entity id → English labels (`schema:name`, `…altLabel`)
    pub labels: MultiValued,
    /// entity id → English strings of every `*label` / `*Label` predicate
    pub aliases: MultiValued,
    /// entity id → English description
    pub descriptions: SingleValued,
    /// entity id → English Wikipedia title
    pub wikipedia: SingleValued,
    /// English Wikipedia title → entity id
    pub inverse_wikipedia: SingleValued,
}

impl SideTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_label(&mut self, entity_id: &str, text: &str) {
        insert_multi(&mut self.labels, entity_id, text);
    }

    pub fn add_alias(&mut self, entity_id: &str, text: &str) {
        insert_multi(&mut self.aliases, entity_id, text);
    }

    pub fn set_description(&mut self, entity_id: &str, text: &str) {
        self.descriptions
            .insert(entity_id.to_string(), text.to_string());
    }

    pub fn add_wikipedia_mapping(&mut self, title: &str, entity_id: &str) {
        self.wikipedia
            .insert(entity_id.to_string(), title.to_string());
        self.inverse_wikipedia
            .insert(title.to_string(), entity_id.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
            && self.aliases.is_empty()
            && self.descriptions.is_empty()
            && self.wikipedia.is_empty()
            && self.inverse_wikipedia.is_empty()
    }

    /// Fold `other` into `self`: set union for labels/aliases, `other` wins for
    /// single-valued tables.
    pub fn merge(&mut self, other: SideTables) {
        for (id, values) in other.labels {
            self.labels.entry(id).or_default().extend(values);
        }
        for (id, values) in other.aliases {
            self.aliases.entry(id).or_default().extend(values);
        }
        self.descriptions.extend(other.descriptions);
        self.wikipedia.extend(other.wikipedia);
        self.inverse_wikipedia.extend(other.inverse_wikipedia);
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    pub fn save_shard(&self, layout: &DictLayout, shard_id: usize) -> Result<()> {
        self.save_with(|kind| layout.shard_path(kind, shard_id))
    }

    pub fn load_shard(layout: &DictLayout, shard_id: usize) -> Result<Self> {
        Self::load_with(|kind| layout.shard_path(kind, shard_id))
    }

    pub fn remove_shard(layout: &DictLayout, shard_id: usize) -> Result<()> {
        for kind in TableKind::ALL {
            remove_file(&layout.shard_path(kind, shard_id))?;
        }
        Ok(())
    }

    pub fn save_merged(&self, layout: &DictLayout) -> Result<()> {
        self.save_with(|kind| layout.merged_path(kind))
    }

    pub fn load_merged(layout: &DictLayout) -> Result<Self> {
        Self::load_with(|kind| layout.merged_path(kind))
    }

    fn save_with(&self, path_of: impl Fn(TableKind) -> std::path::PathBuf) -> Result<()> {
        write_json(&path_of(TableKind::Labels), &self.labels)?;
        write_json(&path_of(TableKind::Aliases), &self.aliases)?;
        write_json(&path_of(TableKind::Descriptions), &self.descriptions)?;
        write_json(&path_of(TableKind::WikipediaMappings), &self.wikipedia)?;
        write_json(
            &path_of(TableKind::InverseWikipediaMappings),
            &self.inverse_wikipedia,
        )
    }

    fn load_with(path_of: impl Fn(TableKind) -> std::path::PathBuf) -> Result<Self> {
        Ok(Self {
            labels: read_json(&path_of(TableKind::Labels))?,
            aliases: read_json(&path_of(TableKind::Aliases))?,
            descriptions: read_json(&path_of(TableKind::Descriptions))?,
            wikipedia: read_json(&path_of(TableKind::WikipediaMappings))?,
            inverse_wikipedia: read_json(&path_of(TableKind::InverseWikipediaMappings))?,
        })
    }
}

fn insert_multi(table: &mut MultiValued, key: &str, value: &str) {
    match table.get_mut(key) {
        Some(values) => {
            values.insert(value.to_string());
        }
        None => {
            table.insert(key.to_string(), BTreeSet::from([value.to_string()]));
        }
    }
}
