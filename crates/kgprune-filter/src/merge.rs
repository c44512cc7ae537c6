//! Dataset-wide side tables from per-shard documents.

use crate::FilterError;
use kgprune_storage::{DictLayout, SideTables};
use std::time::Instant;

/// Folds shard side tables into the merged dictionaries.
///
/// Runs only after every shard worker has persisted its tables. Shards are
/// folded in ascending id order, so for descriptions and Wikipedia mappings
/// the highest shard id wins a conflict.
#[derive(Debug, Clone)]
pub struct DictionaryMerger {
    layout: DictLayout,
}

impl DictionaryMerger {
    pub fn new(layout: DictLayout) -> Self {
        Self { layout }
    }

    pub fn merge(&self, shard_ids: &[usize]) -> Result<SideTables, FilterError> {
        let started = Instant::now();
        let mut ids = shard_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut merged = SideTables::new();
        for &shard_id in &ids {
            merged.merge(SideTables::load_shard(&self.layout, shard_id)?);
        }
        merged.save_merged(&self.layout)?;

        for &shard_id in &ids {
            SideTables::remove_shard(&self.layout, shard_id)?;
        }

        tracing::info!(
            shards = ids.len(),
            labels = merged.labels.len(),
            aliases = merged.aliases.len(),
            descriptions = merged.descriptions.len(),
            wikipedia = merged.wikipedia.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "side tables merged"
        );
        Ok(merged)
    }
}

pub fn merge_shard_tables(layout: &DictLayout, shard_ids: &[usize]) -> Result<SideTables, FilterError> {
    DictionaryMerger::new(layout.clone()).merge(shard_ids)
}
