//! Pipeline configuration (`--config pipeline.json`).

use anyhow::{Context, Result};
use kgprune_filter::FilterConfig;
use kgprune_storage::scratch::ScratchDir;
use kgprune_storage::DictLayout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Every field is optional in the JSON file; missing fields take the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Classifier sets and side tables.
    pub dicts_dir: PathBuf,
    /// Shards and resolver stage files.
    pub scratch_dir: PathBuf,
    /// Shard files are the entries of the shards directory starting with this.
    pub shard_prefix: String,
    pub filtered_output: PathBuf,
    pub resolved_output: PathBuf,
    pub flush_threshold: usize,
    pub channel_capacity: usize,
    /// `0` runs one worker per shard.
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let filter = FilterConfig::default();
        Self {
            dicts_dir: PathBuf::from("dicts"),
            scratch_dir: PathBuf::from("tmp_dumps"),
            shard_prefix: "wd".to_string(),
            filtered_output: PathBuf::from("dumps/wikidata_clean.nt"),
            resolved_output: PathBuf::from("dumps/wikidata_clean.csv"),
            flush_threshold: filter.flush_threshold,
            channel_capacity: filter.channel_capacity,
            workers: filter.workers,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn layout(&self) -> DictLayout {
        DictLayout::new(&self.dicts_dir)
    }

    pub fn scratch(&self) -> ScratchDir {
        ScratchDir::new(&self.scratch_dir)
    }

    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            flush_threshold: self.flush_threshold,
            channel_capacity: self.channel_capacity,
            workers: self.workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_file_means_defaults() {
        let config = PipelineConfig::load(None).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.filter_config(), FilterConfig::default());
        assert_eq!(
            config.layout().external_ids_path(),
            PathBuf::from("dicts/identifier_predicates.bin")
        );
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{"dicts_dir": "/data/dicts", "workers": 8}"#).unwrap();

        let config = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.dicts_dir, PathBuf::from("/data/dicts"));
        assert_eq!(config.workers, 8);
        assert_eq!(config.shard_prefix, "wd");
        assert_eq!(config.flush_threshold, 1_000_000);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{"dict_dir": "typo"}"#).unwrap();
        let err = PipelineConfig::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("dict_dir"), "{err:#}");
    }
}
