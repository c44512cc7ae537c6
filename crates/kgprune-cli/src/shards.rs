//! Shard discovery.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files directly inside `dir` whose name starts with `prefix`, sorted by name.
///
/// The position in the returned list is the shard id.
pub fn discover_shards(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let mut shards = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("listing shards in {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with(prefix) {
            shards.push(entry.into_path());
        }
    }
    Ok(shards)
}
