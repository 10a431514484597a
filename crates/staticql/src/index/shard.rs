//! Shard routing and the `_prefixes.jsonl` manifest.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const INDEX_FILE: &str = "_index.jsonl";
pub const PREFIXES_FILE: &str = "_prefixes.jsonl";

/// The per-level path segments (one character each) a value routes through,
/// up to `depth`. A value shorter than `depth` routes at its actual length;
/// an empty value routes to the directory root (no segments).
pub fn shard_segments(value: &str, depth: usize) -> Vec<String> {
    value
        .to_lowercase()
        .chars()
        .take(depth)
        .map(|c| c.to_string())
        .collect()
}

/// `vs`: the first `depth` characters of the lowercased value.
pub fn shard_prefix(value: &str, depth: usize) -> String {
    value.to_lowercase().chars().take(depth).collect()
}

pub fn shard_dir(index_root: &Path, value: &str, depth: usize) -> PathBuf {
    let mut dir = index_root.to_path_buf();
    for segment in shard_segments(value, depth) {
        dir.push(segment);
    }
    dir
}

/// Every ancestor directory between `leaf` (exclusive) and `root` (inclusive).
pub fn ancestors_between(root: &Path, leaf: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut current = leaf.to_path_buf();
    while current != root {
        match current.parent() {
            Some(parent) => {
                out.push(parent.to_path_buf());
                current = parent.to_path_buf();
            }
            None => break,
        }
    }
    out
}

pub fn read_prefixes(dir: &Path) -> Result<Vec<String>> {
    let path = dir.join(PREFIXES_FILE);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(&path)?;
    Ok(content
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect())
}

pub fn write_prefixes(dir: &Path, mut segments: Vec<String>) -> Result<()> {
    segments.sort();
    segments.dedup();
    let path = dir.join(PREFIXES_FILE);
    if segments.is_empty() {
        if path.exists() {
            fs::remove_file(&path)?;
        }
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    write_atomic(&path, segments.join("\n").as_bytes())
}

/// Inserts `segment` into `dir`'s manifest if absent.
pub fn add_prefix(dir: &Path, segment: &str) -> Result<()> {
    let mut segments = read_prefixes(dir)?;
    if !segments.iter().any(|s| s == segment) {
        segments.push(segment.to_string());
        write_prefixes(dir, segments)?;
    }
    Ok(())
}

/// Removes `segment` from `dir`'s manifest if present.
pub fn remove_prefix(dir: &Path, segment: &str) -> Result<()> {
    let segments = read_prefixes(dir)?;
    let filtered: Vec<String> = segments.into_iter().filter(|s| s != segment).collect();
    write_prefixes(dir, filtered)
}

/// Writes `data` to `path` by first writing a sibling temp file and renaming
/// it into place, so a crash mid-write never leaves a torn shard file behind.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir)?;
    let tmp_path = dir.join(format!(
        ".{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("shard")
    ));
    {
        let mut tmp = fs::File::create(&tmp_path)?;
        tmp.write_all(data)?;
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_values_route_at_actual_length() {
        assert_eq!(shard_segments("A", 2), vec!["a".to_string()]);
        assert_eq!(shard_prefix("A", 2), "a".to_string());
    }

    #[test]
    fn empty_value_routes_to_root() {
        assert!(shard_segments("", 2).is_empty());
        assert_eq!(shard_prefix("", 2), "");
    }

    #[test]
    fn long_values_route_to_full_depth() {
        assert_eq!(
            shard_segments("Arctium", 2),
            vec!["a".to_string(), "r".to_string()]
        );
    }
}
