//! External collaborator: the diff provider contract.
//!
//! Feeds the indexer's incremental update path with the set
//! of files that changed between two points in time. A VCS-backed provider
//! (local git, HTTP code-forge API) is a documented trait seam without a
//! bundled implementation - this repo does not shell out to `git` or talk
//! to a forge API. The bundled `FilesystemDiffProvider` instead compares two
//! directory fingerprints by mtime/size, the same freshness check this
//! crate's own index build uses to decide whether a rebuild is needed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathDiffStatus {
    Added,
    Modified,
    Deleted,
}

#[derive(Debug, Clone)]
pub struct PathDiffEntry {
    pub status: PathDiffStatus,
    pub path: PathBuf,
}

pub trait DiffProvider {
    fn diff_lines(&self, base_ref: &str, head_ref: &str) -> Result<Vec<PathDiffEntry>>;
    fn show(&self, rev: &str, path: &Path) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Fingerprint {
    size: u64,
    modified: Option<std::time::SystemTime>,
}

fn snapshot(root: &Path, pattern: &str) -> Result<BTreeMap<PathBuf, Fingerprint>> {
    let mut out = BTreeMap::new();
    let full_pattern = root.join(pattern).to_string_lossy().to_string();
    for entry in glob::glob(&full_pattern)
        .map_err(|err| crate::error::QueryEngineError::Config(err.to_string()))?
    {
        let path = entry.map_err(|err| std::io::Error::other(err.to_string()))?;
        if !path.is_file() {
            continue;
        }
        let metadata = fs::metadata(&path)?;
        let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        out.insert(
            relative,
            Fingerprint {
                size: metadata.len(),
                modified: metadata.modified().ok(),
            },
        );
    }
    Ok(out)
}

/// Compares the same glob pattern across two directory snapshots (`base_ref`
/// and `head_ref` are directory paths, not VCS refs) and reports A/M/D by
/// size/mtime fingerprint.
pub struct FilesystemDiffProvider {
    pattern: String,
}

impl FilesystemDiffProvider {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

impl DiffProvider for FilesystemDiffProvider {
    fn diff_lines(&self, base_ref: &str, head_ref: &str) -> Result<Vec<PathDiffEntry>> {
        let before = snapshot(Path::new(base_ref), &self.pattern)?;
        let after = snapshot(Path::new(head_ref), &self.pattern)?;
        let mut out = Vec::new();

        for (path, fp) in &after {
            match before.get(path) {
                None => out.push(PathDiffEntry {
                    status: PathDiffStatus::Added,
                    path: path.clone(),
                }),
                Some(old) if old != fp => out.push(PathDiffEntry {
                    status: PathDiffStatus::Modified,
                    path: path.clone(),
                }),
                Some(_) => {}
            }
        }
        for path in before.keys() {
            if !after.contains_key(path) {
                out.push(PathDiffEntry {
                    status: PathDiffStatus::Deleted,
                    path: path.clone(),
                });
            }
        }
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    fn show(&self, rev: &str, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(Path::new(rev).join(path))?)
    }
}
