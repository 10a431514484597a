//! External collaborator: the storage repository contract.
//!
//! Implementations supply file listing, reading, writing, and streaming.
//! A local-filesystem implementation is bundled; object-store and
//! HTTP-fetch variants are documented trait seams without a bundled
//! implementation, since they need a concrete external service this repo
//! does not assume.

use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;

pub trait Storage: Send + Sync {
    fn list_files(&self, pattern: &str) -> Result<Vec<PathBuf>>;
    fn read_file(&self, path: &Path) -> Result<String>;
    fn open_file_stream(&self, path: &Path) -> Result<Box<dyn BufRead>>;
    fn write_file(&self, path: &Path, data: &[u8]) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn remove_file(&self, path: &Path) -> Result<()>;
    fn remove_dir(&self, path: &Path) -> Result<()>;
}

impl<S> Storage for Arc<S>
where
    S: Storage + ?Sized,
{
    fn list_files(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        (**self).list_files(pattern)
    }

    fn read_file(&self, path: &Path) -> Result<String> {
        (**self).read_file(path)
    }

    fn open_file_stream(&self, path: &Path) -> Result<Box<dyn BufRead>> {
        (**self).open_file_stream(path)
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> Result<()> {
        (**self).write_file(path, data)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        (**self).remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        (**self).remove_dir(path)
    }
}

/// A storage backend rooted at a directory on the local filesystem.
/// `list_files` treats `pattern` as a glob relative to the root.
pub struct LocalFsStorage {
    root: PathBuf,
}

impl LocalFsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl Storage for LocalFsStorage {
    fn list_files(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let full_pattern = self.root.join(pattern);
        let pattern_str = full_pattern.to_string_lossy().to_string();
        let mut out = Vec::new();
        for entry in glob::glob(&pattern_str)
            .map_err(|err| crate::error::QueryEngineError::Config(err.to_string()))?
        {
            let path = entry.map_err(|err| std::io::Error::other(err.to_string()))?;
            if path.is_file() {
                out.push(
                    path.strip_prefix(&self.root)
                        .map(Path::to_path_buf)
                        .unwrap_or(path),
                );
            }
        }
        out.sort();
        Ok(out)
    }

    fn read_file(&self, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(self.resolve(path))?)
    }

    fn open_file_stream(&self, path: &Path) -> Result<Box<dyn BufRead>> {
        let file = fs::File::open(self.resolve(path))?;
        Ok(Box::new(std::io::BufReader::new(file)))
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> Result<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        crate::index::shard::write_atomic(&full, data)
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        Ok(fs::remove_file(self.resolve(path))?)
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        Ok(fs::remove_dir_all(self.resolve(path))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_files_matching_glob() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("herbs")).unwrap();
        fs::write(dir.path().join("herbs/a.md"), "---\nslug: a\n---\n").unwrap();
        fs::write(dir.path().join("herbs/b.md"), "---\nslug: b\n---\n").unwrap();
        let storage = LocalFsStorage::new(dir.path());
        let files = storage.list_files("herbs/*.md").unwrap();
        assert_eq!(files.len(), 2);
    }
}
