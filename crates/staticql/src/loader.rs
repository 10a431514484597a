//! The record loader: turns slugs back into parsed, validated records.
//!
//! The collaborator the query executor and relation resolver both call
//! `loadBySlugs` against. Bundled as [`FileRecordLoader`], backed by a
//! [`Storage`] + [`ParserRegistry`] pair, with a per-instance parse cache:
//! keyed by file path, never evicted, reclaimed only when the loader
//! itself is dropped.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::ResolvedConfig;
use crate::error::Result;
use crate::parser::ParserRegistry;
use crate::path::paths_from_slugs;
use crate::storage::Storage;
use crate::value::{Record, Value};

pub trait RecordLoader: Send + Sync {
    /// Loads every record of `source` whose slug is in `slugs`. Slugs that
    /// cannot be found or fail to parse are simply absent from the result -
    /// per-slug failure is not fatal here (callers decide whether the
    /// omission matters: fatal for the primary materialization pass, logged
    /// for relation resolution).
    fn load_by_slugs(&self, source: &str, slugs: &[String]) -> Result<Vec<Record>>;

    fn load_one(&self, source: &str, slug: &str) -> Result<Option<Record>> {
        Ok(self
            .load_by_slugs(source, std::slice::from_ref(&slug.to_string()))?
            .into_iter()
            .next())
    }
}

pub struct FileRecordLoader {
    resolved: Arc<ResolvedConfig>,
    storage: Arc<dyn Storage>,
    parsers: Arc<ParserRegistry>,
    cache: Mutex<BTreeMap<PathBuf, Vec<Value>>>,
}

impl FileRecordLoader {
    pub fn new(resolved: Arc<ResolvedConfig>, storage: Arc<dyn Storage>, parsers: Arc<ParserRegistry>) -> Self {
        Self {
            resolved,
            storage,
            parsers,
            cache: Mutex::new(BTreeMap::new()),
        }
    }

    fn parse_cached(&self, source_type: crate::config::SourceType, path: &std::path::Path) -> Result<Vec<Value>> {
        if let Some(hit) = self.cache.lock().get(path) {
            return Ok(hit.clone());
        }
        let raw = self.storage.read_file(path)?;
        let parsed = self.parsers.parse(source_type, &raw)?;
        self.cache.lock().insert(path.to_path_buf(), parsed.clone());
        Ok(parsed)
    }
}

impl RecordLoader for FileRecordLoader {
    fn load_by_slugs(&self, source: &str, slugs: &[String]) -> Result<Vec<Record>> {
        if slugs.is_empty() {
            return Ok(Vec::new());
        }
        let source = self.resolved.source(source)?;
        let wanted: std::collections::BTreeSet<&String> = slugs.iter().collect();
        let paths = paths_from_slugs(&source.pattern, slugs);

        let mut out = Vec::new();
        let mut seen_paths = std::collections::BTreeSet::new();
        for path in paths {
            let path_buf = PathBuf::from(&path);
            if !seen_paths.insert(path_buf.clone()) {
                continue;
            }
            let values = self.parse_cached(source.source_type, &path_buf)?;
            for value in values {
                if let Some(record) = Record::from_object(value) {
                    if wanted.contains(&record.slug) {
                        out.push(record);
                    }
                }
            }
        }
        Ok(out)
    }
}
