//! Incremental diff application.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::{ResolvedConfig, ResolvedSource, SLUG_FIELD};
use crate::error::{QueryEngineError, Result};
use crate::index::line::PrefixIndexLine;
use crate::index::shard::{self, INDEX_FILE};
use crate::index::store::{self, MatchOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffStatus {
    Added,
    Modified,
    Deleted,
}

/// One entry of an incremental update. `fields` carries the record's newly
/// computed indexed-field values (ignored, and may be omitted, for `Deleted`
/// - the previous values are re-read from the slug index's own `ref` entry).
#[derive(Debug, Clone)]
pub struct DiffEntry {
    pub status: DiffStatus,
    pub source: String,
    pub slug: String,
    pub fields: Option<BTreeMap<String, Vec<String>>>,
}

pub fn apply_diff(resolved: &ResolvedConfig, entries: &[DiffEntry]) -> Result<()> {
    for entry in entries {
        let source = resolved.source(&entry.source)?;
        match entry.status {
            DiffStatus::Added => {
                let fields = entry.fields.clone().ok_or_else(|| {
                    QueryEngineError::Config("added diff entry is missing field values".into())
                })?;
                apply_add(source, &entry.slug, &fields)?;
            }
            DiffStatus::Modified => {
                let old = lookup_old_fields(source, &entry.slug)?;
                let new_fields = entry.fields.clone().ok_or_else(|| {
                    QueryEngineError::Config("modified diff entry is missing field values".into())
                })?;
                if let Some(old) = old {
                    apply_remove(source, &entry.slug, &old)?;
                }
                apply_add(source, &entry.slug, &new_fields)?;
            }
            DiffStatus::Deleted => {
                if let Some(old) = lookup_old_fields(source, &entry.slug)? {
                    apply_remove(source, &entry.slug, &old)?;
                }
            }
        }
    }
    Ok(())
}

fn lookup_old_fields(
    source: &ResolvedSource,
    slug: &str,
) -> Result<Option<BTreeMap<String, Vec<String>>>> {
    let spec = source
        .indexes
        .get(SLUG_FIELD)
        .ok_or_else(|| QueryEngineError::MissingIndex {
            source: source.name.clone(),
            field: SLUG_FIELD.to_string(),
        })?;
    let lines = store::find_index_lines(&spec.dir, spec.depth, slug, MatchOp::Eq)?;
    Ok(lines.into_iter().find_map(|l| l.refs.get(slug).cloned()))
}

fn apply_add(
    source: &ResolvedSource,
    slug: &str,
    fields: &BTreeMap<String, Vec<String>>,
) -> Result<()> {
    for (field, spec) in &source.indexes {
        let values = fields.get(field).cloned().unwrap_or_default();
        for v in values {
            let dir = shard::shard_dir(&spec.dir, &v, spec.depth);
            let mut lines = store::read_shard_lines(&dir)?;
            let had_content = !lines.is_empty();
            match lines.iter_mut().find(|l| l.v == v) {
                Some(line) => {
                    line.refs.insert(slug.to_string(), fields.clone());
                }
                None => {
                    let mut refs = BTreeMap::new();
                    refs.insert(slug.to_string(), fields.clone());
                    lines.push(PrefixIndexLine {
                        v: v.clone(),
                        vs: shard::shard_prefix(&v, spec.depth),
                        refs,
                    });
                }
            }
            write_shard(&dir, &spec.dir, lines, had_content)?;
        }
    }
    Ok(())
}

fn apply_remove(
    source: &ResolvedSource,
    slug: &str,
    fields: &BTreeMap<String, Vec<String>>,
) -> Result<()> {
    for (field, spec) in &source.indexes {
        let values = fields.get(field).cloned().unwrap_or_default();
        for v in values {
            let dir = shard::shard_dir(&spec.dir, &v, spec.depth);
            let mut lines = store::read_shard_lines(&dir)?;
            let had_content = !lines.is_empty();
            if let Some(pos) = lines.iter().position(|l| l.v == v) {
                lines[pos].refs.remove(slug);
                if lines[pos].is_empty() {
                    lines.remove(pos);
                }
            }
            write_shard(&dir, &spec.dir, lines, had_content)?;
        }
    }
    Ok(())
}

fn write_shard(
    dir: &Path,
    root: &Path,
    mut lines: Vec<PrefixIndexLine>,
    had_content_before: bool,
) -> Result<()> {
    lines.sort_by(|a, b| a.v.cmp(&b.v));

    if lines.is_empty() {
        let file = dir.join(INDEX_FILE);
        if file.exists() {
            fs::remove_file(&file)?;
        }
        let has_children = !shard::read_prefixes(dir)?.is_empty();
        if !has_children {
            prune_ancestors(dir, root)?;
            if dir.exists() && fs::read_dir(dir).map(|mut d| d.next().is_none()).unwrap_or(false) {
                let _ = fs::remove_dir(dir);
            }
        }
        return Ok(());
    }

    fs::create_dir_all(dir)?;
    let mut content = String::new();
    for line in &lines {
        content.push_str(&line.encode_line()?);
        content.push('\n');
    }
    shard::write_atomic(&dir.join(INDEX_FILE), content.as_bytes())?;

    if !had_content_before {
        ensure_registered(dir, root)?;
    }
    Ok(())
}

fn ensure_registered(dir: &Path, root: &Path) -> Result<()> {
    let mut current = dir.to_path_buf();
    while current != root {
        let Some(parent) = current.parent().map(Path::to_path_buf) else {
            break;
        };
        let segment = current
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if segment.is_empty() {
            break;
        }
        let existing = shard::read_prefixes(&parent)?;
        if existing.iter().any(|s| s == &segment) {
            break;
        }
        shard::add_prefix(&parent, &segment)?;
        current = parent;
    }
    Ok(())
}

fn prune_ancestors(dir: &Path, root: &Path) -> Result<()> {
    let mut current = dir.to_path_buf();
    while current != root {
        let Some(parent) = current.parent().map(Path::to_path_buf) else {
            break;
        };
        let segment = current
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if segment.is_empty() {
            break;
        }
        shard::remove_prefix(&parent, &segment)?;
        let parent_has_own = parent.join(INDEX_FILE).exists();
        let parent_has_children = !shard::read_prefixes(&parent)?.is_empty();
        if parent_has_own || parent_has_children || parent == root {
            break;
        }
        current = parent;
    }
    Ok(())
}
