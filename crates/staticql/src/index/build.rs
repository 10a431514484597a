//! Full index build from scratch.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::{ResolvedConfig, ResolvedSource, SLUG_FIELD};
use crate::error::{QueryEngineError, Result};
use crate::field::resolve_field;
use crate::index::line::PrefixIndexLine;
use crate::index::shard::{self, INDEX_FILE};
use crate::parser::ParserRegistry;
use crate::path::slug_from_path;
use crate::storage::Storage;
use crate::validator;
use crate::value::{Record, Value};

#[derive(Debug, Default, Clone, Copy)]
pub struct BuildStats {
    pub sources: usize,
    pub records: usize,
}

/// Parses, validates, and slug-checks every record of a source, returning
/// them alongside the file path each one came from (file-per-record
/// sources only; single-file-many-records sources report the shared path).
pub fn scan_source(
    storage: &dyn Storage,
    parsers: &ParserRegistry,
    source: &ResolvedSource,
) -> Result<Vec<Record>> {
    let paths = storage.list_files(&source.pattern)?;
    let has_wildcard = source.pattern.contains('*');
    let mut records = Vec::new();

    for path in paths {
        let raw = storage.read_file(&path)?;
        let parsed = parsers.parse(source.source_type, &raw)?;
        let path_str = path.to_string_lossy().to_string();

        for value in parsed {
            let mut object = match value {
                Value::Object(map) => map,
                other => {
                    return Err(QueryEngineError::Schema {
                        source: source.name.clone(),
                        path: path_str.clone(),
                        message: format!("record is not an object: {other:?}"),
                    });
                }
            };

            if has_wildcard {
                let derived = slug_from_path(&source.pattern, &path_str)?;
                match object.get(SLUG_FIELD).and_then(Value::as_str) {
                    Some(declared) if declared != derived => {
                        return Err(QueryEngineError::SlugMismatch {
                            path: path.clone(),
                            expected: derived,
                            actual: declared.to_string(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        object.insert(SLUG_FIELD.to_string(), Value::String(derived));
                    }
                }
            }

            let record_value = Value::Object(object);
            validator::validate(&record_value, &source.schema, &path_str).map_err(|err| {
                QueryEngineError::Schema {
                    source: source.name.clone(),
                    path: err.path,
                    message: err.message,
                }
            })?;

            let record = Record::from_object(record_value).ok_or_else(|| {
                QueryEngineError::SlugMismatch {
                    path: path.clone(),
                    expected: String::new(),
                    actual: String::new(),
                }
            })?;
            records.push(record);
        }
    }

    Ok(records)
}

/// All of a record's indexed-field values, keyed by field name, computed
/// once so every index line that mentions this record can share it (this is
/// what lets the planner sort a page by any indexed order-by field without
/// a second lookup - see `index::line`).
pub fn indexed_field_values(
    record: &Record,
    source: &ResolvedSource,
) -> BTreeMap<String, Vec<String>> {
    let mut out = BTreeMap::new();
    for field in source.indexes.keys() {
        let values = if field == SLUG_FIELD {
            vec![record.slug.clone()]
        } else {
            resolve_field(&record.fields, field)
        };
        out.insert(field.clone(), values);
    }
    out
}

struct TentativeLine {
    dir: std::path::PathBuf,
    v: String,
    vs: String,
}

pub fn build_all(
    resolved: &ResolvedConfig,
    storage: &dyn Storage,
    parsers: &ParserRegistry,
) -> Result<BuildStats> {
    let mut stats = BuildStats::default();
    for source in resolved.sources.values() {
        let records = scan_source(storage, parsers, source)?;
        stats.sources += 1;
        stats.records += records.len();
        build_source(source, &records)?;
    }
    Ok(stats)
}

fn build_source(source: &ResolvedSource, records: &[Record]) -> Result<()> {
    let field_values: Vec<BTreeMap<String, Vec<String>>> = records
        .iter()
        .map(|r| indexed_field_values(r, source))
        .collect();

    for (field, spec) in &source.indexes {
        let mut lines_by_dir: BTreeMap<std::path::PathBuf, BTreeMap<String, PrefixIndexLine>> =
            BTreeMap::new();

        for (record, fields) in records.iter().zip(field_values.iter()) {
            let values = fields.get(field).cloned().unwrap_or_default();
            for v in values {
                let dir = shard::shard_dir(&spec.dir, &v, spec.depth);
                let vs = shard::shard_prefix(&v, spec.depth);
                let entry = lines_by_dir
                    .entry(dir)
                    .or_default()
                    .entry(v.clone())
                    .or_insert_with(|| PrefixIndexLine {
                        v: v.clone(),
                        vs: vs.clone(),
                        refs: BTreeMap::new(),
                    });
                entry.refs.insert(record.slug.clone(), fields.clone());
            }
        }

        write_field_index(&spec.dir, lines_by_dir)?;
    }

    Ok(())
}

fn write_field_index(
    root_dir: &Path,
    lines_by_dir: BTreeMap<std::path::PathBuf, BTreeMap<String, PrefixIndexLine>>,
) -> Result<()> {
    if root_dir.exists() {
        fs::remove_dir_all(root_dir)?;
    }

    let mut touched = Vec::new();
    for (dir, lines) in &lines_by_dir {
        fs::create_dir_all(dir)?;
        let mut content = String::new();
        for line in lines.values() {
            content.push_str(&line.encode_line()?);
            content.push('\n');
        }
        shard::write_atomic(&dir.join(INDEX_FILE), content.as_bytes())?;
        touched.push(dir.clone());
    }

    for dir in &touched {
        let mut current = dir.clone();
        while current != root_dir {
            let Some(parent) = current.parent().map(Path::to_path_buf) else {
                break;
            };
            let segment = current
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if !segment.is_empty() {
                shard::add_prefix(&parent, &segment)?;
            }
            current = parent;
        }
    }

    Ok(())
}
