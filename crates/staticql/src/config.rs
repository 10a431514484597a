//! Config resolver.
//!
//! Turns the user-authored [`Config`] into a [`ResolvedConfig`]: every source
//! gets a canonical index set, including indexes synthesized for inbound
//! relations that need a reverse lookup. Resolution is pure and is cached
//! behind a lock the first time it runs, the same "compute once, serve many"
//! shape the workspace path resolver in this codebase uses for its own
//! locator lookups.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{QueryEngineError, Result};
use crate::validator::Schema;

pub const DEFAULT_PREFIX_DEPTH: usize = 2;
pub const SLUG_FIELD: &str = "slug";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Markdown,
    Yaml,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DirectKind {
    HasOne,
    HasMany,
    BelongsTo,
    BelongsToMany,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ThroughKind {
    HasOneThrough,
    HasManyThrough,
}

/// A declarative link between sources, modeled as a sum type
/// rather than a shared base class so the resolver can match exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "camelCase")]
pub enum Relation {
    Direct {
        to: String,
        local_key: String,
        foreign_key: String,
        kind: DirectKind,
    },
    Through {
        to: String,
        through: String,
        source_local_key: String,
        through_foreign_key: String,
        through_local_key: String,
        target_foreign_key: String,
        kind: ThroughKind,
    },
}

impl Relation {
    pub fn target(&self) -> &str {
        match self {
            Relation::Direct { to, .. } => to,
            Relation::Through { to, .. } => to,
        }
    }

    /// The field on the target source that a reverse lookup for this
    /// relation must be indexed on, if any.
    fn reverse_index_field(&self) -> &str {
        match self {
            Relation::Direct { foreign_key, .. } => foreign_key,
            Relation::Through {
                target_foreign_key, ..
            } => target_foreign_key,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDeclaration {
    pub field: String,
    #[serde(default)]
    pub depth: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub pattern: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub schema: Schema,
    #[serde(default)]
    pub relations: BTreeMap<String, Relation>,
    #[serde(default)]
    pub indexes: Vec<IndexDeclaration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub sources: Vec<SourceConfig>,
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    #[serde(default = "default_prefix_depth")]
    pub default_prefix_depth: usize,
}

fn default_output_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_prefix_depth() -> usize {
    DEFAULT_PREFIX_DEPTH
}

impl Config {
    pub fn from_yaml_str(text: &str) -> Result<Config> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Config> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Debug, Clone)]
pub struct IndexSpec {
    pub field: String,
    pub dir: PathBuf,
    pub depth: usize,
}

#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub name: String,
    pub pattern: String,
    pub source_type: SourceType,
    pub schema: Schema,
    pub relations: BTreeMap<String, Relation>,
    /// Keyed by dot-path field name.
    pub indexes: BTreeMap<String, IndexSpec>,
}

impl ResolvedSource {
    pub fn index_dir(&self) -> &Path {
        // all indexes for a source share the same parent; any entry works,
        // callers needing the source's index root use `output_root` instead.
        self.indexes
            .values()
            .next()
            .map(|spec| spec.dir.parent().unwrap_or(Path::new(".")))
            .unwrap_or(Path::new("."))
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub output_root: PathBuf,
    pub sources: BTreeMap<String, ResolvedSource>,
}

impl ResolvedConfig {
    pub fn source(&self, name: &str) -> Result<&ResolvedSource> {
        self.sources
            .get(name)
            .ok_or_else(|| QueryEngineError::Config(format!("unknown source: {name}")))
    }

    pub fn index_root(&self) -> PathBuf {
        self.output_root.join("index")
    }
}

fn index_dir(output_root: &Path, source: &str, field: &str) -> PathBuf {
    output_root.join("index").join(format!("{source}.{field}"))
}

fn resolve(config: &Config) -> Result<ResolvedConfig> {
    let mut sources: BTreeMap<String, ResolvedSource> = BTreeMap::new();

    for src in &config.sources {
        let mut indexes = BTreeMap::new();
        indexes.insert(
            SLUG_FIELD.to_string(),
            IndexSpec {
                field: SLUG_FIELD.to_string(),
                dir: index_dir(&config.output_root, &src.name, SLUG_FIELD),
                depth: config.default_prefix_depth,
            },
        );
        for decl in &src.indexes {
            indexes.insert(
                decl.field.clone(),
                IndexSpec {
                    field: decl.field.clone(),
                    dir: index_dir(&config.output_root, &src.name, &decl.field),
                    depth: decl.depth.unwrap_or(config.default_prefix_depth),
                },
            );
        }

        sources.insert(
            src.name.clone(),
            ResolvedSource {
                name: src.name.clone(),
                pattern: src.pattern.clone(),
                source_type: src.source_type,
                schema: src.schema.clone(),
                relations: src.relations.clone(),
                indexes,
            },
        );
    }

    // Synthesize reverse-lookup indexes for inbound relations.
    let mut to_add: Vec<(String, String)> = Vec::new();
    for src in &config.sources {
        for relation in src.relations.values() {
            let target = relation.target();
            if !sources.contains_key(target) {
                return Err(QueryEngineError::Config(format!(
                    "source {} declares a relation to unknown source {target}",
                    src.name
                )));
            }
            let field = relation.reverse_index_field();
            if field != SLUG_FIELD {
                to_add.push((target.to_string(), field.to_string()));
            }
        }
    }
    for (target, field) in to_add {
        let resolved = sources.get_mut(&target).expect("checked above");
        resolved.indexes.entry(field.clone()).or_insert_with(|| IndexSpec {
            field: field.clone(),
            dir: index_dir(&config.output_root, &target, &field),
            depth: config.default_prefix_depth,
        });
    }

    Ok(ResolvedConfig {
        output_root: config.output_root.clone(),
        sources,
    })
}

/// Resolves a [`Config`] once and serves the cached result to every caller,
/// mirroring the memoize-on-first-access shape used elsewhere in this crate
/// for expensive, pure, path-dependent lookups.
pub struct ConfigResolver {
    config: Config,
    cache: Mutex<Option<Arc<ResolvedConfig>>>,
}

impl ConfigResolver {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cache: Mutex::new(None),
        }
    }

    pub fn resolve(&self) -> Result<Arc<ResolvedConfig>> {
        let mut guard = self.cache.lock();
        if let Some(resolved) = guard.as_ref() {
            return Ok(resolved.clone());
        }
        let resolved = Arc::new(resolve(&self.config)?);
        *guard = Some(resolved.clone());
        Ok(resolved)
    }

    pub fn resolve_source(&self, name: &str) -> Result<ResolvedSource> {
        let resolved = self.resolve()?;
        resolved.source(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Schema;

    fn schema() -> Schema {
        Schema::any()
    }

    #[test]
    fn slug_index_always_present() {
        let config = Config {
            sources: vec![SourceConfig {
                name: "herbs".into(),
                pattern: "content/herbs/*.md".into(),
                source_type: SourceType::Markdown,
                schema: schema(),
                relations: BTreeMap::new(),
                indexes: vec![],
            }],
            output_root: PathBuf::from("out"),
            default_prefix_depth: 2,
        };
        let resolved = resolve(&config).unwrap();
        assert!(resolved.sources["herbs"].indexes.contains_key("slug"));
    }

    #[test]
    fn reverse_index_synthesized_for_belongs_to() {
        let mut recipes_relations = BTreeMap::new();
        recipes_relations.insert(
            "herbs".to_string(),
            Relation::Direct {
                to: "herbs".into(),
                local_key: "slug".into(),
                foreign_key: "recipeSlug".into(),
                kind: DirectKind::BelongsToMany,
            },
        );
        let config = Config {
            sources: vec![
                SourceConfig {
                    name: "recipes".into(),
                    pattern: "content/recipes/*.md".into(),
                    source_type: SourceType::Markdown,
                    schema: schema(),
                    relations: recipes_relations,
                    indexes: vec![],
                },
                SourceConfig {
                    name: "herbs".into(),
                    pattern: "content/herbs/*.md".into(),
                    source_type: SourceType::Markdown,
                    schema: schema(),
                    relations: BTreeMap::new(),
                    indexes: vec![],
                },
            ],
            output_root: PathBuf::from("out"),
            default_prefix_depth: 2,
        };
        let resolved = resolve(&config).unwrap();
        assert!(resolved.sources["herbs"].indexes.contains_key("recipeSlug"));
    }

    #[test]
    fn reverse_index_skipped_when_foreign_key_is_slug() {
        let mut relations = BTreeMap::new();
        relations.insert(
            "owner".to_string(),
            Relation::Direct {
                to: "owners".into(),
                local_key: "ownerSlug".into(),
                foreign_key: "slug".into(),
                kind: DirectKind::HasOne,
            },
        );
        let config = Config {
            sources: vec![
                SourceConfig {
                    name: "items".into(),
                    pattern: "content/items/*.md".into(),
                    source_type: SourceType::Markdown,
                    schema: schema(),
                    relations,
                    indexes: vec![],
                },
                SourceConfig {
                    name: "owners".into(),
                    pattern: "content/owners/*.md".into(),
                    source_type: SourceType::Markdown,
                    schema: schema(),
                    relations: BTreeMap::new(),
                    indexes: vec![],
                },
            ],
            output_root: PathBuf::from("out"),
            default_prefix_depth: 2,
        };
        let resolved = resolve(&config).unwrap();
        // only the always-present slug index, no duplicate synthesized one
        assert_eq!(resolved.sources["owners"].indexes.len(), 1);
    }
}
