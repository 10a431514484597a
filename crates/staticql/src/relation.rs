//! Relation resolver.
//!
//! Given a loaded record set and a relation declaration, produces the
//! joined values using the index layer for key-to-slug lookup rather than a
//! full scan of the target source.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{DirectKind, Relation, ResolvedConfig, ResolvedSource, ThroughKind};
use crate::error::{LoadWarning, QueryEngineError, Result};
use crate::field::resolve_field;
use crate::index::store::{find_index_lines, MatchOp};
use crate::loader::RecordLoader;
use crate::value::{Record, Value};

/// Resolves `relation_key` for every record in `records`, returning the
/// joined value to attach under the relation's key, keyed by the base
/// record's slug, plus any partial-materialization warnings.
pub fn resolve_relation(
    resolved: &ResolvedConfig,
    loader: &dyn RecordLoader,
    source: &ResolvedSource,
    relation_key: &str,
    records: &[Record],
) -> Result<(BTreeMap<String, Value>, Vec<LoadWarning>)> {
    let relation = source
        .relations
        .get(relation_key)
        .ok_or_else(|| QueryEngineError::UnknownRelation {
            source: source.name.clone(),
            relation: relation_key.to_string(),
        })?;

    match relation {
        Relation::Direct {
            to,
            local_key,
            foreign_key,
            kind,
        } => resolve_direct(resolved, loader, to, local_key, foreign_key, *kind, records),
        Relation::Through {
            to,
            through,
            source_local_key,
            through_foreign_key,
            through_local_key,
            target_foreign_key,
            kind,
        } => resolve_through(
            resolved,
            loader,
            to,
            through,
            source_local_key,
            through_foreign_key,
            through_local_key,
            target_foreign_key,
            *kind,
            records,
        ),
    }
}

fn collect_unique(records: &[Record], field: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = BTreeSet::new();
    for record in records {
        for v in resolve_field(&record.fields, field) {
            if seen.insert(v.clone()) {
                out.push(v);
            }
        }
    }
    out
}

fn load_with_warnings(loader: &dyn RecordLoader, source: &str, slugs: &[String]) -> Result<(Vec<Record>, Vec<LoadWarning>)> {
    let loaded = loader.load_by_slugs(source, slugs)?;
    let mut warnings = Vec::new();
    for slug in slugs {
        if !loaded.iter().any(|r| &r.slug == slug) {
            warnings.push(LoadWarning {
                source: source.to_string(),
                slug: slug.clone(),
                message: "target not found while resolving join".to_string(),
            });
        }
    }
    Ok((loaded, warnings))
}

fn attach(matches: Vec<&Record>, many: bool) -> Value {
    if many {
        Value::Array(matches.into_iter().map(|r| r.fields.clone()).collect())
    } else {
        matches.first().map(|r| r.fields.clone()).unwrap_or(Value::Null)
    }
}

#[allow(clippy::too_many_arguments)]
fn resolve_direct(
    resolved: &ResolvedConfig,
    loader: &dyn RecordLoader,
    to: &str,
    local_key: &str,
    foreign_key: &str,
    kind: DirectKind,
    records: &[Record],
) -> Result<(BTreeMap<String, Value>, Vec<LoadWarning>)> {
    let many = matches!(kind, DirectKind::HasMany | DirectKind::BelongsToMany);

    if matches!(kind, DirectKind::HasOne | DirectKind::HasMany) {
        let slugs = collect_unique(records, local_key);
        let (loaded, warnings) = load_with_warnings(loader, to, &slugs)?;

        let mut out = BTreeMap::new();
        for record in records {
            let locals: BTreeSet<String> = resolve_field(&record.fields, local_key).into_iter().collect();
            let matches: Vec<&Record> = loaded.iter().filter(|r| locals.contains(&r.slug)).collect();
            out.insert(record.slug.clone(), attach(matches, many));
        }
        Ok((out, warnings))
    } else {
        resolve_direct_belongs_to(resolved, loader, to, local_key, foreign_key, many, records)
    }
}

/// belongsTo*/belongsToMany needs `to`'s resolved index spec, so it takes the
/// full [`ResolvedConfig`] rather than just a loader. Split out from
/// [`resolve_direct`] to keep that function's signature free of it for the
/// has*/hasMany branch.
fn resolve_direct_belongs_to(
    resolved: &ResolvedConfig,
    loader: &dyn RecordLoader,
    to: &str,
    local_key: &str,
    foreign_key: &str,
    many: bool,
    records: &[Record],
) -> Result<(BTreeMap<String, Value>, Vec<LoadWarning>)> {
    let locals = collect_unique(records, local_key);
    let target = resolved.source(to)?;
    let spec = target
        .indexes
        .get(foreign_key)
        .ok_or_else(|| QueryEngineError::MissingIndex {
            source: to.to_string(),
            field: foreign_key.to_string(),
        })?;

    let mut candidate_slugs = Vec::new();
    let mut seen = BTreeSet::new();
    for local in &locals {
        let lines = find_index_lines(&spec.dir, spec.depth, local, MatchOp::Eq)?;
        for line in lines {
            for slug in line.refs.keys() {
                if seen.insert(slug.clone()) {
                    candidate_slugs.push(slug.clone());
                }
            }
        }
    }

    let (loaded, warnings) = load_with_warnings(loader, to, &candidate_slugs)?;

    let mut out = BTreeMap::new();
    for record in records {
        let locals: BTreeSet<String> = resolve_field(&record.fields, local_key).into_iter().collect();
        let matches: Vec<&Record> = loaded
            .iter()
            .filter(|target_record| {
                resolve_field(&target_record.fields, foreign_key)
                    .iter()
                    .any(|fk| locals.contains(fk))
            })
            .collect();
        out.insert(record.slug.clone(), attach(matches, many));
    }
    Ok((out, warnings))
}

#[allow(clippy::too_many_arguments)]
fn resolve_through(
    resolved: &ResolvedConfig,
    loader: &dyn RecordLoader,
    to: &str,
    through: &str,
    source_local_key: &str,
    through_foreign_key: &str,
    through_local_key: &str,
    target_foreign_key: &str,
    kind: ThroughKind,
    records: &[Record],
) -> Result<(BTreeMap<String, Value>, Vec<LoadWarning>)> {
    let many = matches!(kind, ThroughKind::HasManyThrough);

    let through_source = resolved.source(through)?;
    let through_spec = through_source
        .indexes
        .get(through_foreign_key)
        .ok_or_else(|| QueryEngineError::MissingIndex {
            source: through.to_string(),
            field: through_foreign_key.to_string(),
        })?;

    let target_source = resolved.source(to)?;
    let target_spec = target_source
        .indexes
        .get(target_foreign_key)
        .ok_or_else(|| QueryEngineError::MissingIndex {
            source: to.to_string(),
            field: target_foreign_key.to_string(),
        })?;

    let mut out = BTreeMap::new();
    let mut warnings = Vec::new();

    for record in records {
        let locals = resolve_field(&record.fields, source_local_key);

        let mut intermediate_slugs = Vec::new();
        let mut seen = BTreeSet::new();
        for local in &locals {
            let lines = find_index_lines(&through_spec.dir, through_spec.depth, local, MatchOp::Eq)?;
            for line in lines {
                for slug in line.refs.keys() {
                    if seen.insert(slug.clone()) {
                        intermediate_slugs.push(slug.clone());
                    }
                }
            }
        }
        let (intermediates, mut w) = load_with_warnings(loader, through, &intermediate_slugs)?;
        warnings.append(&mut w);

        let mut through_locals = Vec::new();
        let mut seen2 = BTreeSet::new();
        for intermediate in &intermediates {
            for v in resolve_field(&intermediate.fields, through_local_key) {
                if seen2.insert(v.clone()) {
                    through_locals.push(v);
                }
            }
        }

        let mut target_slugs = Vec::new();
        let mut seen3 = BTreeSet::new();
        for local in &through_locals {
            let lines = find_index_lines(&target_spec.dir, target_spec.depth, local, MatchOp::Eq)?;
            for line in lines {
                for slug in line.refs.keys() {
                    if seen3.insert(slug.clone()) {
                        target_slugs.push(slug.clone());
                    }
                }
            }
        }

        let (targets, mut w2) = load_with_warnings(loader, to, &target_slugs)?;
        warnings.append(&mut w2);

        out.insert(record.slug.clone(), attach(targets.iter().collect(), many));
    }

    Ok((out, warnings))
}
