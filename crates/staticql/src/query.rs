//! Query builder & executor.
//!
//! `Engine::from(source)` yields a [`Builder`]; filters/joins/ordering
//! accumulate on it, and `exec`/`peek`/`find` dispatch to the index layer,
//! the relation resolver, and the cursor pager. Planning picks between two
//! regimes: a direct index lookup
//! narrowed in-memory by subsequent filters (any filters present, including
//! a bare `slug eq`/`slug in` - the slug index is just another index), or a
//! streaming scan of the order-by field's index when no filters were given.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{ResolvedConfig, ResolvedSource, SLUG_FIELD};
use crate::cursor::{self, Cursor, Ordered, PageInfo};
use crate::error::{LoadWarning, QueryEngineError, Result};
use crate::field::resolve_field;
use crate::index::line::PrefixIndexLine;
use crate::index::shard;
use crate::index::store::{self, MatchOp};
use crate::loader::RecordLoader;
use crate::relation::resolve_relation;
use crate::value::{Record, Value};

pub use crate::cursor::Direction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    StartsWith,
    In,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

#[derive(Debug, Clone)]
pub struct PageResult {
    pub data: Vec<Record>,
    pub page_info: PageInfo,
    pub warnings: Vec<LoadWarning>,
}

#[derive(Debug, Clone)]
pub struct PeekResult {
    pub page: Vec<PrefixIndexLine>,
    pub page_info: PageInfo,
}

/// One matched record, carrying every indexed field's resolved values (the
/// same data a `PrefixIndexLine`'s `ref` entry carries for this slug) so the
/// planner can narrow and sort without a second index lookup.
#[derive(Debug, Clone)]
struct Row {
    slug: String,
    fields: BTreeMap<String, Vec<String>>,
}

impl Ordered for Row {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn order_value(&self, order_field: &str) -> Option<&str> {
        self.fields.get(order_field)?.first().map(String::as_str)
    }
}

fn lines_to_rows(lines: Vec<PrefixIndexLine>) -> Vec<Row> {
    let mut out = Vec::new();
    for line in lines {
        for (slug, fields) in line.refs {
            out.push(Row { slug, fields });
        }
    }
    out
}

fn row_to_line(row: Row, order_field: &str) -> PrefixIndexLine {
    let v = row
        .order_value(order_field)
        .map(str::to_string)
        .unwrap_or_else(|| row.slug.clone());
    let vs = shard::shard_prefix(&v, 2);
    let mut refs = BTreeMap::new();
    refs.insert(row.slug.clone(), row.fields.clone());
    PrefixIndexLine { v, vs, refs }
}

fn row_cursor(row: &Row, order_field: &str) -> Result<Cursor> {
    let value = row.order_value(order_field).ok_or_else(|| QueryEngineError::OrderByNeedsIndex {
        field: order_field.to_string(),
    })?;
    Ok(Cursor::new(row.slug.clone(), order_field, value.to_string()))
}

fn page_info_from_page(page: &[Row], has_next: bool, has_prev: bool, order_field: &str) -> Result<PageInfo> {
    let start_cursor = page.first().map(|r| row_cursor(r, order_field)).transpose()?.map(|c| c.encode()).transpose()?;
    let end_cursor = page.last().map(|r| row_cursor(r, order_field)).transpose()?.map(|c| c.encode()).transpose()?;
    Ok(PageInfo {
        has_next_page: has_next,
        has_previous_page: has_prev,
        start_cursor,
        end_cursor,
    })
}

fn ensure_order_values_present(rows: &[Row], order_field: &str) -> Result<()> {
    if rows.iter().any(|r| r.order_value(order_field).is_none()) {
        return Err(QueryEngineError::OrderByNeedsIndex {
            field: order_field.to_string(),
        });
    }
    Ok(())
}

fn filter_matches(values: &[String], op: &FilterOp, filter_value: &FilterValue) -> bool {
    match (op, filter_value) {
        (FilterOp::Eq, FilterValue::One(v)) => values.iter().any(|x| x == v),
        (FilterOp::StartsWith, FilterValue::One(v)) => values.iter().any(|x| x.starts_with(v.as_str())),
        (FilterOp::In, FilterValue::Many(vs)) => values.iter().any(|x| vs.contains(x)),
        _ => false,
    }
}

fn validate_filters(source: &ResolvedSource, filters: &[Filter]) -> Result<()> {
    for filter in filters {
        if filter.field != SLUG_FIELD && !source.indexes.contains_key(&filter.field) {
            return Err(QueryEngineError::NeedsIndex {
                source: source.name.clone(),
                filters: format!("[{{\"field\":\"{}\"}}]", filter.field),
            });
        }
        match (&filter.op, &filter.value) {
            (FilterOp::In, FilterValue::Many(_)) => {}
            (FilterOp::In, FilterValue::One(_)) => {
                return Err(QueryEngineError::Config("in filter requires a list of values".into()))
            }
            (_, FilterValue::Many(_)) => {
                return Err(QueryEngineError::Config("eq/startsWith filter requires a single value".into()))
            }
            (FilterOp::StartsWith, FilterValue::One(v)) if v.chars().count() < 2 => {
                return Err(QueryEngineError::Config("startsWith requires a value of length >= 2".into()))
            }
            _ => {}
        }
    }
    Ok(())
}

fn validate_order_field(source: &ResolvedSource, field: &str) -> Result<()> {
    if field != SLUG_FIELD && !source.indexes.contains_key(field) {
        return Err(QueryEngineError::OrderByNeedsIndex { field: field.to_string() });
    }
    Ok(())
}

fn rows_from_filter(source: &ResolvedSource, filter: &Filter) -> Result<Vec<Row>> {
    let spec = source.indexes.get(&filter.field).ok_or_else(|| QueryEngineError::MissingIndex {
        source: source.name.clone(),
        field: filter.field.clone(),
    })?;
    let lines = match (&filter.op, &filter.value) {
        (FilterOp::Eq, FilterValue::One(v)) => store::find_index_lines(&spec.dir, spec.depth, v, MatchOp::Eq)?,
        (FilterOp::StartsWith, FilterValue::One(v)) => {
            store::find_index_lines(&spec.dir, spec.depth, v, MatchOp::StartsWith)?
        }
        (FilterOp::In, FilterValue::Many(values)) => {
            let mut out = Vec::new();
            for v in values {
                out.extend(store::find_index_lines(&spec.dir, spec.depth, v, MatchOp::Eq)?);
            }
            out
        }
        _ => return Err(QueryEngineError::Config("filter op/value mismatch".into())),
    };
    Ok(lines_to_rows(lines))
}

fn row_matches_filter(row: &Row, filter: &Filter) -> bool {
    let empty = Vec::new();
    let values = row.fields.get(&filter.field).unwrap_or(&empty);
    filter_matches(values, &filter.op, &filter.value)
}

/// Resolves a dotted `relationKey.targetField` filter by walking the
/// source's entire slug roster, joining `relationKey` for each
/// record, and keeping slugs whose joined value matches. This trades the
/// index layer's usual no-full-scan guarantee for correctness on a path the
/// index doesn't cover directly (a foreign source's field, reached through a
/// join) - the slug roster scan is bounded by the source's own record count,
/// not by the target source.
fn resolve_relation_filter(
    resolved: &ResolvedConfig,
    loader: &dyn RecordLoader,
    source: &ResolvedSource,
    relation_key: &str,
    target_field: &str,
    op: &FilterOp,
    value: &FilterValue,
) -> Result<Vec<String>> {
    if !source.relations.contains_key(relation_key) {
        return Err(QueryEngineError::UnknownRelation {
            source: source.name.clone(),
            relation: relation_key.to_string(),
        });
    }

    let slug_spec = source
        .indexes
        .get(SLUG_FIELD)
        .expect("slug index is always synthesized during config resolution");
    let lines = store::collect_subtree(&slug_spec.dir, false)?;
    let mut all_slugs = Vec::new();
    for line in &lines {
        all_slugs.extend(line.refs.keys().cloned());
    }

    let records = loader.load_by_slugs(&source.name, &all_slugs)?;
    let (joined, _warnings) = resolve_relation(resolved, loader, source, relation_key, &records)?;

    let mut matched = Vec::new();
    for record in &records {
        let joined_value = joined.get(&record.slug).cloned().unwrap_or(Value::Null);
        let candidates: Vec<Value> = match joined_value {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        };
        let is_match = candidates.iter().any(|item| {
            let field_values = resolve_field(item, target_field);
            filter_matches(&field_values, op, value)
        });
        if is_match {
            matched.push(record.slug.clone());
        }
    }
    Ok(matched)
}

pub struct Engine {
    resolved: Arc<ResolvedConfig>,
    loader: Arc<dyn RecordLoader>,
}

impl Engine {
    pub fn new(resolved: Arc<ResolvedConfig>, loader: Arc<dyn RecordLoader>) -> Self {
        Self { resolved, loader }
    }

    pub fn from(&self, source: &str) -> Builder<'_> {
        Builder {
            engine: self,
            source: source.to_string(),
            filters: Vec::new(),
            joins: Vec::new(),
            order_field: SLUG_FIELD.to_string(),
            order_desc: false,
            cursor: None,
            direction: Direction::After,
            page_size: 20,
        }
    }
}

pub struct Builder<'a> {
    engine: &'a Engine,
    source: String,
    filters: Vec<Filter>,
    joins: Vec<String>,
    order_field: String,
    order_desc: bool,
    cursor: Option<Cursor>,
    direction: Direction,
    page_size: usize,
}

impl<'a> Builder<'a> {
    #[allow(clippy::should_implement_trait)]
    pub fn r#where(mut self, field: &str, op: FilterOp, value: FilterValue) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            op,
            value,
        });
        self
    }

    pub fn join(mut self, relation_key: &str) -> Self {
        self.joins.push(relation_key.to_string());
        self
    }

    pub fn order_by(mut self, field: &str, desc: bool) -> Self {
        self.order_field = field.to_string();
        self.order_desc = desc;
        self
    }

    pub fn cursor(mut self, value: &str, direction: Direction) -> Result<Self> {
        self.cursor = Some(Cursor::decode(value)?);
        self.direction = direction;
        Ok(self)
    }

    pub fn page_size(mut self, n: usize) -> Self {
        self.page_size = n.max(1);
        self
    }

    pub fn find(self, slug: &str) -> Result<Option<Record>> {
        let resolved = self.engine.resolved.clone();
        let source = resolved.source(&self.source)?;
        let mut records = self.engine.loader.load_by_slugs(&self.source, std::slice::from_ref(&slug.to_string()))?;
        let Some(record) = records.pop() else {
            return Ok(None);
        };

        let mut fields = record.fields.clone();
        for join_key in &self.joins {
            let (joined, _warnings) =
                resolve_relation(&resolved, self.engine.loader.as_ref(), source, join_key, std::slice::from_ref(&record))?;
            if let Value::Object(map) = &mut fields {
                map.insert(join_key.clone(), joined.get(&record.slug).cloned().unwrap_or(Value::Null));
            }
        }
        Ok(Some(Record { slug: record.slug, fields }))
    }

    pub fn exec(self) -> Result<PageResult> {
        let (rows, page_info) = self.plan()?;
        let resolved = self.engine.resolved.clone();
        let source = resolved.source(&self.source)?;

        let slugs: Vec<String> = rows.iter().map(|r| r.slug.clone()).collect();
        let mut records = self.engine.loader.load_by_slugs(&self.source, &slugs)?;
        let missing: Vec<&String> = slugs.iter().filter(|s| !records.iter().any(|r| &r.slug == *s)).collect();
        if !missing.is_empty() {
            return Err(QueryEngineError::Config(format!(
                "[{}] failed to materialize matched slugs: {missing:?}",
                self.source
            )));
        }
        let order: BTreeMap<&str, usize> = slugs.iter().enumerate().map(|(i, s)| (s.as_str(), i)).collect();
        records.sort_by_key(|r| order.get(r.slug.as_str()).copied().unwrap_or(usize::MAX));

        let mut warnings = Vec::new();
        let mut joined_maps: Vec<(String, BTreeMap<String, Value>)> = Vec::new();
        for join_key in &self.joins {
            let (joined, w) = resolve_relation(&resolved, self.engine.loader.as_ref(), source, join_key, &records)?;
            warnings.extend(w);
            joined_maps.push((join_key.clone(), joined));
        }

        let mut data = Vec::new();
        for record in &records {
            let mut fields = record.fields.clone();
            for (join_key, joined) in &joined_maps {
                if let Value::Object(map) = &mut fields {
                    map.insert(join_key.clone(), joined.get(&record.slug).cloned().unwrap_or(Value::Null));
                }
            }
            data.push(Record {
                slug: record.slug.clone(),
                fields,
            });
        }

        Ok(PageResult { data, page_info, warnings })
    }

    pub fn peek(self) -> Result<PeekResult> {
        let order_field = self.order_field.clone();
        let (rows, page_info) = self.plan()?;
        let page = rows.into_iter().map(|row| row_to_line(row, &order_field)).collect();
        Ok(PeekResult { page, page_info })
    }

    fn translate_filters(&self, resolved: &ResolvedConfig, source: &ResolvedSource) -> Result<Vec<Filter>> {
        let mut out = Vec::new();
        for filter in &self.filters {
            if let Some((relation_key, target_field)) = filter.field.split_once('.') {
                let matched = resolve_relation_filter(
                    resolved,
                    self.engine.loader.as_ref(),
                    source,
                    relation_key,
                    target_field,
                    &filter.op,
                    &filter.value,
                )?;
                out.push(Filter {
                    field: SLUG_FIELD.to_string(),
                    op: FilterOp::In,
                    value: FilterValue::Many(matched),
                });
            } else {
                out.push(filter.clone());
            }
        }
        Ok(out)
    }

    fn plan(&self) -> Result<(Vec<Row>, PageInfo)> {
        let resolved = self.engine.resolved.clone();
        let source = resolved.source(&self.source)?;
        let filters = self.translate_filters(&resolved, source)?;
        validate_filters(source, &filters)?;
        validate_order_field(source, &self.order_field)?;

        if filters.is_empty() {
            self.stream_regime(source)
        } else {
            self.narrowed_regime(source, &filters)
        }
    }

    fn skip_until(&self) -> Result<Option<(&str, &str)>> {
        let Some(cursor) = &self.cursor else {
            return Ok(None);
        };
        let value = cursor.order.get(&self.order_field).ok_or_else(|| {
            QueryEngineError::InvalidCursor(format!("cursor has no value for order field {}", self.order_field))
        })?;
        Ok(Some((cursor.slug.as_str(), value.as_str())))
    }

    /// No filters: stream the order-by field's index in the requested
    /// direction. Reads `pageSize + 1` lines so `hasNextPage` is cheap
    /// without materializing the whole index. Backward pagination without a
    /// preceding forward page is rarer and falls back to a full scan (same
    /// as the narrowed regime) since disambiguating "exactly full window" from
    /// "more before" needs the total count anyway.
    fn stream_regime(&self, source: &ResolvedSource) -> Result<(Vec<Row>, PageInfo)> {
        let spec = source.indexes.get(&self.order_field).ok_or_else(|| QueryEngineError::OrderByNeedsIndex {
            field: self.order_field.clone(),
        })?;
        let skip_until = self.skip_until()?;

        match self.direction {
            Direction::After => {
                let limit = self.page_size + 1;
                let lines = store::read_forward(&spec.dir, &self.order_field, limit, skip_until, self.order_desc)?;
                let rows = lines_to_rows(lines);
                ensure_order_values_present(&rows, &self.order_field)?;
                let has_next = rows.len() > self.page_size;
                let page: Vec<Row> = rows.into_iter().take(self.page_size).collect();
                let has_prev = self.cursor.is_some();
                let page_info = page_info_from_page(&page, has_next, has_prev, &self.order_field)?;
                Ok((page, page_info))
            }
            Direction::Before => {
                let all_lines = store::collect_subtree(&spec.dir, self.order_desc)?;
                let rows = lines_to_rows(all_lines);
                ensure_order_values_present(&rows, &self.order_field)?;
                let start = cursor::get_start_idx(&rows, &self.order_field, self.cursor.as_ref())?;
                let has_cursor = self.cursor.is_some();
                let page = cursor::get_page_slice(&rows, start, self.page_size, has_cursor, Direction::Before);
                let page_info =
                    cursor::create_page_info(&rows, start, self.page_size, has_cursor, Direction::Before, &self.order_field)?;
                Ok((page, page_info))
            }
        }
    }

    /// At least one filter. The slug index is just another index, so
    /// `slug eq`/`slug in` needs no special case - the
    /// first filter is resolved via `findIndexLines`, every subsequent
    /// filter narrows in-memory against the `ref` data every matched line
    /// already carries: a line's `ref` entry holds every indexed field,
    /// not only the one its own directory covers.
    fn narrowed_regime(&self, source: &ResolvedSource, filters: &[Filter]) -> Result<(Vec<Row>, PageInfo)> {
        let (first, rest) = filters.split_first().expect("non-empty per caller");
        let mut rows = rows_from_filter(source, first)?;
        for filter in rest {
            rows.retain(|row| row_matches_filter(row, filter));
        }

        // A multi-valued indexed field matched by more than one of its values
        // under an `in` filter yields one `Row` per matched index line, all
        // sharing a slug - narrow to one row per slug before sorting/paging.
        let mut seen = std::collections::HashSet::new();
        rows.retain(|row| seen.insert(row.slug.clone()));

        ensure_order_values_present(&rows, &self.order_field)?;
        rows.sort_by(|a, b| {
            let av = a.order_value(&self.order_field).unwrap_or("");
            let bv = b.order_value(&self.order_field).unwrap_or("");
            if self.order_desc {
                bv.cmp(av)
            } else {
                av.cmp(bv)
            }
        });

        let start = cursor::get_start_idx(&rows, &self.order_field, self.cursor.as_ref())?;
        let has_cursor = self.cursor.is_some();
        let page = cursor::get_page_slice(&rows, start, self.page_size, has_cursor, self.direction);
        let page_info = cursor::create_page_info(&rows, start, self.page_size, has_cursor, self.direction, &self.order_field)?;
        Ok((page, page_info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ConfigResolver, DirectKind, Relation, SourceConfig, SourceType};
    use crate::index::build::build_all;
    use crate::parser::ParserRegistry;
    use crate::storage::{LocalFsStorage, Storage};
    use crate::validator::Schema;
    use std::collections::BTreeMap as Map;
    use std::fs;

    fn herbs_fixture() -> (tempfile::TempDir, Arc<ResolvedConfig>) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("herbs")).unwrap();
        let herbs = [
            ("arctium-lappa", "ゴボウ"),
            ("centella-asiatica", "ツボクサ"),
            ("cymbopogon-citratus", "レモングラス"),
        ];
        for (slug, name) in herbs {
            fs::write(
                dir.path().join(format!("herbs/{slug}.md")),
                format!("---\nslug: {slug}\nname: {name}\n---\n"),
            )
            .unwrap();
        }

        let config = Config {
            sources: vec![SourceConfig {
                name: "herbs".into(),
                pattern: "herbs/*.md".into(),
                source_type: SourceType::Markdown,
                schema: Schema::any(),
                relations: Map::new(),
                indexes: vec![crate::config::IndexDeclaration {
                    field: "name".into(),
                    depth: None,
                }],
            }],
            output_root: dir.path().to_path_buf(),
            default_prefix_depth: 2,
        };
        let resolved = ConfigResolver::new(config).resolve().unwrap();
        let storage = LocalFsStorage::new(dir.path());
        build_all(&resolved, &storage, &ParserRegistry::default()).unwrap();
        (dir, resolved)
    }

    fn engine_for(resolved: Arc<ResolvedConfig>, root: &std::path::Path) -> Engine {
        let storage: Arc<dyn Storage> = Arc::new(LocalFsStorage::new(root));
        let loader = Arc::new(crate::loader::FileRecordLoader::new(
            resolved.clone(),
            storage,
            Arc::new(ParserRegistry::default()),
        ));
        Engine::new(resolved, loader)
    }

    #[test]
    fn empty_query_orders_by_slug_ascending() {
        let (dir, resolved) = herbs_fixture();
        let engine = engine_for(resolved, dir.path());
        let page = engine.from("herbs").order_by("slug", false).page_size(20).exec().unwrap();
        assert_eq!(
            page.data.iter().map(|r| r.slug.as_str()).collect::<Vec<_>>(),
            vec!["arctium-lappa", "centella-asiatica", "cymbopogon-citratus"]
        );
        assert!(!page.page_info.has_next_page);
        assert!(!page.page_info.has_previous_page);
    }

    #[test]
    fn eq_filter_on_slug_returns_single_record() {
        let (dir, resolved) = herbs_fixture();
        let engine = engine_for(resolved, dir.path());
        let page = engine
            .from("herbs")
            .r#where("slug", FilterOp::Eq, FilterValue::One("arctium-lappa".into()))
            .exec()
            .unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].get("name").and_then(Value::as_str), Some("ゴボウ"));
    }

    #[test]
    fn unindexed_filter_field_needs_index() {
        let (dir, resolved) = herbs_fixture();
        let engine = engine_for(resolved, dir.path());
        let err = engine
            .from("herbs")
            .r#where("overview", FilterOp::Eq, FilterValue::One("x".into()))
            .exec()
            .unwrap_err();
        assert!(matches!(err, QueryEngineError::NeedsIndex { .. }));
    }

    #[test]
    fn cursor_continues_pagination_by_indexed_field() {
        let (dir, resolved) = herbs_fixture();
        let engine = engine_for(resolved.clone(), dir.path());
        let first = engine.from("herbs").order_by("name", false).page_size(2).exec().unwrap();
        assert_eq!(first.data.len(), 2);
        assert!(first.page_info.has_next_page);
        assert!(!first.page_info.has_previous_page);

        let end_cursor = first.page_info.end_cursor.clone().unwrap();
        let engine2 = engine_for(resolved, dir.path());
        let second = engine2
            .from("herbs")
            .order_by("name", false)
            .page_size(2)
            .cursor(&end_cursor, Direction::After)
            .unwrap()
            .exec()
            .unwrap();
        assert_eq!(second.data.len(), 1);
        assert!(!second.page_info.has_next_page);
        assert!(second.page_info.has_previous_page);
    }

    #[test]
    fn direct_has_one_join_attaches_target_record() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("herbs")).unwrap();
        fs::create_dir_all(dir.path().join("recipes")).unwrap();
        fs::write(
            dir.path().join("herbs/arctium-lappa.md"),
            "---\nslug: arctium-lappa\nname: ゴボウ\n---\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("recipes/tea.md"),
            "---\nslug: tea\nprimaryHerb: arctium-lappa\n---\n",
        )
        .unwrap();

        let mut relations = Map::new();
        relations.insert(
            "primaryHerb".to_string(),
            Relation::Direct {
                to: "herbs".into(),
                local_key: "primaryHerb".into(),
                foreign_key: "slug".into(),
                kind: DirectKind::HasOne,
            },
        );
        let config = Config {
            sources: vec![
                SourceConfig {
                    name: "recipes".into(),
                    pattern: "recipes/*.md".into(),
                    source_type: SourceType::Markdown,
                    schema: Schema::any(),
                    relations,
                    indexes: vec![],
                },
                SourceConfig {
                    name: "herbs".into(),
                    pattern: "herbs/*.md".into(),
                    source_type: SourceType::Markdown,
                    schema: Schema::any(),
                    relations: Map::new(),
                    indexes: vec![],
                },
            ],
            output_root: dir.path().to_path_buf(),
            default_prefix_depth: 2,
        };
        let resolved = ConfigResolver::new(config).resolve().unwrap();
        let storage = LocalFsStorage::new(dir.path());
        build_all(&resolved, &storage, &ParserRegistry::default()).unwrap();

        let engine = engine_for(resolved, dir.path());
        let page = engine.from("recipes").join("primaryHerb").exec().unwrap();
        assert_eq!(page.data.len(), 1);
        let joined = page.data[0].get("primaryHerb").unwrap();
        assert_eq!(joined.get("name").and_then(Value::as_str), Some("ゴボウ"));
    }
}
