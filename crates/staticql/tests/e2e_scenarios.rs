//! End-to-end coverage against a fully built index tree: ordering,
//! direct slug lookup, cursor pagination, missing-index rejection,
//! through-relation joins, and incremental rebuilds.

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use staticql::{
    Config, ConfigResolver, Direction, DirectKind, FileRecordLoader, FilterOp, FilterValue,
    IndexDeclaration, LocalFsStorage, ParserRegistry, QueryEngineError, RelationConfig as Relation,
    ResolvedConfig, Schema, SourceConfig, SourceType, Storage, ThroughKind, Value,
};
use staticql::{Engine, RecordLoader, apply_diff, build_all, DiffEntry, DiffStatus};

fn write_markdown(dir: &std::path::Path, rel: &str, frontmatter: &[(&str, &str)]) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut body = String::from("---\n");
    for (k, v) in frontmatter {
        body.push_str(&format!("{k}: {v}\n"));
    }
    body.push_str("---\n");
    fs::write(path, body).unwrap();
}

struct Fixture {
    _dir: tempfile::TempDir,
    resolved: Arc<ResolvedConfig>,
    engine: Engine,
}

/// `herbs` source with three records, `name` indexed, no relations.
fn herbs_fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    write_markdown(dir.path(), "herbs/arctium-lappa.md", &[("slug", "arctium-lappa"), ("name", "\u{30b4}\u{30dc}\u{30a6}")]);
    write_markdown(dir.path(), "herbs/centella-asiatica.md", &[("slug", "centella-asiatica"), ("name", "\u{30c4}\u{30dc}\u{30af}\u{30b5}")]);
    write_markdown(
        dir.path(),
        "herbs/cymbopogon-citratus.md",
        &[("slug", "cymbopogon-citratus"), ("name", "\u{30ec}\u{30e2}\u{30f3}\u{30b0}\u{30e9}\u{30b9}")],
    );

    let config = Config {
        sources: vec![SourceConfig {
            name: "herbs".into(),
            pattern: "herbs/*.md".into(),
            source_type: SourceType::Markdown,
            schema: Schema::any(),
            relations: BTreeMap::new(),
            indexes: vec![IndexDeclaration { field: "name".into(), depth: None }],
        }],
        output_root: dir.path().to_path_buf(),
        default_prefix_depth: 2,
    };
    let resolved = ConfigResolver::new(config).resolve().unwrap();
    let storage = LocalFsStorage::new(dir.path());
    build_all(&resolved, &storage, &ParserRegistry::default()).unwrap();

    let engine = engine_for(resolved.clone(), dir.path());
    Fixture { _dir: dir, resolved, engine }
}

fn engine_for(resolved: Arc<ResolvedConfig>, root: &std::path::Path) -> Engine {
    let storage: Arc<dyn Storage> = Arc::new(LocalFsStorage::new(root));
    let loader: Arc<dyn RecordLoader> =
        Arc::new(FileRecordLoader::new(resolved.clone(), storage, Arc::new(ParserRegistry::default())));
    Engine::new(resolved, loader)
}

#[test]
fn empty_query_orders_by_slug_ascending() {
    let fixture = herbs_fixture();
    let page = fixture.engine.from("herbs").order_by("slug", false).page_size(20).exec().unwrap();
    assert_eq!(
        page.data.iter().map(|r| r.slug.as_str()).collect::<Vec<_>>(),
        vec!["arctium-lappa", "centella-asiatica", "cymbopogon-citratus"]
    );
    assert!(!page.page_info.has_next_page);
    assert!(!page.page_info.has_previous_page);
}

#[test]
fn slug_eq_returns_one_record() {
    let fixture = herbs_fixture();
    let page = fixture
        .engine
        .from("herbs")
        .r#where("slug", FilterOp::Eq, FilterValue::One("arctium-lappa".into()))
        .exec()
        .unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].get("name").and_then(Value::as_str), Some("\u{30b4}\u{30dc}\u{30a6}"));
}

#[test]
fn pagesize_two_then_cursor_continues() {
    let fixture = herbs_fixture();
    // name order: arctium-lappa (ゴボウ, U+30B4...) < centella-asiatica (ツボクサ, U+30C4...)
    // < cymbopogon-citratus (レモングラス, U+30EC...) under code point order on the indexed `name` field.
    let first = fixture.engine.from("herbs").order_by("name", false).page_size(2).exec().unwrap();
    assert_eq!(first.data.len(), 2);
    assert_eq!(
        first.data.iter().map(|r| r.slug.as_str()).collect::<Vec<_>>(),
        vec!["arctium-lappa", "centella-asiatica"]
    );
    assert!(first.page_info.has_next_page);
    assert!(!first.page_info.has_previous_page);

    let end_cursor = first.page_info.end_cursor.clone().unwrap();
    let engine2 = engine_for(fixture.resolved.clone(), fixture._dir.path());
    let second = engine2
        .from("herbs")
        .order_by("name", false)
        .page_size(2)
        .cursor(&end_cursor, Direction::After)
        .unwrap()
        .exec()
        .unwrap();
    assert_eq!(second.data.iter().map(|r| r.slug.as_str()).collect::<Vec<_>>(), vec!["cymbopogon-citratus"]);
    assert!(!second.page_info.has_next_page);
    assert!(second.page_info.has_previous_page);
}

#[test]
fn unindexed_filter_needs_index() {
    let fixture = herbs_fixture();
    let err = fixture
        .engine
        .from("herbs")
        .r#where("overview", FilterOp::Eq, FilterValue::One("x".into()))
        .exec()
        .unwrap_err();
    match err {
        QueryEngineError::NeedsIndex { source, filters } => {
            assert_eq!(source, "herbs");
            assert!(filters.contains("overview"));
        }
        other => panic!("expected NeedsIndex, got {other:?}"),
    }
}

/// `recipes` --through `recipeGroups`--> `herbs`.
fn recipes_fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    write_markdown(dir.path(), "herbs/arctium-lappa.md", &[("slug", "arctium-lappa"), ("name", "gobo")]);
    write_markdown(dir.path(), "herbs/centella-asiatica.md", &[("slug", "centella-asiatica"), ("name", "gotu-kola")]);
    write_markdown(dir.path(), "recipes/tea.md", &[("slug", "tea")]);
    write_markdown(
        dir.path(),
        "recipe-groups/tea-arctium.md",
        &[("slug", "tea-arctium"), ("recipeSlug", "tea"), ("herbSlug", "arctium-lappa")],
    );
    write_markdown(
        dir.path(),
        "recipe-groups/tea-centella.md",
        &[("slug", "tea-centella"), ("recipeSlug", "tea"), ("herbSlug", "centella-asiatica")],
    );

    let mut relations = BTreeMap::new();
    relations.insert(
        "herbs".to_string(),
        Relation::Through {
            to: "herbs".into(),
            through: "recipeGroups".into(),
            source_local_key: "slug".into(),
            through_foreign_key: "recipeSlug".into(),
            through_local_key: "herbSlug".into(),
            target_foreign_key: "slug".into(),
            kind: ThroughKind::HasManyThrough,
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
                name: "recipeGroups".into(),
                pattern: "recipe-groups/*.md".into(),
                source_type: SourceType::Markdown,
                schema: Schema::any(),
                relations: BTreeMap::new(),
                indexes: vec![IndexDeclaration { field: "recipeSlug".into(), depth: None }],
            },
            SourceConfig {
                name: "herbs".into(),
                pattern: "herbs/*.md".into(),
                source_type: SourceType::Markdown,
                schema: Schema::any(),
                relations: BTreeMap::new(),
                indexes: vec![IndexDeclaration { field: "name".into(), depth: None }],
            },
        ],
        output_root: dir.path().to_path_buf(),
        default_prefix_depth: 2,
    };
    let resolved = ConfigResolver::new(config).resolve().unwrap();
    let storage = LocalFsStorage::new(dir.path());
    build_all(&resolved, &storage, &ParserRegistry::default()).unwrap();

    let engine = engine_for(resolved.clone(), dir.path());
    Fixture { _dir: dir, resolved, engine }
}

#[test]
fn through_join_attaches_two_herbs() {
    let fixture = recipes_fixture();
    let page = fixture
        .engine
        .from("recipes")
        .join("herbs")
        .r#where("herbs.slug", FilterOp::In, FilterValue::Many(vec!["centella-asiatica".into()]))
        .exec()
        .unwrap();
    assert_eq!(page.data.len(), 1);
    let herbs = page.data[0].get("herbs").unwrap().as_array().unwrap();
    assert_eq!(herbs.len(), 2);
}

#[test]
fn incremental_add_then_delete_via_full_rebuild_cycle() {
    let fixture = herbs_fixture();
    let dir = fixture._dir.path();

    write_markdown(dir, "herbs/rosmarinus-officinalis.md", &[("slug", "rosmarinus-officinalis"), ("name", "\u{30ed}\u{30fc}\u{30ba}\u{30de}\u{30ea}\u{30fc}")]);
    let storage = LocalFsStorage::new(dir);
    build_all(&fixture.resolved, &storage, &ParserRegistry::default()).unwrap();

    let engine2 = engine_for(fixture.resolved.clone(), dir);
    let found = engine2
        .from("herbs")
        .r#where("name", FilterOp::StartsWith, FilterValue::One("\u{30ed}\u{30fc}".into()))
        .exec()
        .unwrap();
    assert_eq!(found.data.len(), 1);
    assert_eq!(found.data[0].slug, "rosmarinus-officinalis");

    fs::remove_file(dir.join("herbs/rosmarinus-officinalis.md")).unwrap();
    build_all(&fixture.resolved, &storage, &ParserRegistry::default()).unwrap();

    let engine3 = engine_for(fixture.resolved.clone(), dir);
    let gone = engine3
        .from("herbs")
        .r#where("name", FilterOp::StartsWith, FilterValue::One("\u{30ed}\u{30fc}".into()))
        .exec()
        .unwrap();
    assert!(gone.data.is_empty());
}

#[test]
fn incremental_add_then_delete_round_trips_to_prior_state() {
    let fixture = herbs_fixture();
    let dir = fixture._dir.path();

    let before = fixture.engine.from("herbs").order_by("slug", false).page_size(20).exec().unwrap();
    let before_slugs: Vec<String> = before.data.iter().map(|r| r.slug.clone()).collect();

    let mut added_fields = BTreeMap::new();
    added_fields.insert("slug".to_string(), vec!["rosmarinus-officinalis".to_string()]);
    added_fields.insert("name".to_string(), vec!["\u{30ed}\u{30fc}\u{30ba}\u{30de}\u{30ea}\u{30fc}".to_string()]);
    apply_diff(
        &fixture.resolved,
        &[DiffEntry {
            status: DiffStatus::Added,
            source: "herbs".to_string(),
            slug: "rosmarinus-officinalis".to_string(),
            fields: Some(added_fields),
        }],
    )
    .unwrap();

    let engine_after_add = engine_for(fixture.resolved.clone(), dir);
    let after_add = engine_after_add
        .from("herbs")
        .r#where("slug", FilterOp::Eq, FilterValue::One("rosmarinus-officinalis".into()))
        .exec()
        .unwrap();
    assert_eq!(after_add.data.len(), 1);

    apply_diff(
        &fixture.resolved,
        &[DiffEntry {
            status: DiffStatus::Deleted,
            source: "herbs".to_string(),
            slug: "rosmarinus-officinalis".to_string(),
            fields: None,
        }],
    )
    .unwrap();

    let engine_after_delete = engine_for(fixture.resolved.clone(), dir);
    let after_delete = engine_after_delete
        .from("herbs")
        .r#where("slug", FilterOp::Eq, FilterValue::One("rosmarinus-officinalis".into()))
        .exec()
        .unwrap();
    assert!(after_delete.data.is_empty());

    let restored = engine_after_delete.from("herbs").order_by("slug", false).page_size(20).exec().unwrap();
    let restored_slugs: Vec<String> = restored.data.iter().map(|r| r.slug.clone()).collect();
    assert_eq!(restored_slugs, before_slugs);
}

#[test]
fn belongs_to_many_join_resolves_reverse_relation() {
    let dir = tempfile::tempdir().unwrap();
    write_markdown(dir.path(), "owners/alice.md", &[("slug", "alice")]);
    write_markdown(dir.path(), "owners/bob.md", &[("slug", "bob")]);
    write_markdown(dir.path(), "items/mug.md", &[("slug", "mug"), ("ownerSlug", "alice")]);
    write_markdown(dir.path(), "items/plate.md", &[("slug", "plate"), ("ownerSlug", "alice")]);

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
    let mut owner_relations = BTreeMap::new();
    owner_relations.insert(
        "items".to_string(),
        Relation::Direct {
            to: "items".into(),
            local_key: "slug".into(),
            foreign_key: "ownerSlug".into(),
            kind: DirectKind::BelongsToMany,
        },
    );

    let config = Config {
        sources: vec![
            SourceConfig {
                name: "items".into(),
                pattern: "items/*.md".into(),
                source_type: SourceType::Markdown,
                schema: Schema::any(),
                relations,
                indexes: vec![],
            },
            SourceConfig {
                name: "owners".into(),
                pattern: "owners/*.md".into(),
                source_type: SourceType::Markdown,
                schema: Schema::any(),
                relations: owner_relations,
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
    let page = engine.from("owners").join("items").r#where("slug", FilterOp::Eq, FilterValue::One("alice".into())).exec().unwrap();
    assert_eq!(page.data.len(), 1);
    let items = page.data[0].get("items").unwrap().as_array().unwrap();
    assert_eq!(items.len(), 2);
}
