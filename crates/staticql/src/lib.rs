//! staticql: a query engine over prefix-sharded JSONL indexes built from a
//! static content tree (Markdown frontmatter, YAML, or JSON records).
//!
//! The crate is organized into a path/slug codec, a field resolver, a
//! config resolver, the index codec and sharding layer, the relation
//! resolver, the cursor pager, and the query builder/executor. Everything
//! above the storage/parser/validator seams is synchronous - see the
//! `query` module for the planner and `index::build`/`index::update` for
//! how an index gets built and kept current.

pub mod config;
pub mod cursor;
pub mod diff;
pub mod error;
pub mod field;
pub mod index;
pub mod loader;
pub mod parser;
pub mod path;
pub mod query;
pub mod relation;
pub mod storage;
pub mod validator;
pub mod value;

pub use config::{
    Config, ConfigResolver, DirectKind, IndexDeclaration, IndexSpec, Relation as RelationConfig,
    ResolvedConfig, ResolvedSource, SourceConfig, SourceType, ThroughKind, SLUG_FIELD,
};
pub use cursor::{Cursor, Direction, Ordered, PageInfo};
pub use diff::{DiffProvider, FilesystemDiffProvider, PathDiffEntry, PathDiffStatus};
pub use error::{LoadWarning, QueryEngineError, Result};
pub use index::{apply_diff, build_all, BuildStats, DiffEntry, DiffStatus, PrefixIndexLine};
pub use loader::{FileRecordLoader, RecordLoader};
pub use parser::ParserRegistry;
pub use query::{Builder, Engine, Filter, FilterOp, FilterValue, PageResult, PeekResult};
pub use relation::resolve_relation;
pub use storage::{LocalFsStorage, Storage};
pub use validator::{PrimitiveType, Schema, SchemaError, SchemaType};
pub use value::{Record, Value};
