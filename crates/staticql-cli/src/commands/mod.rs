pub mod generate_index;
pub mod generate_schema;
pub mod generate_types;
pub mod query;

use staticql::{BuildStats, PageInfo};

use crate::error::ExitStatus;

/// Outcome of a dispatched subcommand, rendered by the formatter as text or JSON.
#[derive(Debug, Clone)]
pub enum CommandResult {
    IndexBuilt {
        out_dir: String,
        stats: BuildStats,
    },
    SchemaGenerated {
        path: String,
    },
    TypesGenerated {
        path: String,
    },
    QueryPage {
        data: Vec<serde_json::Value>,
        page_info: PageInfo,
    },
}

impl CommandResult {
    pub fn exit_status(&self) -> ExitStatus {
        ExitStatus::Ok
    }
}
