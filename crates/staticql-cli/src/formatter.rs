use std::process::ExitCode;

use serde_json::json;

use crate::commands::CommandResult;
use crate::error::CliError;

pub enum OutputFormat {
    Text,
    Json,
}

/// Renders a `CommandResult` as either human-readable text or JSON,
/// converting the outcome into a deterministic POSIX-style exit code.
pub fn emit_result(result: CommandResult, format: OutputFormat) -> Result<ExitCode, CliError> {
    match format {
        OutputFormat::Text => print_text(&result),
        OutputFormat::Json => print_json(&result)?,
    };
    Ok(ExitCode::from(result.exit_status().code()))
}

fn print_text(result: &CommandResult) {
    match result {
        CommandResult::IndexBuilt { out_dir, stats } => {
            println!(
                "Built index for {} source(s), {} record(s), at {}",
                stats.sources, stats.records, out_dir
            );
        }
        CommandResult::SchemaGenerated { path } => {
            println!("Wrote JSON-Schema bundle to {path}");
        }
        CommandResult::TypesGenerated { path } => {
            println!("Wrote Rust type header to {path}");
        }
        CommandResult::QueryPage { data, page_info } => {
            println!("{} record(s)", data.len());
            for record in data {
                println!("  {record}");
            }
            println!(
                "hasNextPage={} hasPreviousPage={}",
                page_info.has_next_page, page_info.has_previous_page
            );
            if let Some(cursor) = &page_info.end_cursor {
                println!("endCursor={cursor}");
            }
        }
    }
}

fn print_json(result: &CommandResult) -> Result<(), CliError> {
    let payload = match result {
        CommandResult::IndexBuilt { out_dir, stats } => json!({
            "command": "generate-index",
            "outDir": out_dir,
            "sources": stats.sources,
            "records": stats.records,
        }),
        CommandResult::SchemaGenerated { path } => json!({
            "command": "generate-schema",
            "path": path,
        }),
        CommandResult::TypesGenerated { path } => json!({
            "command": "generate-types",
            "path": path,
        }),
        CommandResult::QueryPage { data, page_info } => json!({
            "command": "query",
            "data": data,
            "pageInfo": page_info,
        }),
    };
    println!("{payload}");
    Ok(())
}
