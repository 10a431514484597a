//! `generate-schema`: derives a JSON-Schema bundle from the resolved config,
//! re-serializing the per-source `Schema` the query engine already
//! validates against.

use std::collections::BTreeMap;
use std::fs;

use clap::{Arg, ArgMatches, Command};
use serde_json::json;

use crate::commands::CommandResult;
use crate::context::CliSession;
use crate::error::{CliError, ExitStatus};

pub fn command() -> Command {
    Command::new("generate-schema")
        .about("Derive a JSON-Schema bundle from the resolved config")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to the staticql config file (YAML or JSON)"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .value_name("PATH")
                .default_value("staticql.schema.json")
                .help("Path the derived schema bundle is written to"),
        )
}

pub fn run(matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let config_path = matches.get_one::<String>("config").cloned();
    let output = matches
        .get_one::<String>("output")
        .cloned()
        .unwrap_or_else(|| "staticql.schema.json".to_string());
    let session = CliSession::bootstrap(config_path, None)?;

    let mut bundle: BTreeMap<&str, serde_json::Value> = BTreeMap::new();
    for (name, source) in &session.resolved.sources {
        let schema = serde_json::to_value(&source.schema)
            .map_err(|err| CliError::new(format!("failed to serialize schema for {name}: {err}"), ExitStatus::Software))?;
        bundle.insert(name.as_str(), json!({ "pattern": source.pattern, "schema": schema }));
    }

    let text = serde_json::to_string_pretty(&bundle)
        .map_err(|err| CliError::new(format!("failed to render schema bundle: {err}"), ExitStatus::Software))?;
    fs::write(&output, text)?;

    Ok(CommandResult::SchemaGenerated { path: output })
}
