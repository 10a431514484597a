//! `generate-types`: derives a Rust type header from the resolved config.
//! One `struct` per source, named fields from the source's schema
//! `properties`, `Option<_>` unless the field is in `required`.

use std::fs;

use clap::{Arg, ArgMatches, Command};
use staticql::{PrimitiveType, Schema, SchemaType};

use crate::commands::CommandResult;
use crate::context::CliSession;
use crate::error::CliError;

pub fn command() -> Command {
    Command::new("generate-types")
        .about("Derive a Rust type header from the resolved config")
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
                .default_value("staticql_types.rs")
                .help("Path the derived type header is written to"),
        )
}

pub fn run(matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let config_path = matches.get_one::<String>("config").cloned();
    let output = matches
        .get_one::<String>("output")
        .cloned()
        .unwrap_or_else(|| "staticql_types.rs".to_string());
    let session = CliSession::bootstrap(config_path, None)?;

    let mut out = String::from("// Generated by `staticql generate-types`. Do not edit by hand.\n\n");
    for (name, source) in &session.resolved.sources {
        out.push_str(&format!("pub struct {} {{\n", pascal_case(name)));
        out.push_str("    pub slug: String,\n");
        for (field, field_schema) in &source.schema.properties {
            if field == "slug" {
                continue;
            }
            let required = source.schema.required.iter().any(|r| r == field);
            let ty = rust_type(field_schema);
            if required {
                out.push_str(&format!("    pub {}: {},\n", field_ident(field), ty));
            } else {
                out.push_str(&format!("    pub {}: Option<{}>,\n", field_ident(field), ty));
            }
        }
        out.push_str("}\n\n");
    }

    fs::write(&output, out)?;
    Ok(CommandResult::TypesGenerated { path: output })
}

fn rust_type(schema: &Schema) -> &'static str {
    match &schema.ty {
        Some(SchemaType::Single(PrimitiveType::String)) => "String",
        Some(SchemaType::Single(PrimitiveType::Number)) => "f64",
        Some(SchemaType::Single(PrimitiveType::Boolean)) => "bool",
        Some(SchemaType::Single(PrimitiveType::Array)) => "Vec<String>",
        Some(SchemaType::Single(PrimitiveType::Object)) => "serde_json::Value",
        Some(SchemaType::Single(PrimitiveType::Null)) => "()",
        Some(SchemaType::Union(_)) | None => "serde_json::Value",
    }
}

fn pascal_case(name: &str) -> String {
    name.split(|c: char| c == '-' || c == '_')
        .filter(|s| !s.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => format!("{}{}", first.to_ascii_uppercase(), chars.as_str()),
                None => String::new(),
            }
        })
        .collect()
}

fn field_ident(field: &str) -> String {
    field.replace('.', "_")
}
