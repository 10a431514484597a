//! External collaborator: the source-file parser registry.
//!
//! A named registry of parsers keyed by source type; each parser turns raw
//! file content into one or more records. Three built-ins are bundled
//! (`markdown`, `yaml`, `json`); callers can register additional ones under
//! their own source-type name.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::SourceType;
use crate::error::{QueryEngineError, Result};
use crate::value::Value;

pub type ParserFn = Arc<dyn Fn(&str) -> Result<Vec<Value>> + Send + Sync>;

pub struct ParserRegistry {
    parsers: BTreeMap<String, ParserFn>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        let mut registry = ParserRegistry {
            parsers: BTreeMap::new(),
        };
        registry.register_parser("markdown", Arc::new(parse_markdown));
        registry.register_parser("yaml", Arc::new(parse_yaml));
        registry.register_parser("json", Arc::new(parse_json));
        registry
    }
}

impl ParserRegistry {
    pub fn register_parser(&mut self, name: &str, parser: ParserFn) {
        self.parsers.insert(name.to_string(), parser);
    }

    pub fn parse(&self, source_type: SourceType, content: &str) -> Result<Vec<Value>> {
        let name = match source_type {
            SourceType::Markdown => "markdown",
            SourceType::Yaml => "yaml",
            SourceType::Json => "json",
        };
        let parser = self.parsers.get(name).ok_or_else(|| {
            QueryEngineError::Config(format!("no parser registered for source type {name}"))
        })?;
        parser(content)
    }
}

/// Splits a Markdown document into its YAML frontmatter and body. The body
/// is discarded: only the frontmatter is treated as the record ("body
/// discarded unless explicitly requested").
fn split_front_matter(content: &str) -> Option<&str> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let content = content.trim_start_matches('\n');
    let rest = content.strip_prefix("---")?;
    let rest = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n"))?;
    let end = rest.find("\n---").or_else(|| rest.find("\r\n---"))?;
    Some(&rest[..end])
}

fn parse_markdown(content: &str) -> Result<Vec<Value>> {
    let front_matter = split_front_matter(content).unwrap_or("");
    let parsed: serde_yaml::Value = serde_yaml::from_str(front_matter)?;
    Ok(vec![Value::from_yaml(parsed)])
}

fn parse_yaml(content: &str) -> Result<Vec<Value>> {
    let parsed: serde_yaml::Value = serde_yaml::from_str(content)?;
    Ok(flatten_records(Value::from_yaml(parsed)))
}

fn parse_json(content: &str) -> Result<Vec<Value>> {
    let parsed: serde_json::Value = serde_json::from_str(content)?;
    Ok(flatten_records(Value::from_json(parsed)))
}

/// A single-file-many-records source stores its records as a top-level
/// array; a file-per-record source stores one object. Both shapes are
/// accepted uniformly here, and the caller (the indexer) decides how many
/// records it expected based on whether the source's pattern has a
/// wildcard.
fn flatten_records(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}
