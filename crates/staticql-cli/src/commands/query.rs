//! `query`: ad hoc inspection of a source through the builder, for poking
//! at a built index from a shell without writing a program against the
//! library directly.

use clap::{Arg, ArgAction, ArgMatches, Command};

use staticql::{Direction, FilterOp, FilterValue};

use crate::commands::CommandResult;
use crate::context::CliSession;
use crate::error::{CliError, ExitStatus};

pub fn command() -> Command {
    Command::new("query")
        .about("Run an ad hoc query against a built index")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to the staticql config file (YAML or JSON)"),
        )
        .arg(Arg::new("source").long("source").value_name("NAME").required(true))
        .arg(
            Arg::new("where")
                .long("where")
                .value_name("FIELD:OP:VALUE")
                .action(ArgAction::Append)
                .help("Filter, e.g. --where slug:eq:arctium-lappa or name:in:a,b"),
        )
        .arg(
            Arg::new("join")
                .long("join")
                .value_name("RELATION")
                .action(ArgAction::Append),
        )
        .arg(Arg::new("order-by").long("order-by").value_name("FIELD").default_value("slug"))
        .arg(Arg::new("desc").long("desc").action(ArgAction::SetTrue))
        .arg(Arg::new("cursor").long("cursor").value_name("TOKEN"))
        .arg(Arg::new("before").long("before").action(ArgAction::SetTrue))
        .arg(Arg::new("page-size").long("page-size").value_name("N").default_value("20"))
}

fn parse_filter(spec: &str) -> Result<(String, FilterOp, FilterValue), CliError> {
    let mut parts = spec.splitn(3, ':');
    let field = parts.next().unwrap_or_default().to_string();
    let op = parts.next().unwrap_or_default();
    let value = parts.next().unwrap_or_default();
    if field.is_empty() || op.is_empty() {
        return Err(CliError::new(format!("malformed --where {spec:?}, expected field:op:value"), ExitStatus::Usage));
    }
    match op {
        "eq" => Ok((field, FilterOp::Eq, FilterValue::One(value.to_string()))),
        "startsWith" => Ok((field, FilterOp::StartsWith, FilterValue::One(value.to_string()))),
        "in" => {
            let values = value.split(',').map(str::to_string).collect();
            Ok((field, FilterOp::In, FilterValue::Many(values)))
        }
        other => Err(CliError::new(format!("unknown filter op {other:?}"), ExitStatus::Usage)),
    }
}

pub fn run(matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let config_path = matches.get_one::<String>("config").cloned();
    let session = CliSession::bootstrap(config_path, None)?;

    let source = matches.get_one::<String>("source").expect("required").clone();
    let mut builder = session.engine.from(&source);

    if let Some(filters) = matches.get_many::<String>("where") {
        for spec in filters {
            let (field, op, value) = parse_filter(spec)?;
            builder = builder.r#where(&field, op, value);
        }
    }
    if let Some(joins) = matches.get_many::<String>("join") {
        for relation in joins {
            builder = builder.join(relation);
        }
    }

    let order_field = matches.get_one::<String>("order-by").cloned().unwrap_or_else(|| "slug".to_string());
    let desc = matches.get_flag("desc");
    builder = builder.order_by(&order_field, desc);

    let page_size: usize = matches
        .get_one::<String>("page-size")
        .and_then(|s| s.parse().ok())
        .unwrap_or(20);
    builder = builder.page_size(page_size);

    if let Some(token) = matches.get_one::<String>("cursor") {
        let direction = if matches.get_flag("before") { Direction::Before } else { Direction::After };
        builder = builder.cursor(token, direction)?;
    }

    let page = builder.exec()?;
    let data = page
        .data
        .iter()
        .map(|record| serde_json::to_value(field_map(record)).unwrap_or(serde_json::Value::Null))
        .collect();

    Ok(CommandResult::QueryPage {
        data,
        page_info: page.page_info,
    })
}

fn field_map(record: &staticql::Record) -> serde_json::Value {
    staticql_value_to_json(&record.fields)
}

fn staticql_value_to_json(value: &staticql::Value) -> serde_json::Value {
    match value {
        staticql::Value::Null => serde_json::Value::Null,
        staticql::Value::Bool(b) => serde_json::Value::Bool(*b),
        staticql::Value::Number(n) => serde_json::json!(n),
        staticql::Value::String(s) => serde_json::Value::String(s.clone()),
        staticql::Value::Array(items) => serde_json::Value::Array(items.iter().map(staticql_value_to_json).collect()),
        staticql::Value::Object(map) => {
            serde_json::Value::Object(map.iter().map(|(k, v)| (k.clone(), staticql_value_to_json(v))).collect())
        }
    }
}
