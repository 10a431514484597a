use std::ffi::OsString;
use std::process::ExitCode;

use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::commands;
use crate::error::CliError;
use crate::formatter::{OutputFormat, emit_result};

const NAME: &str = "staticql";

pub fn run() -> ExitCode {
    init_tracing();
    match run_cli(std::env::args()) {
        Ok(code) => code,
        Err(err) => {
            err.print();
            err.exit_code()
        }
    }
}

/// Parses CLI arguments and dispatches to the appropriate subcommand.
/// Returns a POSIX `sysexits`-compatible `ExitCode` so automation can
/// react deterministically.
pub fn run_cli<I, S>(args: I) -> Result<ExitCode, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
{
    let command = build_cli();
    let matches = command.try_get_matches_from(args)?;

    let output = if matches.get_flag("json") {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let result = dispatch(&matches)?;
    emit_result(result, output)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn build_cli() -> Command {
    Command::new(NAME)
        .about("Static-content query engine: index generation, schema/type derivation, and query inspection")
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Emit JSON instead of human-readable text"),
        )
        .subcommand_required(true)
        .subcommand(commands::generate_index::command())
        .subcommand(commands::generate_schema::command())
        .subcommand(commands::generate_types::command())
        .subcommand(commands::query::command())
}

fn dispatch(matches: &ArgMatches) -> Result<commands::CommandResult, CliError> {
    match matches.subcommand() {
        Some(("generate-index", sub)) => commands::generate_index::run(sub),
        Some(("generate-schema", sub)) => commands::generate_schema::run(sub),
        Some(("generate-types", sub)) => commands::generate_types::run(sub),
        Some(("query", sub)) => commands::query::run(sub),
        _ => Err(CliError::new("missing command", crate::error::ExitStatus::Usage)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_subcommand_is_usage_error() {
        let err = run_cli(["staticql"]).unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::from(64));
    }
}
