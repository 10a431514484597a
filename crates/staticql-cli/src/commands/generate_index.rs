//! `generate-index`: builds the full index tree from a resolved config.
//! Exits 0 on success, non-zero on config or I/O failure.

use clap::{Arg, ArgMatches, Command};

use staticql::{ParserRegistry, build_all};

use crate::commands::CommandResult;
use crate::context::CliSession;
use crate::error::CliError;

pub fn command() -> Command {
    Command::new("generate-index")
        .about("Build the prefix-sharded index tree for every configured source")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to the staticql config file (YAML or JSON)"),
        )
        .arg(
            Arg::new("out")
                .long("out")
                .value_name("DIR")
                .help("Output directory the index tree is written under"),
        )
}

pub fn run(matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let config_path = matches.get_one::<String>("config").cloned();
    let out_dir = matches.get_one::<String>("out").cloned();
    let session = CliSession::bootstrap(config_path, out_dir)?;

    let parsers = ParserRegistry::default();
    let stats = build_all(&session.resolved, session.storage.as_ref(), &parsers)?;

    Ok(CommandResult::IndexBuilt {
        out_dir: session.resolved.index_root().display().to_string(),
        stats,
    })
}
