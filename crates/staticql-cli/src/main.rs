use std::process::ExitCode;

fn main() -> ExitCode {
    staticql_cli::run()
}
