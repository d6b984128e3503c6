//! Entry point for the `atlas` command-line interface.
#![forbid(unsafe_code)]

use std::process::ExitCode;

use atlas_cli::CliError;

fn main() -> ExitCode {
    match atlas_cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        // Clap renders help, version and usage errors itself.
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("atlas: {err}");
            ExitCode::FAILURE
        }
    }
}
