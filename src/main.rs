// Headless front end: parse arguments, start the session log, run the batch.

mod cli;
mod logger;

use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    let args = cli::CliArgs::parse();
    logger::init(args.verbose);
    if let Some(path) = logger::log_path() {
        log::debug!("session log at {}", path.display());
    }
    cli::run(args)
}
