use std::process::ExitCode;

use clap::Parser;
use stl_repair::{logging, Cli, StlRepairError};
use tracing::{error, warn};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let jobs = match cli.jobs() {
        Ok(jobs) => jobs,
        Err(e) => return fail(&cli, &e),
    };

    let log_path = cli.log_path(&jobs);
    if let Err(e) = logging::init(cli.verbose, log_path.as_deref()) {
        // Log file could not be created; keep going with console output only.
        let fallback = logging::init(cli.verbose, None);
        if fallback.is_ok() {
            warn!("{e:#}");
        }
    }

    match stl_repair::run(&cli, &jobs) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => fail(&cli, &e),
    }
}

fn fail(cli: &Cli, e: &StlRepairError) -> ExitCode {
    if cli.verbose == 0 || !tracing::dispatcher::has_been_set() {
        eprintln!("error: {e}");
    } else {
        error!(kind = e.kind(), "{e}");
    }
    ExitCode::from(e.exit_code())
}
