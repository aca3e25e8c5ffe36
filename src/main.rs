use std::process::ExitCode;

use clap::Parser;
use dated_backup_lib::cli::Cli;
use dated_backup_lib::config::Configuration;
use dated_backup_lib::executor::ProcessExecutor;
use dated_backup_lib::run;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // init logger
    let mut env_logger = env_logger::builder();
    env_logger.filter_level(cli.verbose);
    env_logger.try_init().expect("env_logger should not fail");

    let config = match Configuration::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            log::error!(target: "config", "Loading the config failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let dry_run = cli.dry_run();
    if dry_run {
        log::warn!("Running in dry-run mode");
    }

    let ctx = match config.resolve_destination() {
        Ok(ctx) => ctx.with_dry_run(dry_run),
        Err(e) => {
            log::error!(target: "config", "{e}");
            return ExitCode::FAILURE;
        }
    };

    let report = run::run(&config, &ctx, &mut ProcessExecutor);

    let summary = report.summary();
    if summary.is_success() {
        log::info!(target: "run", "{summary}");
        ExitCode::SUCCESS
    } else {
        log::error!(target: "run", "{summary}");
        ExitCode::FAILURE
    }
}
