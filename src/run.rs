//! A complete backup run: files, then databases, then git repositories.

use crate::backends::{database, Backup, Files, GitRepository};
use crate::config::{Configuration, RunContext};
use crate::executor::Executor;
use crate::report::{Phase, RunReport};

/// Runs all backup phases in order and reports every resource.
///
/// Resources are independent of each other: a failing resource is reported
/// and the run continues with the next one.
pub fn run(config: &Configuration, ctx: &RunContext, executor: &mut dyn Executor) -> RunReport {
    let mut report = RunReport::default();
    log::info!(target: "run", "Backup into {}", ctx.destination().display());

    let files = Files::from_config(config);
    log::info!(target: "run", "Copy files of {}", files.document_root().display());
    let result = files.backup(ctx, executor);
    report.record(Phase::Files, files.document_root().display().to_string(), result);

    log::info!(target: "run", "Dump {} database(s)", config.database_backup().len());
    database::backup_all(config.database_backup(), ctx, executor, &mut report);

    match GitRepository::from_config(config) {
        Ok(repositories) => {
            for repository in repositories {
                let result = repository.backup(ctx, executor);
                report.record(Phase::Git, repository.root().display().to_string(), result);
            }
        }
        Err(e) => report.record(Phase::Git, "repository list", Err(e)),
    }

    report
}
