//! Backend modules for performing individual backup tasks.
//!
//! Currently the following backends are implemented:
//!
//! - [Files]: Copy of selected paths below the document root using `rsync`.
//! - [Database]: Native dump of a MySQL, PostgreSQL, MongoDB or SQLite database.
//! - [GitRepository]: Commit and push of all changes in a git repository.

pub mod database;
pub mod files;
pub mod git;

pub use database::{ConnectionType, Database, DispatchError};
pub use files::Files;
pub use git::GitRepository;

use std::io;
use std::path::PathBuf;

use derive_more::{Display, Error, From};

use crate::config::RunContext;
use crate::executor::{CommandLine, CommandResult, Executor};

/// Generic backup backend.
pub trait Backup {
    /// Log target of the backend.
    fn target(&self) -> &'static str;

    /// Builds the command backing up the resource into the run's destination.
    fn command(&self, ctx: &RunContext) -> CommandLine;

    /// Backups the resource managed by the implementation.
    ///
    /// A non-zero exit code of the backup tool is part of the returned
    /// [CommandResult], not an error.
    fn backup(
        &self,
        ctx: &RunContext,
        executor: &mut dyn Executor,
    ) -> Result<CommandResult, BackupError> {
        let command = self.command(ctx);
        log::debug!(target: self.target(), "Running: {command}");

        executor
            .execute(&command)
            .map_err(|source| BackupError::Launch {
                command: command.to_string(),
                source,
            })
    }
}

#[derive(Debug, Display, Error, From)]
/// Errors aborting the backup of a single resource.
pub enum BackupError {
    /// The database resource can't be dispatched to a backend.
    #[from]
    #[display("{_0}")]
    Dispatch(DispatchError),
    /// The backup tool couldn't be started.
    #[display("Launching `{command}` failed: {source}")]
    Launch { command: String, source: io::Error },
    /// The list of git repositories can't be read.
    #[display("Reading the repository list {} failed: {source}", path.display())]
    RepositoryList { path: PathBuf, source: io::Error },
}
