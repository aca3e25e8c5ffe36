//! Implements backup of git repositories by committing and pushing all changes.

use std::fs;
use std::path::{Path, PathBuf};

use crate::backends::{Backup, BackupError};
use crate::config::{Configuration, RunContext};
use crate::executor::{CommandLine, Invocation};

/// A git repository whose working tree is committed and pushed as backup.
///
/// Staging, commit and push are chained, a failing step skips the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRepository {
    root: PathBuf,
    message: String,
    remote: Option<String>,
}

impl GitRepository {
    pub fn new(root: PathBuf, message: String, remote: Option<String>) -> Self {
        Self {
            root,
            message,
            remote,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Repositories listed in the configured repository list.
    ///
    /// Returns no repositories if git backups aren't configured.
    pub fn from_config(config: &Configuration) -> Result<Vec<Self>, BackupError> {
        let Some(list) = config.git_backup_src_file() else {
            log::debug!(target: "backend::git", "No repository list configured");
            return Ok(Vec::new());
        };

        let content = fs::read_to_string(list).map_err(|source| BackupError::RepositoryList {
            path: list.to_path_buf(),
            source,
        })?;

        let repositories: Vec<_> = parse_repository_list(&content)
            .map(|root| {
                Self::new(
                    root,
                    config.git_commit_message().to_string(),
                    config.git_remote().map(str::to_string),
                )
            })
            .collect();
        log::debug!(target: "backend::git", "{} repositories listed in {}", repositories.len(), list.display());

        Ok(repositories)
    }
}

/// One repository root per line, blank lines are skipped.
fn parse_repository_list(content: &str) -> impl Iterator<Item = PathBuf> + '_ {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
}

impl Backup for GitRepository {
    fn target(&self) -> &'static str {
        "backend::git"
    }

    fn command(&self, _ctx: &RunContext) -> CommandLine {
        let mut add = Invocation::new("git");
        add.arg("add").arg(".");

        let mut commit = Invocation::new("git");
        commit.arg("commit").arg("-m").arg(&self.message);

        let mut push = Invocation::new("git");
        push.arg("push");
        if let Some(remote) = &self.remote {
            push.arg(remote);
        }

        let mut command = CommandLine::new(add);
        command.current_dir(&self.root).and_then(commit).and_then(push);
        command
    }
}
