//! Implements backup of selected paths below the document root using [Files].

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::backends::Backup;
use crate::config::{Configuration, RunContext};
use crate::executor::{CommandLine, Invocation};

/// The [Files] backend copies the paths listed in a file list with `rsync`.
///
/// The listed paths are relative to the document root and keep their relative
/// location inside the backup destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Files {
    document_root: PathBuf,
    file_list: PathBuf,
}

impl Files {
    pub fn new(document_root: PathBuf, file_list: PathBuf) -> Self {
        Self {
            document_root,
            file_list,
        }
    }

    pub fn from_config(config: &Configuration) -> Self {
        Self::new(
            config.document_root().to_path_buf(),
            config.backup_src_file().to_path_buf(),
        )
    }

    pub fn document_root(&self) -> &Path {
        &self.document_root
    }
}

impl Backup for Files {
    fn target(&self) -> &'static str {
        "backend::files"
    }

    fn command(&self, ctx: &RunContext) -> CommandLine {
        let mut files_from = OsString::from("--files-from=");
        files_from.push(&self.file_list);

        let mut rsync = Invocation::new("rsync");
        if ctx.dry_run() {
            log::debug!(target: self.target(), "rsync only lists the files to copy on dry-run");
            rsync.arg("-nv");
        }
        rsync
            .arg("-arR")
            .arg(files_from)
            .arg(with_trailing_slash(&self.document_root))
            .arg(with_trailing_slash(ctx.destination()));

        CommandLine::new(rsync)
    }
}

// rsync copies the directory itself instead of its content without the slash
fn with_trailing_slash(dir: &Path) -> OsString {
    let mut dir = dir.as_os_str().to_owned();
    if !dir.to_string_lossy().ends_with('/') {
        dir.push("/");
    }
    dir
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn ctx() -> RunContext {
        RunContext::new(
            PathBuf::from("/backups/05-03-2024"),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        )
    }

    fn files() -> Files {
        Files::new("/var/www/site".into(), "/etc/backup/dir-list.txt".into())
    }

    #[test]
    fn copies_listed_paths_relative_to_the_document_root() {
        assert_eq!(
            files().command(&ctx()).to_string(),
            "rsync -arR --files-from=/etc/backup/dir-list.txt /var/www/site/ /backups/05-03-2024/"
        );
    }

    #[test]
    fn dry_run_only_lists() {
        let ctx = ctx().with_dry_run(true);

        assert_eq!(
            files().command(&ctx).to_string(),
            "rsync -nv -arR --files-from=/etc/backup/dir-list.txt /var/www/site/ /backups/05-03-2024/"
        );
    }

    #[test]
    fn existing_trailing_slash_is_kept() {
        let files = Files::new("/var/www/site/".into(), "list.txt".into());

        let command = files.command(&ctx());
        let args: Vec<_> = command.all_args().map(|arg| arg.value().to_owned()).collect();
        assert_eq!(args[2], "/var/www/site/");
    }
}
