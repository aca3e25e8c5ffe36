use std::env;
use std::ffi::OsStr;
use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Verbosity of the command output.
    #[arg(long, default_value = "info")]
    pub verbose: LevelFilter,

    /// Backup configuration (JSON, or TOML with a `.toml` extension).
    #[arg(long, short = 'c', env = "BACKUP_CONFIG", default_value = "config.json")]
    pub config: PathBuf,

    /// Only list the files rsync would copy. Also enabled by any non-empty `DEBUG`.
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Whether the run copies nothing, by `--dry-run` or the `DEBUG` environment variable.
    pub fn dry_run(&self) -> bool {
        self.dry_run || debug_enabled(env::var_os("DEBUG").as_deref())
    }
}

/// `DEBUG` switches on dry-run mode whenever it is set to a non-empty value,
/// including `0` and `false`.
fn debug_enabled(value: Option<&OsStr>) -> bool {
    value.is_some_and(|value| !value.is_empty())
}
