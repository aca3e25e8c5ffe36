//! Loading and validation of the backup [Configuration].
//!
//! The configuration is read once and never mutated. The per-run destination
//! is derived from it as a [RunContext] by [`Configuration::resolve_destination`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use derive_more::{Display, Error};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Keys every configuration has to provide.
pub const REQUIRED_KEYS: [&str; 4] = [
    "document_root",
    "backup_src_file",
    "backup_desc",
    "database_backup",
];

/// Name of the dated subdirectory below `backup_desc`.
pub const DESTINATION_DATE_FORMAT: &str = "%d-%m-%Y";

/// Commit message used for git backups unless `git_commit_message` is set.
pub const DEFAULT_COMMIT_MESSAGE: &str = "auto backup";

#[derive(Debug, Display, Error)]
/// Errors on loading the [Configuration] or preparing the backup destination.
pub enum ConfigError {
    /// The configuration file can't be read.
    #[display("Reading the config file {} failed: {source}", path.display())]
    Unreadable { path: PathBuf, source: io::Error },
    /// The configuration file is no valid JSON.
    #[display("Config file is not valid JSON: {_0}")]
    InvalidJson(serde_json::Error),
    /// The configuration file is no valid TOML.
    #[display("Config file is not valid TOML: {_0}")]
    InvalidToml(toml::de::Error),
    /// The top level of the configuration is no key-value mapping.
    #[display("Config file must contain a key-value mapping")]
    NotAMapping,
    /// Required keys are absent. Lists every missing key.
    #[display("missing key: {}", _0.join(", "))]
    MissingKeys(#[error(ignore)] Vec<&'static str>),
    /// A key is present but holds a value of the wrong shape.
    #[display("Invalid value for key {key}: {source}")]
    InvalidValue {
        key: &'static str,
        source: serde_json::Error,
    },
    /// The dated backup destination can't be created.
    #[display("Creating the backup destination {} failed: {source}", path.display())]
    DestinationNotCreated { path: PathBuf, source: io::Error },
}

/// Validated backup configuration.
#[derive(Debug, Clone)]
pub struct Configuration {
    raw: Map<String, Value>,
    document_root: PathBuf,
    backup_src_file: PathBuf,
    backup_desc: PathBuf,
    database_backup: Vec<Value>,
    git_backup_src_file: Option<PathBuf>,
    git_commit_message: String,
    git_remote: Option<String>,
}

impl Configuration {
    /// Reads and validates the configuration file at `path`.
    ///
    /// Files with a `.toml` extension are parsed as TOML, everything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        log::debug!(target: "config", "Reading config from {}", path.display());

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let value: Value = if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content).map_err(ConfigError::InvalidToml)?
        } else {
            serde_json::from_str(&content).map_err(ConfigError::InvalidJson)?
        };

        Self::from_value(value)
    }

    /// Validates an already parsed configuration document.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let Value::Object(raw) = value else {
            return Err(ConfigError::NotAMapping);
        };

        let missing: Vec<_> = REQUIRED_KEYS
            .into_iter()
            .filter(|key| !raw.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingKeys(missing));
        }

        let config = Self {
            document_root: required(&raw, "document_root")?,
            backup_src_file: required(&raw, "backup_src_file")?,
            backup_desc: required(&raw, "backup_desc")?,
            database_backup: required(&raw, "database_backup")?,
            git_backup_src_file: optional(&raw, "git_backup_src_file")?,
            git_commit_message: optional(&raw, "git_commit_message")?
                .unwrap_or_else(|| DEFAULT_COMMIT_MESSAGE.to_string()),
            git_remote: optional(&raw, "git_remote")?,
            raw,
        };

        if config.document_root.is_relative() {
            log::warn!(target: "config", "document_root is relative: {}", config.document_root.display());
        }
        log::trace!(target: "config", "Loaded {} database resource(s)", config.database_backup.len());

        Ok(config)
    }

    /// Raw value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    /// Raw value stored under `key`, or `default` if it is absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.get(key).unwrap_or(default)
    }

    pub fn document_root(&self) -> &Path {
        &self.document_root
    }

    /// File listing the paths below the document root to copy.
    pub fn backup_src_file(&self) -> &Path {
        &self.backup_src_file
    }

    /// Base destination directory, *without* the dated subdirectory.
    pub fn backup_desc(&self) -> &Path {
        &self.backup_desc
    }

    /// Raw database entries, validated one by one when they are dispatched.
    pub fn database_backup(&self) -> &[Value] {
        &self.database_backup
    }

    /// File listing git repository roots, if git backups are enabled.
    pub fn git_backup_src_file(&self) -> Option<&Path> {
        self.git_backup_src_file.as_deref()
    }

    pub fn git_commit_message(&self) -> &str {
        &self.git_commit_message
    }

    pub fn git_remote(&self) -> Option<&str> {
        self.git_remote.as_deref()
    }

    /// Creates today's backup destination and returns the [RunContext] for the run.
    pub fn resolve_destination(&self) -> Result<RunContext, ConfigError> {
        self.resolve_destination_on(Local::now().date_naive())
    }

    /// Creates the backup destination `<backup_desc>/<DD-MM-YYYY>` for `date`.
    ///
    /// An already existing destination is reused.
    pub fn resolve_destination_on(&self, date: NaiveDate) -> Result<RunContext, ConfigError> {
        let destination = self
            .backup_desc
            .join(date.format(DESTINATION_DATE_FORMAT).to_string());
        if destination.is_relative() {
            log::warn!(target: "config", "backup destination is relative: {}", destination.display());
        }

        fs::create_dir_all(&destination).map_err(|source| ConfigError::DestinationNotCreated {
            path: destination.clone(),
            source,
        })?;
        log::info!(target: "config", "Backup destination: {}", destination.display());

        Ok(RunContext::new(destination, date))
    }
}

fn required<T: DeserializeOwned>(raw: &Map<String, Value>, key: &'static str) -> Result<T, ConfigError> {
    let value = raw
        .get(key)
        .ok_or_else(|| ConfigError::MissingKeys(vec![key]))?;
    T::deserialize(value).map_err(|source| ConfigError::InvalidValue { key, source })
}

fn optional<T: DeserializeOwned>(
    raw: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => T::deserialize(value)
            .map(Some)
            .map_err(|source| ConfigError::InvalidValue { key, source }),
    }
}

/// Everything a backup strategy needs to know about the current run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    destination: PathBuf,
    date: NaiveDate,
    dry_run: bool,
}

impl RunContext {
    pub fn new(destination: PathBuf, date: NaiveDate) -> Self {
        Self {
            destination,
            date,
            dry_run: false,
        }
    }

    /// In dry-run mode the file copy only lists what it would do.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Resolved, dated destination directory.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }
}
