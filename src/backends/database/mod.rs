//! Dispatch of the declared database resources to their engine backends.

mod mongodb;
mod mysql;
mod postgres;
mod sqlite;

pub use mongodb::{MongoDb, MONGODB_DUMP_DIR};
pub use mysql::{MySql, MYSQL_DUMP_FILE};
pub use postgres::{Postgres, POSTGRES_DUMP_FILE};
pub use sqlite::{Sqlite, SQLITE_DUMP_FILE};

use std::path::PathBuf;
use std::str::FromStr;

use derive_more::{Display, Error};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::{Backup, BackupError};
use crate::config::RunContext;
use crate::executor::{CommandLine, CommandResult, Executor};
use crate::report::{Phase, RunReport};

/// One entry of the `database_backup` list as it is written in the config.
///
/// Which fields are needed depends on the [ConnectionType].
/// Credentials and names may also be written as numbers or booleans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DatabaseDescriptor {
    /// Engine tag, see [ConnectionType].
    pub connection: String,
    #[serde(default, deserialize_with = "text")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub database: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub host: Option<String>,
    pub port: Option<Port>,
    /// Database file of embedded engines.
    pub path: Option<PathBuf>,
    /// Authentication database of MongoDB.
    #[serde(default, deserialize_with = "text")]
    pub auth_table: Option<String>,
}

impl DatabaseDescriptor {
    /// Validates a raw `database_backup` entry.
    pub fn from_value(value: &Value) -> Result<Self, DispatchError> {
        Self::deserialize(value).map_err(|e| DispatchError::InvalidDescriptor(e.to_string()))
    }

    /// Human readable name of the resource for reports.
    pub fn label(&self, index: usize) -> String {
        let name = self
            .database
            .clone()
            .or_else(|| self.path.as_ref().map(|path| path.display().to_string()))
            .or_else(|| self.host.clone());

        match name {
            Some(name) => format!("#{index} {}:{name}", self.connection),
            None => format!("#{index} {}", self.connection),
        }
    }
}

fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Text {
        String(String),
        Number(serde_json::Number),
        Bool(bool),
    }

    let text = Option::<Text>::deserialize(deserializer)?.map(|text| match text {
        Text::String(s) => s,
        Text::Number(n) => n.to_string(),
        Text::Bool(b) => b.to_string(),
    });
    Ok(text)
}

/// Port given either as number or as string.
#[derive(Debug, Clone, PartialEq, Eq, Display, Deserialize)]
#[serde(untagged)]
pub enum Port {
    #[display("{_0}")]
    Number(u16),
    #[display("{_0}")]
    Text(String),
}

/// Database engines supported for backup.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash)]
pub enum ConnectionType {
    #[display("mysql")]
    MySql,
    #[display("mongodb")]
    MongoDb,
    #[display("postgres")]
    Postgres,
    #[display("sqlite")]
    Sqlite,
}

impl FromStr for ConnectionType {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mysql" => Ok(Self::MySql),
            "mongodb" => Ok(Self::MongoDb),
            "postgres" => Ok(Self::Postgres),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(DispatchError::UnsupportedConnectionType(other.to_string())),
        }
    }
}

#[derive(Debug, Display, Error, PartialEq, Eq)]
/// Errors on selecting the backend of a [DatabaseDescriptor].
pub enum DispatchError {
    /// The `connection` tag names no supported engine.
    #[display("Unsupported connection type: {_0}")]
    UnsupportedConnectionType(#[error(ignore)] String),
    /// The entry doesn't have the shape of a [DatabaseDescriptor].
    #[display("Invalid database entry: {_0}")]
    InvalidDescriptor(#[error(ignore)] String),
    /// A field the engine needs is absent or empty.
    #[display("{connection} backup requires the field `{field}`")]
    MissingField {
        connection: ConnectionType,
        field: &'static str,
    },
}

/// A database resource ready to be backed up by its engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Database {
    MySql(MySql),
    MongoDb(MongoDb),
    Postgres(Postgres),
    Sqlite(Sqlite),
}

impl Database {
    /// Selects the engine backend named by the descriptor's `connection`.
    pub fn from_descriptor(descriptor: &DatabaseDescriptor) -> Result<Self, DispatchError> {
        let connection: ConnectionType = descriptor.connection.parse()?;

        let database = match connection {
            ConnectionType::MySql => Self::MySql(MySql::from_descriptor(descriptor)?),
            ConnectionType::MongoDb => Self::MongoDb(MongoDb::from_descriptor(descriptor)?),
            ConnectionType::Postgres => Self::Postgres(Postgres::from_descriptor(descriptor)?),
            ConnectionType::Sqlite => Self::Sqlite(Sqlite::from_descriptor(descriptor)?),
        };
        Ok(database)
    }

    pub fn connection(&self) -> ConnectionType {
        match self {
            Self::MySql(_) => ConnectionType::MySql,
            Self::MongoDb(_) => ConnectionType::MongoDb,
            Self::Postgres(_) => ConnectionType::Postgres,
            Self::Sqlite(_) => ConnectionType::Sqlite,
        }
    }
}

impl Backup for Database {
    fn target(&self) -> &'static str {
        match self {
            Self::MySql(db) => db.target(),
            Self::MongoDb(db) => db.target(),
            Self::Postgres(db) => db.target(),
            Self::Sqlite(db) => db.target(),
        }
    }

    fn command(&self, ctx: &RunContext) -> CommandLine {
        match self {
            Self::MySql(db) => db.command(ctx),
            Self::MongoDb(db) => db.command(ctx),
            Self::Postgres(db) => db.command(ctx),
            Self::Sqlite(db) => db.command(ctx),
        }
    }
}

/// Dispatches a single descriptor to its engine and runs the backup.
///
/// Nothing is executed if the descriptor can't be dispatched.
pub fn dispatch(
    descriptor: &DatabaseDescriptor,
    ctx: &RunContext,
    executor: &mut dyn Executor,
) -> Result<CommandResult, BackupError> {
    let database = Database::from_descriptor(descriptor)?;
    log::info!(target: database.target(), "Create dump of {} database", database.connection());
    database.backup(ctx, executor)
}

/// Backups every declared database in order, recording each outcome.
///
/// Entries are validated one by one, a malformed or failing database doesn't
/// keep the following ones from being backed up.
pub fn backup_all(
    entries: &[Value],
    ctx: &RunContext,
    executor: &mut dyn Executor,
    report: &mut RunReport,
) {
    for (index, entry) in entries.iter().enumerate() {
        match DatabaseDescriptor::from_value(entry) {
            Ok(descriptor) => {
                let result = dispatch(&descriptor, ctx, executor);
                report.record(Phase::Database, descriptor.label(index), result);
            }
            Err(e) => {
                let label = match entry.get("connection").and_then(Value::as_str) {
                    Some(connection) => format!("#{index} {connection}"),
                    None => format!("#{index}"),
                };
                report.record(Phase::Database, label, Err(e.into()));
            }
        }
    }
}

fn required<'a>(
    value: &'a Option<String>,
    connection: ConnectionType,
    field: &'static str,
) -> Result<&'a str, DispatchError> {
    non_empty(value).ok_or(DispatchError::MissingField { connection, field })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}
