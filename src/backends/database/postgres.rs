use super::{non_empty, required, ConnectionType, DatabaseDescriptor, DispatchError, Port};
use crate::backends::Backup;
use crate::config::RunContext;
use crate::executor::{CommandLine, Invocation};

/// Name of the dump file in the backup destination.
pub const POSTGRES_DUMP_FILE: &str = "pgsql-dump.pgsql";

/// Dump of a PostgreSQL database using `pg_dump`.
///
/// The password is handed over in `PGPASSWORD`, set for the `pg_dump` process only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Postgres {
    username: String,
    password: Option<String>,
    host: String,
    port: Option<Port>,
    database: Option<String>,
}

impl Postgres {
    pub(super) fn from_descriptor(descriptor: &DatabaseDescriptor) -> Result<Self, DispatchError> {
        let connection = ConnectionType::Postgres;

        Ok(Self {
            username: required(&descriptor.username, connection, "username")?.to_string(),
            password: non_empty(&descriptor.password).map(str::to_string),
            host: required(&descriptor.host, connection, "host")?.to_string(),
            port: descriptor.port.clone(),
            database: non_empty(&descriptor.database).map(str::to_string),
        })
    }
}

impl Backup for Postgres {
    fn target(&self) -> &'static str {
        "backend::database::postgres"
    }

    fn command(&self, ctx: &RunContext) -> CommandLine {
        let mut dump = Invocation::new("pg_dump");
        if let Some(password) = &self.password {
            dump.secret_env("PGPASSWORD", password);
        }
        dump.arg("-U").arg(&self.username).arg("-h").arg(&self.host);
        if let Some(port) = &self.port {
            dump.arg("-p").arg(port.to_string());
        }
        if let Some(database) = &self.database {
            dump.arg(database);
        }
        dump.stdout_to(ctx.destination().join(POSTGRES_DUMP_FILE));

        CommandLine::new(dump)
    }
}
