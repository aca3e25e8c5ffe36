use super::{non_empty, required, ConnectionType, DatabaseDescriptor, DispatchError, Port};
use crate::backends::Backup;
use crate::config::RunContext;
use crate::executor::{CommandLine, Invocation};

/// Name of the dump directory in the backup destination.
pub const MONGODB_DUMP_DIR: &str = "mongodb";

/// Dump of a MongoDB instance using `mongodump`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoDb {
    host: String,
    port: Port,
    auth: Option<MongoAuth>,
}

/// Credentials, only used if an authentication database is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MongoAuth {
    auth_table: String,
    username: Option<String>,
    password: Option<String>,
}

impl MongoDb {
    pub(super) fn from_descriptor(descriptor: &DatabaseDescriptor) -> Result<Self, DispatchError> {
        let connection = ConnectionType::MongoDb;

        let auth = non_empty(&descriptor.auth_table).map(|auth_table| MongoAuth {
            auth_table: auth_table.to_string(),
            username: non_empty(&descriptor.username).map(str::to_string),
            password: non_empty(&descriptor.password).map(str::to_string),
        });

        Ok(Self {
            host: required(&descriptor.host, connection, "host")?.to_string(),
            port: descriptor.port.clone().ok_or(DispatchError::MissingField {
                connection,
                field: "port",
            })?,
            auth,
        })
    }
}

impl Backup for MongoDb {
    fn target(&self) -> &'static str {
        "backend::database::mongodb"
    }

    fn command(&self, ctx: &RunContext) -> CommandLine {
        let mut dump = Invocation::new("mongodump");
        dump.arg("--host")
            .arg(&self.host)
            .arg("--port")
            .arg(self.port.to_string());

        if let Some(auth) = &self.auth {
            dump.arg("--authenticationDatabase").arg(&auth.auth_table);
            if let Some(username) = &auth.username {
                dump.arg("--username").arg(username);
            }
            if let Some(password) = &auth.password {
                dump.arg("--password").secret_arg(password);
            }
        } else {
            log::trace!(target: self.target(), "No auth_table configured, dumping without authentication");
        }

        dump.arg("--out")
            .arg(ctx.destination().join(MONGODB_DUMP_DIR));

        CommandLine::new(dump)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::database::tests::{ctx, descriptor};
    use crate::backends::database::Database;

    const AUTH_FLAGS: [&str; 3] = ["--authenticationDatabase", "--username", "--password"];

    fn mongodb() -> DatabaseDescriptor {
        DatabaseDescriptor {
            host: Some("localhost".into()),
            port: Some(Port::Number(27017)),
            username: Some("admin".into()),
            password: Some("hunter2".into()),
            ..descriptor("mongodb")
        }
    }

    #[test]
    fn without_auth_table_no_auth_flags() {
        let command = Database::from_descriptor(&mongodb()).unwrap().command(&ctx());

        assert!(command
            .all_args()
            .all(|arg| AUTH_FLAGS.iter().all(|flag| arg.value() != *flag)));
        assert_eq!(
            command.to_string(),
            "mongodump --host localhost --port 27017 --out /backups/05-03-2024/mongodb"
        );
    }

    #[test]
    fn auth_table_adds_credentials() {
        let descriptor = DatabaseDescriptor {
            auth_table: Some("admin".into()),
            ..mongodb()
        };
        let command = Database::from_descriptor(&descriptor).unwrap().command(&ctx());

        assert_eq!(
            command.to_string(),
            "mongodump --host localhost --port 27017 --authenticationDatabase admin \
             --username admin --password *** --out /backups/05-03-2024/mongodb"
        );
        let secrets: Vec<_> = command.all_args().filter(|arg| arg.is_secret()).collect();
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets[0].value(), "hunter2");
    }

    #[test]
    fn requires_port() {
        let descriptor = DatabaseDescriptor {
            port: None,
            ..mongodb()
        };

        assert_eq!(
            Database::from_descriptor(&descriptor).unwrap_err(),
            DispatchError::MissingField {
                connection: ConnectionType::MongoDb,
                field: "port"
            }
        );
    }
}
