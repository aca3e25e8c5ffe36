use super::{non_empty, required, ConnectionType, DatabaseDescriptor, DispatchError, Port};
use crate::backends::Backup;
use crate::config::RunContext;
use crate::executor::{CommandLine, Invocation};

/// Name of the dump file in the backup destination.
pub const MYSQL_DUMP_FILE: &str = "sql-dump.sql";

/// Dump of a MySQL/MariaDB database using `mysqldump`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySql {
    username: String,
    password: Option<String>,
    database: String,
    host: Option<String>,
    port: Option<Port>,
}

impl MySql {
    pub(super) fn from_descriptor(descriptor: &DatabaseDescriptor) -> Result<Self, DispatchError> {
        let connection = ConnectionType::MySql;

        Ok(Self {
            username: required(&descriptor.username, connection, "username")?.to_string(),
            password: non_empty(&descriptor.password).map(str::to_string),
            database: required(&descriptor.database, connection, "database")?.to_string(),
            host: non_empty(&descriptor.host).map(str::to_string),
            port: descriptor.port.clone(),
        })
    }
}

impl Backup for MySql {
    fn target(&self) -> &'static str {
        "backend::database::mysql"
    }

    fn command(&self, ctx: &RunContext) -> CommandLine {
        log::trace!(target: self.target(), "Using user '{}' for backup", self.username);

        let mut dump = Invocation::new("mysqldump");
        if let Some(host) = &self.host {
            dump.arg("-h").arg(host);
        }
        if let Some(port) = &self.port {
            dump.arg("-P").arg(port.to_string());
        }
        dump.arg("-u").arg(&self.username);
        // an empty password flag would make mysqldump prompt for one
        if let Some(password) = &self.password {
            dump.secret_arg(format!("--password={password}"));
        }
        dump.arg(&self.database)
            .stdout_to(ctx.destination().join(MYSQL_DUMP_FILE));

        CommandLine::new(dump)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::database::tests::{ctx, descriptor};
    use crate::backends::database::Database;

    fn mysql(password: Option<&str>) -> CommandLine {
        let descriptor = DatabaseDescriptor {
            username: Some("backup".into()),
            password: password.map(Into::into),
            database: Some("shop".into()),
            ..descriptor("mysql")
        };
        Database::from_descriptor(&descriptor).unwrap().command(&ctx())
    }

    fn password_flags(command: &CommandLine) -> Vec<String> {
        command
            .all_args()
            .map(|arg| arg.value().to_string_lossy().into_owned())
            .filter(|arg| arg.starts_with("--password") || arg.starts_with("-p"))
            .collect()
    }

    #[test]
    fn absent_password_adds_no_flag() {
        for password in [None, Some("")] {
            let command = mysql(password);

            assert!(password_flags(&command).is_empty());
            assert_eq!(
                command.to_string(),
                "mysqldump -u backup shop > /backups/05-03-2024/sql-dump.sql"
            );
        }
    }

    #[test]
    fn password_adds_exactly_one_flag() {
        let command = mysql(Some("s3cret"));

        assert_eq!(password_flags(&command), ["--password=s3cret"]);
        assert_eq!(
            command.to_string(),
            "mysqldump -u backup *** shop > /backups/05-03-2024/sql-dump.sql"
        );
    }

    #[test]
    fn host_and_port_are_passed_on() {
        let descriptor = DatabaseDescriptor {
            username: Some("backup".into()),
            database: Some("shop".into()),
            host: Some("db.internal".into()),
            port: Some(Port::Number(3307)),
            ..descriptor("mysql")
        };
        let command = Database::from_descriptor(&descriptor).unwrap().command(&ctx());

        assert_eq!(
            command.to_string(),
            "mysqldump -h db.internal -P 3307 -u backup shop > /backups/05-03-2024/sql-dump.sql"
        );
    }

    #[test]
    fn requires_username_and_database() {
        let err = Database::from_descriptor(&DatabaseDescriptor {
            database: Some("shop".into()),
            ..descriptor("mysql")
        })
        .unwrap_err();

        assert_eq!(
            err,
            DispatchError::MissingField {
                connection: ConnectionType::MySql,
                field: "username"
            }
        );
    }
}
