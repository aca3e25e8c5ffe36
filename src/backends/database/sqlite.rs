use std::path::PathBuf;

use super::{ConnectionType, DatabaseDescriptor, DispatchError};
use crate::backends::Backup;
use crate::config::RunContext;
use crate::executor::{CommandLine, Invocation};

/// Name of the backup file in the backup destination.
pub const SQLITE_DUMP_FILE: &str = "sq3-dump.sq3.bak";

/// Online backup of an SQLite database file using the `.backup` command of `sqlite3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sqlite {
    path: PathBuf,
}

impl Sqlite {
    pub(super) fn from_descriptor(descriptor: &DatabaseDescriptor) -> Result<Self, DispatchError> {
        let path = descriptor
            .path
            .clone()
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or(DispatchError::MissingField {
                connection: ConnectionType::Sqlite,
                field: "path",
            })?;

        Ok(Self { path })
    }
}

impl Backup for Sqlite {
    fn target(&self) -> &'static str {
        "backend::database::sqlite"
    }

    fn command(&self, ctx: &RunContext) -> CommandLine {
        let backup_file = ctx.destination().join(SQLITE_DUMP_FILE);
        // sqlite3 unescapes double quoted dot-command arguments
        let backup_file = backup_file
            .to_string_lossy()
            .replace('\\', "\\\\")
            .replace('"', "\\\"");

        let mut dump = Invocation::new("sqlite3");
        dump.arg(&self.path)
            .arg(format!(".backup \"{backup_file}\""));

        CommandLine::new(dump)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::backends::database::tests::descriptor;
    use crate::backends::database::Database;

    #[test]
    fn backup_target_is_quoted() {
        let ctx = RunContext::new(
            PathBuf::from("/mnt/my \"backups\"/05-03-2024"),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        );
        let descriptor = DatabaseDescriptor {
            path: Some("/data/app.db".into()),
            ..descriptor("sqlite")
        };

        let command = Database::from_descriptor(&descriptor).unwrap().command(&ctx);

        let args: Vec<_> = command.all_args().map(|arg| arg.value().to_owned()).collect();
        assert_eq!(
            args,
            ["/data/app.db", r#".backup "/mnt/my \"backups\"/05-03-2024/sq3-dump.sq3.bak""#]
        );
    }
}
