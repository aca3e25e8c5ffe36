//! Execution of the external backup tools.
//!
//! Commands are modelled as a [CommandLine]: an optional working directory and
//! one or more [Invocation]s chained by logical AND. Arguments are handed to the
//! child process as a discrete list, no shell is involved. Redirection of the
//! standard output into a file and per-invocation environment variables are
//! handled by the [ProcessExecutor] itself.

use std::ffi::{OsStr, OsString};
use std::fmt::{self, Display};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// A single argument (or environment value) of an [Invocation].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// Shown as is when the command is displayed.
    Plain(OsString),
    /// Credential, masked whenever the command is displayed.
    Secret(OsString),
}

impl Arg {
    /// Raw value handed to the child process.
    pub fn value(&self) -> &OsStr {
        match self {
            Arg::Plain(value) | Arg::Secret(value) => value,
        }
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, Arg::Secret(_))
    }
}

impl Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Plain(value) => write_word(f, value),
            Arg::Secret(_) => f.write_str("***"),
        }
    }
}

/// One program run with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: OsString,
    args: Vec<Arg>,
    envs: Vec<(OsString, Arg)>,
    stdout: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            stdout: None,
        }
    }

    pub fn arg(&mut self, arg: impl Into<OsString>) -> &mut Self {
        self.args.push(Arg::Plain(arg.into()));
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        for arg in args {
            self.arg(arg);
        }
        self
    }

    /// Adds an argument that never shows up in logs.
    pub fn secret_arg(&mut self, arg: impl Into<OsString>) -> &mut Self {
        self.args.push(Arg::Secret(arg.into()));
        self
    }

    /// Sets a secret environment variable for this invocation only.
    pub fn secret_env(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> &mut Self {
        self.envs.push((key.into(), Arg::Secret(value.into())));
        self
    }

    /// Redirects the standard output into `path`, truncating it.
    pub fn stdout_to(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.stdout = Some(path.into());
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn get_args(&self) -> &[Arg] {
        &self.args
    }

    pub fn get_envs(&self) -> &[(OsString, Arg)] {
        &self.envs
    }

    pub fn get_stdout(&self) -> Option<&Path> {
        self.stdout.as_deref()
    }
}

impl Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.envs {
            write!(f, "{}={value} ", key.to_string_lossy())?;
        }
        write_word(f, &self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        if let Some(stdout) = &self.stdout {
            f.write_str(" > ")?;
            write_word(f, stdout.as_os_str())?;
        }
        Ok(())
    }
}

/// Invocations chained by logical AND, optionally run inside a working directory.
///
/// The first failing invocation stops the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    working_dir: Option<PathBuf>,
    steps: Vec<Invocation>,
}

impl CommandLine {
    pub fn new(first: Invocation) -> Self {
        Self {
            working_dir: None,
            steps: vec![first],
        }
    }

    pub fn current_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Appends an invocation that only runs if every previous one succeeded.
    pub fn and_then(&mut self, next: Invocation) -> &mut Self {
        self.steps.push(next);
        self
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn steps(&self) -> &[Invocation] {
        &self.steps
    }

    /// All arguments of all invocations, in order.
    pub fn all_args(&self) -> impl Iterator<Item = &Arg> {
        self.steps.iter().flat_map(|step| step.args.iter())
    }
}

impl Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(dir) = &self.working_dir {
            f.write_str("cd ")?;
            write_word(f, dir.as_os_str())?;
            f.write_str(" && ")?;
        }
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(" && ")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

// Quote words the way a reader would have to type them into a shell.
fn write_word(f: &mut fmt::Formatter<'_>, word: &OsStr) -> fmt::Result {
    let word = word.to_string_lossy();
    let needs_quotes = word.is_empty()
        || word.chars().any(|c| {
            c.is_whitespace()
                || matches!(
                    c,
                    '"' | '\'' | '\\' | '$' | '`' | '&' | '|' | ';' | '<' | '>' | '(' | ')' | '*' | '?'
                )
        });

    if needs_quotes {
        let escaped = word
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('$', "\\$")
            .replace('`', "\\`");
        write!(f, "\"{escaped}\"")
    } else {
        f.write_str(&word)
    }
}

/// Outcome of a single [CommandLine].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    command: String,
    exit_code: Option<i32>,
    stdout: String,
}

impl CommandResult {
    pub fn new(command: String, exit_code: Option<i32>, stdout: String) -> Self {
        Self {
            command,
            exit_code,
            stdout,
        }
    }

    /// Displayed form of the command, credentials masked.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Exit code of the last invocation that ran, [None] if it was killed by a signal.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

impl Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "`{}` exited with {code}", self.command)?,
            None => write!(f, "`{}` was terminated by a signal", self.command)?,
        }
        let stdout = self.stdout.trim_end();
        if !stdout.is_empty() {
            write!(f, ":\n{stdout}")?;
        }
        Ok(())
    }
}

/// Runs [CommandLine]s.
///
/// A non-zero exit code is not an error, it is part of the [CommandResult].
/// Errors are reserved for commands that could not be launched at all.
pub trait Executor {
    fn execute(&mut self, command: &CommandLine) -> io::Result<CommandResult>;
}

/// [Executor] spawning real child processes and waiting for them.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
    fn execute(&mut self, command: &CommandLine) -> io::Result<CommandResult> {
        let rendered = command.to_string();

        let mut stdout = String::new();
        let mut exit_code = Some(0);
        for step in command.steps() {
            let mut process = Command::new(step.program());
            process
                .args(step.get_args().iter().map(Arg::value))
                .stdin(Stdio::null())
                .stderr(Stdio::piped());
            for (key, value) in step.get_envs() {
                process.env(key, value.value());
            }
            if let Some(dir) = command.working_dir() {
                process.current_dir(dir);
            }
            match step.get_stdout() {
                Some(path) => process.stdout(File::create(path)?),
                None => process.stdout(Stdio::piped()),
            };

            let output = match process.output() {
                Ok(output) => output,
                Err(e) => {
                    // no dump file for a program that never ran
                    if let Some(path) = step.get_stdout() {
                        let _ = fs::remove_file(path);
                    }
                    return Err(e);
                }
            };
            stdout.push_str(&String::from_utf8_lossy(&output.stdout));

            // relay stderr
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                log::warn!(target: "executor", "{}: {}", step.program().to_string_lossy(), stderr.trim_end());
            }

            exit_code = output.status.code();
            if !output.status.success() {
                log::trace!(target: "executor", "Chain stopped at {}", step.program().to_string_lossy());
                break;
            }
        }

        Ok(CommandResult::new(rendered, exit_code, stdout))
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Keeps the messages logged under the `executor` target.
    struct ExecutorLog(Mutex<Vec<String>>);

    impl log::Log for ExecutorLog {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.target() == "executor"
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.0.lock().unwrap().push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    static EXECUTOR_LOG: ExecutorLog = ExecutorLog(Mutex::new(Vec::new()));

    fn echo(word: &str) -> Invocation {
        let mut echo = Invocation::new("echo");
        echo.arg(word);
        echo
    }

    #[test]
    fn display_masks_secrets_and_quotes_words() {
        let mut dump = Invocation::new("pg_dump");
        dump.secret_env("PGPASSWORD", "hunter2")
            .arg("-U")
            .arg("backup user")
            .stdout_to("/backups/dump.pgsql");
        let command = CommandLine::new(dump);

        let rendered = command.to_string();
        assert_eq!(
            rendered,
            "PGPASSWORD=*** pg_dump -U \"backup user\" > /backups/dump.pgsql"
        );
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn display_chains_with_working_dir() {
        let mut command = CommandLine::new(echo("a"));
        command.current_dir("/srv/repo").and_then(echo("b"));

        assert_eq!(command.to_string(), "cd /srv/repo && echo a && echo b");
    }

    #[test]
    fn process_executor_captures_stdout() {
        let result = ProcessExecutor
            .execute(&CommandLine::new(echo("hello")))
            .unwrap();

        assert!(result.success());
        assert_eq!(result.stdout(), "hello\n");
        assert_eq!(result.command(), "echo hello");
    }

    #[test]
    fn process_executor_short_circuits_on_failure() {
        let mut command = CommandLine::new(echo("first"));
        command
            .and_then(Invocation::new("false"))
            .and_then(echo("never"));

        let result = ProcessExecutor.execute(&command).unwrap();

        assert!(!result.success());
        assert_eq!(result.exit_code(), Some(1));
        assert_eq!(result.stdout(), "first\n");
    }

    #[test]
    fn process_executor_redirects_and_sets_env() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.txt");

        let mut printenv = Invocation::new("printenv");
        printenv
            .arg("BACKUP_SECRET")
            .secret_env("BACKUP_SECRET", "s3cret")
            .stdout_to(&target);
        let mut command = CommandLine::new(printenv);
        command.current_dir(dir.path());

        let result = ProcessExecutor.execute(&command).unwrap();

        assert!(result.success());
        assert!(result.stdout().is_empty());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "s3cret\n");
        assert!(!result.command().contains("s3cret"));
    }

    #[test]
    fn process_executor_reports_unlaunchable_program() {
        let command = CommandLine::new(Invocation::new("definitely-not-a-backup-tool"));

        let err = ProcessExecutor.execute(&command).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn process_executor_leaves_command_logging_to_backends() {
        log::set_logger(&EXECUTOR_LOG).unwrap();
        log::set_max_level(log::LevelFilter::Trace);

        let result = ProcessExecutor
            .execute(&CommandLine::new(echo("logged-once")))
            .unwrap();

        assert!(result.success());
        assert!(!EXECUTOR_LOG
            .0
            .lock()
            .unwrap()
            .iter()
            .any(|message| message.contains("logged-once")));
    }

    #[test]
    fn process_executor_leaves_no_dump_behind_on_launch_failure() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("sql-dump.sql");

        let mut dump = Invocation::new("definitely-not-a-backup-tool");
        dump.stdout_to(&target);
        let command = CommandLine::new(dump);

        let err = ProcessExecutor.execute(&command).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!target.exists());
    }
}
