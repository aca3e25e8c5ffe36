//! Reporting of per-resource outcomes and the summary of a run.

use std::fmt;

use derive_more::Display;

use crate::backends::BackupError;
use crate::executor::CommandResult;

/// Phases of a backup run, in the order they are executed.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq)]
pub enum Phase {
    #[display("files")]
    Files,
    #[display("database")]
    Database,
    #[display("git")]
    Git,
}

impl Phase {
    fn target(self) -> &'static str {
        match self {
            Phase::Files => "backend::files",
            Phase::Database => "backend::database",
            Phase::Git => "backend::git",
        }
    }
}

/// Outcome of the backup of a single resource.
#[derive(Debug)]
pub struct ResourceOutcome {
    phase: Phase,
    resource: String,
    result: Result<CommandResult, BackupError>,
}

impl ResourceOutcome {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn result(&self) -> &Result<CommandResult, BackupError> {
        &self.result
    }

    /// The backup tool ran and exited successfully.
    pub fn succeeded(&self) -> bool {
        matches!(&self.result, Ok(result) if result.success())
    }
}

/// Collects the outcomes of a run and logs each one as it is recorded.
#[derive(Debug, Default)]
pub struct RunReport {
    outcomes: Vec<ResourceOutcome>,
}

impl RunReport {
    pub fn record(
        &mut self,
        phase: Phase,
        resource: impl Into<String>,
        result: Result<CommandResult, BackupError>,
    ) {
        let resource = resource.into();
        let target = phase.target();
        match &result {
            Ok(result) if result.success() => log::info!(target: target, "{resource}: {result}"),
            Ok(result) => log::error!(target: target, "{resource} failed: {result}"),
            Err(e) => log::error!(target: target, "{resource} failed: {e}"),
        }

        self.outcomes.push(ResourceOutcome {
            phase,
            resource,
            result,
        });
    }

    pub fn outcomes(&self) -> &[ResourceOutcome] {
        &self.outcomes
    }

    pub fn summary(&self) -> RunSummary {
        let (succeeded, failed): (Vec<_>, Vec<_>) =
            self.outcomes.iter().partition(|outcome| outcome.succeeded());

        RunSummary {
            succeeded: succeeded.len(),
            failed: failed
                .into_iter()
                .map(|outcome| format!("{} {}", outcome.phase, outcome.resource))
                .collect(),
        }
    }
}

/// Success and failure counts of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    /// Failed resources as `<phase> <resource>`.
    pub failed: Vec<String>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Backup finished: {} succeeded, {} failed",
            self.succeeded,
            self.failed.len()
        )?;
        if !self.failed.is_empty() {
            write!(f, " ({})", self.failed.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn completed(exit_code: i32) -> Result<CommandResult, BackupError> {
        Ok(CommandResult::new("true".into(), Some(exit_code), String::new()))
    }

    #[test]
    fn empty_run_is_successful() {
        let summary = RunReport::default().summary();

        assert!(summary.is_success());
        assert_eq!(summary.to_string(), "Backup finished: 0 succeeded, 0 failed");
    }

    #[test]
    fn summary_names_failed_resources() {
        let mut report = RunReport::default();
        report.record(Phase::Files, "/var/www/site", completed(0));
        report.record(Phase::Database, "#0 mysql:shop", completed(2));
        report.record(
            Phase::Git,
            "/srv/git/site",
            Err(BackupError::Launch {
                command: "git add .".into(),
                source: io::Error::from(io::ErrorKind::NotFound),
            }),
        );

        let summary = report.summary();

        assert!(!summary.is_success());
        assert_eq!(summary.succeeded, 1);
        assert_eq!(
            summary.to_string(),
            "Backup finished: 1 succeeded, 2 failed (database #0 mysql:shop, git /srv/git/site)"
        );
        assert_eq!(report.outcomes()[1].phase(), Phase::Database);
        assert!(report.outcomes()[2].result().is_err());
    }

    #[test]
    fn killed_process_is_a_failure() {
        let mut report = RunReport::default();
        report.record(
            Phase::Files,
            "/var/www/site",
            Ok(CommandResult::new("rsync".into(), None, String::new())),
        );

        assert!(!report.summary().is_success());
    }
}
