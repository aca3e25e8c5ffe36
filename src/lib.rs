//! Library to create dated backups of a file tree, databases and git repositories.
//!
//! A [`Configuration`](config::Configuration) declares what to protect. Each run
//! resolves a destination directory named after the current day and then runs
//! the backup phases in order:
//!
//! - [`Files`](backends::Files): copy of selected paths below the document root using `rsync`.
//! - [`Database`](backends::Database): native dump of every declared database.
//! - [`GitRepository`](backends::GitRepository): commit and push of every listed repository.
//!
//! The external tools are driven through an [`Executor`](executor::Executor).

#![forbid(unsafe_code)]

pub mod backends;
pub mod cli;
pub mod config;
pub mod executor;
pub mod report;
pub mod run;
