//! CLI support for esq-lang
//!
//! The subcommands of the `esq` binary as plain functions, so they can be
//! embedded in other tools and tested without a terminal.

mod check;
mod run;

pub use check::{CheckMode, CheckOptions, CheckResult, execute_check};
pub use run::{DryRunExecutor, RunOptions, RunReport, execute_run};

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Syntax(#[from] crate::SyntaxError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("No input provided. Pass a program, use --file, or pipe it to stdin.")]
    NoInput,
}
