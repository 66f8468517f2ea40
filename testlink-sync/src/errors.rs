// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING, StderrStyles};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use std::error::Error;
use testlink_runner::{
    errors::{CatalogLoadError, ConfigParseError, ConfigValidationError, ReconcileError},
    reconcile::BuildOutcome,
};
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

/// Documented exit codes for `testlink-sync` failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum TestlinkSyncExitCode {}

impl TestlinkSyncExitCode {
    /// Every result was reported.
    pub const OK: i32 = 0;

    /// Some results or attachments could not be reported.
    pub const BUILD_UNSTABLE: i32 = 10;

    /// A user issue happened while setting up the run.
    pub const SETUP_ERROR: i32 = 96;

    /// The build was marked as failed by configuration.
    pub const BUILD_FAILED: i32 = 100;

    /// The remote system failed fatally and the remaining test cases were not reported.
    pub const SYNC_ABORTED: i32 = 101;

    /// Writing data to stdout produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An expected error: setup problems, or a run whose outcome is not a success.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("base directory not found")]
    BaseDirNotFound { base_dir: Utf8PathBuf },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("invalid seeker")]
    InvalidSeeker {
        #[from]
        err: ConfigValidationError,
    },
    #[error("catalog load error")]
    CatalogLoadError {
        #[from]
        err: CatalogLoadError,
    },
    #[error("failed to create outbox")]
    OutboxCreateError {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("reconciliation aborted")]
    SyncAborted {
        #[from]
        err: ReconcileError,
    },
    #[error("build is {outcome}")]
    RunUnsuccessful { outcome: BuildOutcome },
    #[error("error writing output")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn outbox_create_error(path: Utf8PathBuf, err: std::io::Error) -> Self {
        Self::OutboxCreateError { path, err }
    }

    pub(crate) fn write_output_error(err: std::io::Error) -> Self {
        Self::WriteOutputError { err }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::BaseDirNotFound { .. }
            | Self::ConfigParseError { .. }
            | Self::InvalidSeeker { .. }
            | Self::CatalogLoadError { .. }
            | Self::OutboxCreateError { .. } => TestlinkSyncExitCode::SETUP_ERROR,
            Self::SyncAborted { .. } => TestlinkSyncExitCode::SYNC_ABORTED,
            Self::RunUnsuccessful { outcome } => match outcome {
                BuildOutcome::Success => TestlinkSyncExitCode::OK,
                BuildOutcome::Unstable => TestlinkSyncExitCode::BUILD_UNSTABLE,
                BuildOutcome::Failure => TestlinkSyncExitCode::BUILD_FAILED,
            },
            Self::WriteOutputError { .. } => TestlinkSyncExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::BaseDirNotFound { base_dir } => {
                error!(
                    "base directory `{}` does not exist or is not a directory",
                    base_dir.style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => {
                error!(
                    "failed to parse config at `{}`",
                    err.config_file().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::InvalidSeeker { err } => {
                error!("{err}");
                None
            }
            Self::CatalogLoadError { err } => {
                error!("{err}");
                err.source()
            }
            Self::OutboxCreateError { path, err } => {
                error!("failed to create outbox at `{}`", path.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::SyncAborted { err } => {
                let ReconcileError::SyncAborted {
                    test_case_id,
                    summary,
                    err,
                } = err
                else {
                    error!("{err}");
                    return;
                };
                error!(
                    "reporting test case {} failed fatally, {} results were reported before \
                     the remaining test cases were skipped",
                    test_case_id.style(styles.bold),
                    summary.updated,
                );
                Some(err as &dyn Error)
            }
            Self::RunUnsuccessful { outcome } => {
                error!("build is {}", outcome.style(styles.warning_text));
                None
            }
            Self::WriteOutputError { err } => {
                error!("error writing output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
