// Copyright (c) The unitbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;
use unitbridge_runner::errors::{
    ConfigParseError, EngineRunError, ProjectRootError, WriteJunitError, WriteReportError,
};

/// Documented exit codes for `unitbridge` failures.
#[derive(Copy, Clone, Debug)]
pub struct UnitBridgeExitCode;

impl UnitBridgeExitCode {
    /// The run completed and no test failed.
    pub const OK: i32 = 0;

    /// The run completed but at least one test failed, was unsound, or the suite failed to run.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// An error occurred while setting up the run: reading the config, resolving paths or
    /// starting the test command.
    pub const SETUP_ERROR: i32 = 96;

    /// Writing the report or the JUnit file failed.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}

/// An error that is expected to happen in normal operation and gets reported to the user.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("failed to determine project root")]
    ProjectRoot {
        #[from]
        err: ProjectRootError,
    },
    #[error("config parse error")]
    ConfigParse {
        #[from]
        err: ConfigParseError,
    },
    #[error("path outside project root")]
    PathOutsideProjectRoot {
        path: Utf8PathBuf,
        project_root: Utf8PathBuf,
    },
    #[error("test engine failed to run")]
    EngineRun {
        #[from]
        err: EngineRunError,
    },
    #[error("failed to write report")]
    WriteReport {
        #[from]
        err: WriteReportError,
    },
    #[error("failed to write JUnit report")]
    WriteJunit {
        #[from]
        err: WriteJunitError,
    },
    #[error("test run failed")]
    TestRunFailed,
}

impl ExpectedError {
    pub(crate) fn path_outside_project_root(path: Utf8PathBuf, project_root: Utf8PathBuf) -> Self {
        Self::PathOutsideProjectRoot { path, project_root }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::ProjectRoot { .. }
            | Self::ConfigParse { .. }
            | Self::PathOutsideProjectRoot { .. }
            | Self::EngineRun { .. } => UnitBridgeExitCode::SETUP_ERROR,
            Self::WriteReport { .. } | Self::WriteJunit { .. } => {
                UnitBridgeExitCode::WRITE_OUTPUT_ERROR
            }
            Self::TestRunFailed => UnitBridgeExitCode::TEST_RUN_FAILED,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::ProjectRoot { err } => {
                error!("{err}");
                err.source()
            }
            Self::ConfigParse { err } => {
                error!(
                    "failed to parse unitbridge config at `{}`",
                    err.config_file().style(styles.bold)
                );
                err.source()
            }
            Self::PathOutsideProjectRoot { path, project_root } => {
                error!(
                    "path `{}` is outside the project root `{}`",
                    path.style(styles.bold),
                    project_root.style(styles.bold),
                );
                None
            }
            Self::EngineRun { err } => {
                error!("{err}");
                err.source()
            }
            Self::WriteReport { err } => {
                error!("{err}");
                err.source()
            }
            Self::WriteJunit { err } => {
                error!("{err}");
                err.source()
            }
            Self::TestRunFailed => {
                error!("test run failed");
                None
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(
            ExpectedError::TestRunFailed.process_exit_code(),
            UnitBridgeExitCode::TEST_RUN_FAILED
        );
        assert_eq!(
            ExpectedError::path_outside_project_root("/elsewhere/a.py".into(), "/proj".into())
                .process_exit_code(),
            UnitBridgeExitCode::SETUP_ERROR
        );
        let err = WriteReportError::Io(std::io::Error::other("broken pipe"));
        assert_eq!(
            ExpectedError::from(err).process_exit_code(),
            UnitBridgeExitCode::WRITE_OUTPUT_ERROR
        );
    }
}
