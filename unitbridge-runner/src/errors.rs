// Copyright (c) The unitbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by unitbridge.
//!
//! Malformed runner output and coverage failures never produce errors: they degrade to fewer
//! results or to empty coverage. The errors here cover configuration, process spawning and
//! report writing.

use camino::Utf8PathBuf;
use config::ConfigError;
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse unitbridge config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    err: ConfigError,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, err: ConfigError) -> Self {
        Self {
            config_file: config_file.into(),
            err,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }
}

/// An error that occurred while determining the project root.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProjectRootError {
    /// The current directory couldn't be read.
    #[error("failed to read current directory")]
    CurrentDir(#[source] std::io::Error),

    /// The current directory isn't valid UTF-8.
    #[error("current directory is not valid UTF-8")]
    NonUtf8(#[source] camino::FromPathBufError),
}

/// An error that occurred while running a test engine.
///
/// Test failures are not errors: they are reported through the
/// [`RunOutcome`](crate::outcome::RunOutcome). This error means the test runner itself could not
/// be executed.
#[derive(Debug, Error)]
pub enum EngineRunError {
    /// The test command could not be started.
    #[error("engine `{engine}` failed to execute `{command}`")]
    Spawn {
        /// The name of the engine.
        engine: String,

        /// The command line that failed.
        command: String,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// Reading output from the test command failed.
    #[error("engine `{engine}` failed to read output from `{command}`")]
    ReadOutput {
        /// The name of the engine.
        engine: String,

        /// The command line being read from.
        command: String,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// Extra test arguments from the config couldn't be split into words.
    #[error("engine `{engine}`: failed to split `{input}` into arguments")]
    ArgsParse {
        /// The name of the engine.
        engine: String,

        /// The string that failed to split.
        input: String,

        /// The underlying error.
        #[source]
        error: shell_words::ParseError,
    },
}

/// An error that occurred while writing a JUnit report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteJunitError {
    /// An error occurred while creating the report file or its directory.
    #[error("error writing JUnit output to {file}")]
    Fs {
        /// The file being written to.
        file: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// An error occurred while serializing the report.
    #[error("error serializing JUnit output to {file}")]
    Junit {
        /// The file being written to.
        file: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: quick_junit::SerializeError,
    },
}

/// An error that occurred while writing human-readable or JSON output.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteReportError {
    /// An I/O error occurred.
    #[error("error writing report")]
    Io(#[source] std::io::Error),

    /// An error occurred while serializing JSON.
    #[error("error serializing report to JSON")]
    Json(#[source] serde_json::Error),
}

/// Error returned while parsing a [`CoverageString`](crate::coverage::CoverageString) from a
/// string.
#[derive(Clone, Debug, Error)]
#[error("invalid character {ch:?} at index {index} in coverage string `{input}`")]
pub struct CoverageStringParseError {
    input: String,
    index: usize,
    ch: char,
}

impl CoverageStringParseError {
    pub(crate) fn new(input: impl Into<String>, index: usize, ch: char) -> Self {
        Self {
            input: input.into(),
            index,
            ch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_run_error_source() {
        let error = EngineRunError::Spawn {
            engine: "django".to_owned(),
            command: "python manage.py test".to_owned(),
            error: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(
            error.to_string(),
            "engine `django` failed to execute `python manage.py test`"
        );
        assert_eq!(
            std::error::Error::source(&error).map(|source| source.to_string()),
            Some("no such file".to_owned())
        );
    }
}
