// Copyright (c) The unitbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reports run outcomes.
//!
//! The main structure in this module is [`Reporter`], which writes human-readable or JSON output.
//! JUnit XML is written separately through [`JunitReporter`].

mod human;
mod junit;

pub use junit::JunitReporter;

use crate::{errors::WriteReportError, outcome::RunOutcome};
use human::HumanReporter;
use std::{fmt, io::Write};

/// The format used for the main report.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum MessageFormat {
    /// One line per test, failure diagnostics, and a summary.
    #[default]
    Human,

    /// The outcome, serialized as pretty-printed JSON.
    Json,
}

impl fmt::Display for MessageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageFormat::Human => write!(f, "human"),
            MessageFormat::Json => write!(f, "json"),
        }
    }
}

/// Reporter builder.
#[derive(Debug, Default)]
pub struct ReporterBuilder {
    should_colorize: bool,
    message_format: MessageFormat,
}

impl ReporterBuilder {
    /// Set to true if the reporter should colorize output.
    pub fn set_colorize(&mut self, should_colorize: bool) -> &mut Self {
        self.should_colorize = should_colorize;
        self
    }

    /// Sets the output format.
    pub fn set_message_format(&mut self, message_format: MessageFormat) -> &mut Self {
        self.message_format = message_format;
        self
    }

    /// Creates a new reporter.
    pub fn build(&self) -> Reporter {
        let inner = match self.message_format {
            MessageFormat::Human => {
                let mut human = HumanReporter::default();
                if self.should_colorize {
                    human.colorize();
                }
                ReporterInner::Human(human)
            }
            MessageFormat::Json => ReporterInner::Json,
        };
        Reporter { inner }
    }
}

/// Writes the outcome of a run.
#[derive(Debug)]
pub struct Reporter {
    inner: ReporterInner,
}

#[derive(Debug)]
enum ReporterInner {
    Human(HumanReporter),
    Json,
}

impl Reporter {
    /// Writes `outcome` to `writer`.
    pub fn write_outcome(
        &self,
        outcome: &RunOutcome,
        mut writer: impl Write,
    ) -> Result<(), WriteReportError> {
        match &self.inner {
            ReporterInner::Human(human) => human
                .write_outcome(outcome, &mut writer)
                .map_err(WriteReportError::Io),
            ReporterInner::Json => {
                serde_json::to_writer_pretty(&mut writer, outcome)
                    .map_err(WriteReportError::Json)?;
                writeln!(writer).map_err(WriteReportError::Io)
            }
        }
    }
}
