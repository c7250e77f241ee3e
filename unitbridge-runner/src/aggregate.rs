// Copyright (c) The unitbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Combines parsed results, the runner's exit status and coverage into a final
//! [`RunOutcome`].

use crate::{
    coverage::CoverageSource,
    outcome::{RunOutcome, TestResultEntry, TestStatus},
};
use std::sync::Arc;
use tracing::debug;

/// The prefix of the name given to the synthetic entry reported when the runner failed without
/// reporting any test.
pub const SYNTHETIC_FAILURE_PREFIX: &str = "Failed to run: ";

/// Returns the name of the synthetic whole-suite failure for the given entry point.
pub fn synthetic_failure_name(entry_point: &str) -> String {
    format!("{SYNTHETIC_FAILURE_PREFIX}{entry_point}")
}

/// Produces the final outcome of a single runner invocation.
#[derive(Clone, Copy)]
pub struct RunAggregator<'a> {
    entry_point: &'a str,
    coverage: Option<&'a dyn CoverageSource>,
}

impl<'a> RunAggregator<'a> {
    /// Creates a new aggregator.
    ///
    /// `entry_point` is the path of the script that was run, used to name the synthetic failure.
    /// If `coverage` is `None`, coverage is disabled.
    pub fn new(entry_point: &'a str, coverage: Option<&'a dyn CoverageSource>) -> Self {
        Self {
            entry_point,
            coverage,
        }
    }

    /// Aggregates a run.
    ///
    /// If the runner exited with a non-zero code and no test was recovered from its output, the
    /// whole suite is reported as a single failed entry whose diagnostic is the complete output.
    /// Coverage is only gathered when at least one test was recovered.
    pub fn aggregate<S: AsRef<str>>(
        &self,
        parsed: RunOutcome,
        raw_lines: &[S],
        exit_code: i32,
    ) -> RunOutcome {
        if parsed.is_empty() {
            if exit_code == 0 {
                debug!(
                    "{} exited successfully without reporting any tests",
                    self.entry_point
                );
                return parsed;
            }

            let name = synthetic_failure_name(self.entry_point);
            debug!("no tests recovered and exit code was {exit_code}, reporting {name}");
            let diagnostic = raw_lines
                .iter()
                .map(|line| line.as_ref())
                .collect::<Vec<_>>()
                .join("\n");
            return std::iter::once(
                TestResultEntry::new(name, TestStatus::Fail).with_diagnostic(diagnostic),
            )
            .collect();
        }

        let mut outcome = parsed;
        if let Some(source) = self.coverage {
            outcome.attach_coverage(Arc::new(source.coverage_map()));
        }
        outcome
    }
}
