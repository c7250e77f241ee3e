// Copyright (c) The unitbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    engine::EngineOutcome,
    errors::WriteJunitError,
    outcome::{TestResultEntry, TestStatus},
};
use camino::Utf8Path;
use quick_junit::{NonSuccessKind, Report, TestCase, TestCaseStatus, TestSuite};
use std::fs::File;
use tracing::debug;

/// Writes run outcomes as JUnit XML, with one test suite per engine.
#[derive(Clone, Debug)]
pub struct JunitReporter {
    report_name: String,
}

impl JunitReporter {
    /// The default report name.
    pub const DEFAULT_REPORT_NAME: &'static str = "unitbridge-run";

    /// Creates a new JUnit reporter.
    pub fn new(report_name: impl Into<String>) -> Self {
        Self {
            report_name: report_name.into(),
        }
    }

    /// Builds the report.
    pub fn to_report(&self, outcomes: &[EngineOutcome]) -> Report {
        let mut report = Report::new(self.report_name.as_str());
        report.add_test_suites(outcomes.iter().map(|engine_outcome| {
            let mut suite = TestSuite::new(engine_outcome.engine.as_str());
            suite.add_test_cases(
                engine_outcome
                    .outcome
                    .iter()
                    .map(|entry| to_test_case(&engine_outcome.engine, entry)),
            );
            suite
        }));
        report
    }

    /// Writes the report to `path`, creating its parent directory if necessary.
    pub fn write(
        &self,
        path: &Utf8Path,
        outcomes: &[EngineOutcome],
    ) -> Result<(), WriteJunitError> {
        let report = self.to_report(outcomes);

        if let Some(dir) = path.parent().filter(|dir| !dir.as_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|error| WriteJunitError::Fs {
                file: dir.to_path_buf(),
                error,
            })?;
        }

        let f = File::create(path).map_err(|error| WriteJunitError::Fs {
            file: path.to_path_buf(),
            error,
        })?;
        report.serialize(f).map_err(|error| WriteJunitError::Junit {
            file: path.to_path_buf(),
            error,
        })?;

        debug!("wrote JUnit report to {path}");
        Ok(())
    }
}

impl Default for JunitReporter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_REPORT_NAME)
    }
}

fn to_test_case(engine: &str, entry: &TestResultEntry) -> TestCase {
    let status = match entry.status() {
        TestStatus::Pass => TestCaseStatus::success(),
        TestStatus::Fail => {
            let mut status = TestCaseStatus::non_success(NonSuccessKind::Failure);
            status.set_type("test failure");
            set_diagnostic(&mut status, entry.diagnostic());
            status
        }
        TestStatus::Unsound => {
            let mut status = TestCaseStatus::non_success(NonSuccessKind::Error);
            status.set_type("unrecognized status");
            set_diagnostic(&mut status, entry.diagnostic());
            status
        }
        TestStatus::Skip => {
            let mut status = TestCaseStatus::skipped();
            if !entry.diagnostic().is_empty() {
                status.set_message(entry.diagnostic());
            }
            status
        }
    };

    let (name, classname) = split_test_name(entry.name()).unwrap_or((entry.name(), engine));
    let mut test_case = TestCase::new(name, status);
    test_case.set_classname(classname);
    test_case
}

fn set_diagnostic(status: &mut TestCaseStatus, diagnostic: &str) {
    if diagnostic.is_empty() {
        return;
    }
    // The last line of a traceback is the exception.
    if let Some(last_line) = diagnostic.lines().rev().find(|line| !line.trim().is_empty()) {
        status.set_message(last_line.trim());
    }
    status.set_description(diagnostic);
}

/// Splits `test_method (module.Class)` into the method and the class.
fn split_test_name(name: &str) -> Option<(&str, &str)> {
    let (method, rest) = name.rsplit_once(" (")?;
    let classname = rest.strip_suffix(')')?;
    Some((method, classname))
}
