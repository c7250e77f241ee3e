// Copyright (c) The unitbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    coverage::CoverageMark,
    helpers::plural_tests,
    outcome::{RunOutcome, RunStats, TestResultEntry, TestStatus},
};
use owo_colors::{OwoColorize, Style};
use std::io::{self, Write};

const DIAGNOSTIC_INDENT: &str = "    ";

#[derive(Debug, Default)]
pub(super) struct HumanReporter {
    styles: Styles,
}

impl HumanReporter {
    pub(super) fn colorize(&mut self) {
        self.styles.colorize();
    }

    pub(super) fn write_outcome(
        &self,
        outcome: &RunOutcome,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        for entry in outcome.iter() {
            self.write_status_line(entry, writer)?;
        }

        for entry in outcome.iter() {
            if !entry.status().is_success() && !entry.diagnostic().is_empty() {
                self.write_diagnostic(entry, writer)?;
            }
        }

        self.write_summary(&outcome.stats(), writer)?;
        self.write_coverage(outcome, writer)
    }

    // ---
    // Helper methods
    // ---

    fn write_status_line(&self, entry: &TestResultEntry, writer: &mut dyn Write) -> io::Result<()> {
        let style = self.styles.for_status(entry.status());
        write!(
            writer,
            "{:>7} [{}]",
            entry.status().as_str().style(style),
            entry.name()
        )?;
        if entry.status() == TestStatus::Skip && !entry.diagnostic().is_empty() {
            write!(writer, " {}", entry.diagnostic())?;
        }
        writeln!(writer)
    }

    fn write_diagnostic(&self, entry: &TestResultEntry, writer: &mut dyn Write) -> io::Result<()> {
        let style = self.styles.for_status(entry.status());
        writeln!(
            writer,
            "\n{}",
            format!("--- {}: {} ---", entry.status(), entry.name()).style(style)
        )?;
        for line in entry.diagnostic().lines() {
            if line.is_empty() {
                writeln!(writer)?;
            } else {
                writeln!(writer, "{DIAGNOSTIC_INDENT}{line}")?;
            }
        }
        Ok(())
    }

    fn write_summary(&self, stats: &RunStats, writer: &mut dyn Write) -> io::Result<()> {
        let summary_style = if stats.is_success() {
            self.styles.pass
        } else {
            self.styles.fail
        };
        write!(
            writer,
            "\n{:>7} {} {}: ",
            "Summary".style(summary_style),
            stats.total.style(self.styles.count),
            plural_tests(stats.total),
        )?;
        write!(
            writer,
            "{} {}, {} {}, {} {}",
            stats.passed.style(self.styles.count),
            "passed".style(self.styles.pass),
            stats.failed.style(self.styles.count),
            "failed".style(self.styles.fail),
            stats.skipped.style(self.styles.count),
            "skipped".style(self.styles.skip),
        )?;
        if stats.unsound > 0 {
            write!(
                writer,
                ", {} {}",
                stats.unsound.style(self.styles.count),
                "unsound".style(self.styles.fail),
            )?;
        }
        writeln!(writer)
    }

    fn write_coverage(&self, outcome: &RunOutcome, writer: &mut dyn Write) -> io::Result<()> {
        // Coverage is suite-wide, so every entry carries the same map.
        let Some(coverage) = outcome.iter().find_map(|entry| entry.coverage()) else {
            return Ok(());
        };

        if coverage.is_empty() {
            return writeln!(
                writer,
                "{:>7} no data collected",
                "Coverage".style(self.styles.count)
            );
        }

        writeln!(writer, "{:>7}", "Coverage".style(self.styles.count))?;
        for (path, marks) in coverage.iter() {
            writeln!(
                writer,
                "{DIAGNOSTIC_INDENT}{}: {}/{} executable lines covered",
                path.style(self.styles.path),
                marks.count(CoverageMark::Covered),
                marks.executable_count(),
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Styles {
    count: Style,
    pass: Style,
    fail: Style,
    skip: Style,
    path: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.skip = Style::new().yellow().bold();
        self.path = Style::new().blue().bold();
    }

    fn for_status(&self, status: TestStatus) -> Style {
        match status {
            TestStatus::Pass => self.pass,
            TestStatus::Fail | TestStatus::Unsound => self.fail,
            TestStatus::Skip => self.skip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::CoverageMap;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn render(outcome: &RunOutcome) -> String {
        let mut buf = Vec::new();
        HumanReporter::default().write_outcome(outcome, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn full_report() {
        let mut outcome: RunOutcome = [
            TestResultEntry::new("test_a (m.T)", TestStatus::Pass),
            TestResultEntry::new("test_b (m.T)", TestStatus::Fail)
                .with_diagnostic("Traceback (most recent call last):\n\nAssertionError"),
            TestResultEntry::new("test_c (m.T)", TestStatus::Skip).with_diagnostic("needs smtp"),
            TestResultEntry::new("test_d (m.T)", TestStatus::Unsound),
        ]
        .into_iter()
        .collect();

        let mut coverage = CoverageMap::new();
        coverage.insert("app/models.py".into(), "CCUNX".parse().unwrap());
        outcome.attach_coverage(Arc::new(coverage));

        assert_eq!(
            render(&outcome),
            indoc! {"
                   PASS [test_a (m.T)]
                   FAIL [test_b (m.T)]
                   SKIP [test_c (m.T)] needs smtp
                UNSOUND [test_d (m.T)]

                --- FAIL: test_b (m.T) ---
                    Traceback (most recent call last):

                    AssertionError

                Summary 4 tests: 1 passed, 1 failed, 1 skipped, 1 unsound
                Coverage
                    app/models.py: 2/3 executable lines covered
            "}
        );
    }

    #[test]
    fn empty_outcome() {
        assert_eq!(
            render(&RunOutcome::new()),
            "\nSummary 0 tests: 0 passed, 0 failed, 0 skipped\n"
        );
    }

    #[test]
    fn empty_coverage() {
        let mut outcome: RunOutcome = [TestResultEntry::new("test_a (m.T)", TestStatus::Pass)]
            .into_iter()
            .collect();
        outcome.attach_coverage(Arc::new(CoverageMap::new()));
        assert_eq!(
            render(&outcome),
            indoc! {"
                   PASS [test_a (m.T)]

                Summary 1 test: 1 passed, 0 failed, 0 skipped
                Coverage no data collected
            "}
        );
    }
}
