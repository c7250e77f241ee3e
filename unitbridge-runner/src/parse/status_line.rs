// Copyright (c) The unitbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::outcome::{TestResultEntry, TestStatus};
use regex::Regex;
use std::sync::LazyLock;

/// The separator between a test's description and its status token.
pub(super) const STATUS_SEPARATOR: &str = " ... ";

/// Test method names start with this prefix.
const TEST_NAME_PREFIX: &str = "test_";

const SKIP_MARKER: &str = "skipped";
/// The reason follows the marker and a single space.
const SKIP_REASON_OFFSET: usize = SKIP_MARKER.len() + 1;

// test_blah blah (some.package.SimpleTest) blahblah ... ok
static STATUS_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)(test_.*? \(.*?\)).*? \.\.\. (.*)\n").expect("status line regex is valid")
});

/// A status line found in runner output, reporting one test's outcome.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusLine<'a> {
    /// The test name, including the parenthesized test case context.
    pub name: &'a str,

    /// The raw status token following the separator.
    pub token: &'a str,

    /// The byte offset just past the matched record.
    pub end: usize,
}

impl<'a> StatusLine<'a> {
    /// Finds the first status line in `haystack`.
    pub fn find(haystack: &'a str) -> Option<Self> {
        Self::find_at(haystack, 0)
    }

    /// Finds the first status line in `haystack` that starts at or after `start`.
    ///
    /// Offsets in the returned value are relative to the whole of `haystack`.
    pub fn find_at(haystack: &'a str, start: usize) -> Option<Self> {
        let captures = STATUS_LINE_REGEX.captures_at(haystack, start)?;
        let whole = captures.get(0).expect("group 0 is always present");
        let name = captures.get(1).expect("group 1 is mandatory");
        let token = captures.get(2).expect("group 2 is mandatory");

        Some(Self {
            name: name.as_str(),
            token: token.as_str(),
            end: whole.end(),
        })
    }

    /// Returns the offset of the first place at or after `from` where a status line could start.
    ///
    /// Every status line starts with the test name prefix, so text before the first occurrence
    /// never needs to be searched again.
    pub(super) fn next_candidate(haystack: &str, from: usize) -> Option<usize> {
        let rest = haystack.get(from..)?;
        rest.find(TEST_NAME_PREFIX).map(|offset| from + offset)
    }

    /// Converts this status line into a fresh result entry.
    pub fn to_entry(&self) -> TestResultEntry {
        let (status, diagnostic) = Self::classify_token(self.token);
        TestResultEntry::new(self.name, status).with_diagnostic(diagnostic)
    }

    /// Classifies a status token, returning the status and the initial diagnostic.
    ///
    /// `ok` is a pass, `FAIL` and `ERROR` are failures, and any token starting with `skipped` is a
    /// skip whose diagnostic is the reason. Everything else is unsound.
    pub fn classify_token(token: &str) -> (TestStatus, &str) {
        match token {
            "ok" => (TestStatus::Pass, ""),
            "FAIL" | "ERROR" => (TestStatus::Fail, ""),
            _ if token.starts_with(SKIP_MARKER) => (TestStatus::Skip, skip_reason(token)),
            _ => (TestStatus::Unsound, ""),
        }
    }
}

/// Extracts the reason from a skip token such as `skipped 'needs network'`.
///
/// The reason starts after the `skipped ` marker. unittest prints the reason as a Python string
/// literal, so a single surrounding pair of matching quotes is dropped.
fn skip_reason(token: &str) -> &str {
    let reason = token
        .char_indices()
        .nth(SKIP_REASON_OFFSET)
        .map_or("", |(offset, _)| &token[offset..]);

    for quote in ['\'', '"'] {
        if let Some(inner) = reason
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    reason
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("ok", TestStatus::Pass, "" ; "pass")]
    #[test_case("FAIL", TestStatus::Fail, "" ; "fail")]
    #[test_case("ERROR", TestStatus::Fail, "" ; "error")]
    #[test_case("skipped 'reason text'", TestStatus::Skip, "reason text" ; "skip quoted")]
    #[test_case("skipped \"it's broken\"", TestStatus::Skip, "it's broken" ; "skip double quoted")]
    #[test_case("skipped reason text", TestStatus::Skip, "reason text" ; "skip bare")]
    #[test_case("skipped", TestStatus::Skip, "" ; "skip without reason")]
    #[test_case("expected failure", TestStatus::Unsound, "" ; "expected failure")]
    #[test_case("Ok", TestStatus::Unsound, "" ; "wrong case")]
    #[test_case("", TestStatus::Unsound, "" ; "empty")]
    fn classify(token: &str, status: TestStatus, diagnostic: &str) {
        assert_eq!(StatusLine::classify_token(token), (status, diagnostic));
    }

    #[test]
    fn find_simple() {
        let haystack = "test_x (pkg.Case) ... ok\n";
        let line = StatusLine::find(haystack).expect("status line found");
        assert_eq!(line.name, "test_x (pkg.Case)");
        assert_eq!(line.token, "ok");
        assert_eq!(line.end, haystack.len());
    }

    #[test]
    fn find_with_docstring() {
        // With -v2, unittest prints the first line of the docstring between the name and the
        // separator.
        let haystack = "test_x (pkg.Case)\nChecks the thing. ... FAIL\n";
        let line = StatusLine::find(haystack).expect("status line found");
        assert_eq!(line.name, "test_x (pkg.Case)");
        assert_eq!(line.token, "FAIL");
    }

    #[test]
    fn find_skips_leading_noise() {
        let haystack = "Creating test database for alias 'default'...\ntest_y (a.B) ... ok\n";
        let line = StatusLine::find(haystack).expect("status line found");
        assert_eq!(line.name, "test_y (a.B)");
        assert_eq!(line.end, haystack.len());
    }

    #[test]
    fn find_requires_terminated_line() {
        assert_eq!(StatusLine::find("test_x (pkg.Case) ... ok"), None);
        assert_eq!(StatusLine::find("test_x (pkg.Case) ok\n"), None);
        assert_eq!(StatusLine::find("check_x (pkg.Case) ... ok\n"), None);
    }

    #[test]
    fn to_entry() {
        let line = StatusLine::find("test_s (m.T) ... skipped 'later'\n").unwrap();
        let entry = line.to_entry();
        assert_eq!(entry.name(), "test_s (m.T)");
        assert_eq!(entry.status(), TestStatus::Skip);
        assert_eq!(entry.diagnostic(), "later");
    }

    #[test]
    fn find_at_resumes_at_candidate() {
        let haystack = "collecting ... done\nmore noise\ntest_z (m.T) ... ok\n";
        let start = StatusLine::next_candidate(haystack, 0).expect("candidate found");
        assert_eq!(&haystack[start..], "test_z (m.T) ... ok\n");

        let line = StatusLine::find_at(haystack, start).expect("status line found");
        assert_eq!(line, StatusLine::find(haystack).expect("status line found"));
        assert_eq!(line.end, haystack.len());

        assert_eq!(StatusLine::next_candidate(haystack, start + 1), None);
        assert_eq!(StatusLine::next_candidate("collecting ... done\n", 0), None);
    }
}
