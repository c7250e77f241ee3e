// Copyright (c) The unitbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The structured test result model.
//!
//! A [`RunOutcome`] is an ordered mapping from test name to [`TestResultEntry`]. Entries are
//! created by the [parser](crate::parse) in stream order, and later mutated at most once to attach
//! a failure diagnostic and at most once to attach coverage.

use crate::coverage::CoverageMap;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::{fmt, sync::Arc};

/// The status of a single test, as reported by the test runner.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestStatus {
    /// The test passed.
    Pass,

    /// The test failed or errored out.
    Fail,

    /// The test was skipped.
    Skip,

    /// The runner reported a status that wasn't recognized.
    Unsound,
}

impl TestStatus {
    /// Returns true if this status should not fail the run.
    pub fn is_success(self) -> bool {
        match self {
            TestStatus::Pass | TestStatus::Skip => true,
            TestStatus::Fail | TestStatus::Unsound => false,
        }
    }

    /// Returns the uppercase label used for human-readable output.
    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Pass => "PASS",
            TestStatus::Fail => "FAIL",
            TestStatus::Skip => "SKIP",
            TestStatus::Unsound => "UNSOUND",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of a single test case recovered from runner output.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestResultEntry {
    name: String,
    status: TestStatus,
    diagnostic: String,
    #[serde(
        serialize_with = "serialize_coverage",
        skip_serializing_if = "Option::is_none"
    )]
    coverage: Option<Arc<CoverageMap>>,
}

impl TestResultEntry {
    /// Creates a new entry with an empty diagnostic and no coverage.
    pub fn new(name: impl Into<String>, status: TestStatus) -> Self {
        Self {
            name: name.into(),
            status,
            diagnostic: String::new(),
            coverage: None,
        }
    }

    /// Sets the diagnostic on a freshly-created entry.
    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = diagnostic.into();
        self
    }

    /// The name of the test. Unique within a run.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The status reported for this test.
    pub fn status(&self) -> TestStatus {
        self.status
    }

    /// Failure traceback, skip reason, or empty.
    pub fn diagnostic(&self) -> &str {
        &self.diagnostic
    }

    /// Suite-wide coverage, if the coverage annotator ran.
    pub fn coverage(&self) -> Option<&Arc<CoverageMap>> {
        self.coverage.as_ref()
    }

    pub(crate) fn set_diagnostic(&mut self, diagnostic: impl Into<String>) {
        self.diagnostic = diagnostic.into();
    }

    pub(crate) fn set_coverage(&mut self, coverage: Arc<CoverageMap>) {
        self.coverage = Some(coverage);
    }
}

fn serialize_coverage<S: Serializer>(
    coverage: &Option<Arc<CoverageMap>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    coverage.as_deref().serialize(serializer)
}

/// The ordered set of results produced by a run, keyed by test name.
///
/// Inserting an entry whose name is already present replaces the earlier entry but keeps its
/// position.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RunOutcome {
    entries: IndexMap<String, TestResultEntry>,
}

impl RunOutcome {
    /// Creates a new, empty outcome.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, returning the entry previously recorded under the same name.
    pub fn insert(&mut self, entry: TestResultEntry) -> Option<TestResultEntry> {
        self.entries.insert(entry.name.clone(), entry)
    }

    /// Returns the entry with the given name.
    pub fn get(&self, name: &str) -> Option<&TestResultEntry> {
        self.entries.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut TestResultEntry> {
        self.entries.get_mut(name)
    }

    /// Returns true if an entry with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries were recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TestResultEntry> + '_ {
        self.entries.values()
    }

    /// Appends all entries from `other`. Entries in `other` replace same-named entries in `self`.
    pub fn extend(&mut self, other: RunOutcome) {
        self.entries.extend(other.entries);
    }

    /// Attaches the same coverage map to every entry.
    pub fn attach_coverage(&mut self, coverage: Arc<CoverageMap>) {
        for entry in self.entries.values_mut() {
            entry.set_coverage(coverage.clone());
        }
    }

    /// Computes pass/fail counts for this outcome.
    pub fn stats(&self) -> RunStats {
        let mut stats = RunStats::default();
        for entry in self.iter() {
            stats.on_entry(entry);
        }
        stats
    }
}

impl IntoIterator for RunOutcome {
    type Item = TestResultEntry;
    type IntoIter = indexmap::map::IntoValues<String, TestResultEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

impl FromIterator<TestResultEntry> for RunOutcome {
    fn from_iter<T: IntoIterator<Item = TestResultEntry>>(iter: T) -> Self {
        let mut outcome = RunOutcome::new();
        for entry in iter {
            outcome.insert(entry);
        }
        outcome
    }
}

/// Statistics for a run.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
pub struct RunStats {
    /// The total number of tests reported.
    pub total: usize,

    /// The number of tests that passed.
    pub passed: usize,

    /// The number of tests that failed.
    pub failed: usize,

    /// The number of tests that were skipped.
    pub skipped: usize,

    /// The number of tests whose status wasn't recognized.
    pub unsound: usize,
}

impl RunStats {
    /// Returns true if no tests failed and no status was unrecognized.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.unsound == 0
    }

    fn on_entry(&mut self, entry: &TestResultEntry) {
        self.total += 1;
        match entry.status() {
            TestStatus::Pass => self.passed += 1,
            TestStatus::Fail => self.failed += 1,
            TestStatus::Skip => self.skipped += 1,
            TestStatus::Unsound => self.unsound += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::CoverageString;
    use camino::Utf8Path;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_overwrites_in_place() {
        let mut outcome = RunOutcome::new();
        outcome.insert(TestResultEntry::new("test_a (m.T)", TestStatus::Fail));
        outcome.insert(TestResultEntry::new("test_b (m.T)", TestStatus::Pass));
        let prev = outcome.insert(TestResultEntry::new("test_a (m.T)", TestStatus::Pass));

        assert_eq!(prev.map(|entry| entry.status()), Some(TestStatus::Fail));
        let names: Vec<_> = outcome.iter().map(|entry| entry.name()).collect();
        assert_eq!(names, ["test_a (m.T)", "test_b (m.T)"]);
        assert_eq!(
            outcome.get("test_a (m.T)").map(|entry| entry.status()),
            Some(TestStatus::Pass)
        );
    }

    #[test]
    fn attach_coverage_shares_map() {
        let mut outcome: RunOutcome = [
            TestResultEntry::new("test_a (m.T)", TestStatus::Pass),
            TestResultEntry::new("test_b (m.T)", TestStatus::Skip),
        ]
        .into_iter()
        .collect();

        let mut map = CoverageMap::new();
        map.insert("app/models.py".into(), "CCU".parse().unwrap());
        let map = Arc::new(map);
        outcome.attach_coverage(map.clone());
        // Attaching twice must leave the same mapping everywhere.
        outcome.attach_coverage(map.clone());

        for entry in outcome.iter() {
            let coverage = entry.coverage().expect("coverage attached");
            assert!(Arc::ptr_eq(coverage, &map));
        }
        assert_eq!(
            map.get(Utf8Path::new("app/models.py")),
            Some(&"CCU".parse::<CoverageString>().unwrap())
        );
    }

    #[test]
    fn stats() {
        let outcome: RunOutcome = [
            TestResultEntry::new("test_a (m.T)", TestStatus::Pass),
            TestResultEntry::new("test_b (m.T)", TestStatus::Fail),
            TestResultEntry::new("test_c (m.T)", TestStatus::Skip),
            TestResultEntry::new("test_d (m.T)", TestStatus::Unsound),
        ]
        .into_iter()
        .collect();

        let stats = outcome.stats();
        assert_eq!(
            stats,
            RunStats {
                total: 4,
                passed: 1,
                failed: 1,
                skipped: 1,
                unsound: 1,
            }
        );
        assert!(!stats.is_success());
        assert!(RunStats::default().is_success());
    }

    #[test]
    fn serialize_json() {
        let mut outcome = RunOutcome::new();
        outcome.insert(
            TestResultEntry::new("test_a (m.T)", TestStatus::Skip).with_diagnostic("not today"),
        );
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(
            json,
            r#"{"test_a (m.T)":{"name":"test_a (m.T)","status":"skip","diagnostic":"not today"}}"#
        );
    }
}
