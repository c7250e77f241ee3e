// Copyright (c) The unitbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Incremental parsing of unittest runner output.
//!
//! With `-v2`, Python's unittest runner reports one status line per test as it runs:
//!
//! ```text
//! test_login (accounts.tests.LoginTest) ... ok
//! test_logout (accounts.tests.LoginTest) ... FAIL
//! test_signup (accounts.tests.SignupTest) ... skipped 'needs smtp'
//! ```
//!
//! and after the run, one delimited failure block per failed or errored test:
//!
//! ```text
//! ======================================================================
//! FAIL: test_logout (accounts.tests.LoginTest)
//! ----------------------------------------------------------------------
//! Traceback (most recent call last):
//!   ...
//! AssertionError: 302 != 200
//!
//! ```
//!
//! The [`StreamingParser`] consumes this output one line at a time and builds a
//! [`RunOutcome`](crate::outcome::RunOutcome). Test output may be interleaved with both kinds of
//! records, so the parser keeps a buffer of not-yet-matched text and only drops text once it has
//! been consumed by a match.

mod failure_block;
mod status_line;

pub use failure_block::{DOUBLE_RULE, FailureBlock, SINGLE_RULE};
pub use status_line::StatusLine;

use crate::outcome::RunOutcome;
use status_line::STATUS_SEPARATOR;
use tracing::debug;

/// Builds a [`RunOutcome`] from unittest output, one line at a time.
///
/// After each line, the parser extracts every complete status line from its buffer, then every
/// complete failure block. Status lines go first so that a failure block can be attached to a test
/// reported in the same chunk of output.
///
/// A status line can only be completed by a line containing `" ... "`, and a failure block can
/// only be completed by a blank line, so the buffer is only searched when one of those arrives.
/// Each search resumes at the earliest place a record could still start, so text that can never
/// begin a record is not searched again.
#[derive(Clone, Debug, Default)]
pub struct StreamingParser {
    buffer: String,
    // No status line starts before this offset into `buffer`.
    status_from: usize,
    // No failure block starts before this offset into `buffer`.
    failure_from: usize,
    outcome: RunOutcome,
    orphaned_blocks: usize,
}

impl StreamingParser {
    /// Creates a new parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line of output to the parser. `line` should not include its line terminator.
    pub fn push_line(&mut self, line: &str) {
        self.buffer.push_str(line);
        self.buffer.push('\n');

        if line.contains(STATUS_SEPARATOR) {
            self.extract_status_lines();
        }
        if line.is_empty() {
            self.extract_failure_blocks();
        }
    }

    /// Returns the results recovered so far.
    pub fn outcome(&self) -> &RunOutcome {
        &self.outcome
    }

    /// The number of failure blocks seen for tests without a status line.
    ///
    /// These blocks are discarded.
    pub fn orphaned_blocks(&self) -> usize {
        self.orphaned_blocks
    }

    /// Finishes parsing, discarding any unmatched output.
    pub fn finish(self) -> RunOutcome {
        if !self.buffer.is_empty() {
            debug!(
                "discarding {} bytes of unmatched test output",
                self.buffer.len()
            );
        }
        self.outcome
    }

    // ---
    // Helper methods
    // ---

    fn extract_status_lines(&mut self) {
        loop {
            let Some(start) = StatusLine::next_candidate(&self.buffer, self.status_from) else {
                // The buffer always ends with a newline here, so no candidate spans the end.
                self.status_from = self.buffer.len();
                return;
            };
            self.status_from = start;

            let Some(status_line) = StatusLine::find_at(&self.buffer, start) else {
                return;
            };
            let entry = status_line.to_entry();
            let end = status_line.end;
            if let Some(prev) = self.outcome.insert(entry) {
                debug!("test {} reported more than once", prev.name());
            }
            self.consume(end);
        }
    }

    fn extract_failure_blocks(&mut self) {
        loop {
            let Some(start) = FailureBlock::next_candidate(&self.buffer, self.failure_from) else {
                self.failure_from = self.buffer.len();
                return;
            };
            self.failure_from = start;

            let Some(block) = FailureBlock::find_at(&self.buffer, start) else {
                return;
            };
            let end = block.end;
            match self.outcome.get_mut(block.name) {
                Some(entry) => entry.set_diagnostic(block.body),
                None => {
                    debug!(
                        "discarding failure block for {}: no status line was seen",
                        block.name
                    );
                    self.orphaned_blocks += 1;
                }
            }
            self.consume(end);
        }
    }

    /// Drops the first `end` bytes of the buffer.
    fn consume(&mut self, end: usize) {
        self.buffer.drain(..end);
        self.status_from = self.status_from.saturating_sub(end);
        self.failure_from = self.failure_from.saturating_sub(end);
    }
}

/// Parses complete runner output.
pub fn parse_output<I, S>(lines: I) -> RunOutcome
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = StreamingParser::new();
    for line in lines {
        parser.push_line(line.as_ref());
    }
    parser.finish()
}
