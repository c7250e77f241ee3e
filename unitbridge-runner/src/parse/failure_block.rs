// Copyright (c) The unitbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use regex::Regex;
use std::sync::LazyLock;

/// The rule printed above each failure block.
pub const DOUBLE_RULE: &str =
    "======================================================================";

/// The rule printed between a failure block's header and its traceback.
pub const SINGLE_RULE: &str =
    "----------------------------------------------------------------------";

// ======================================================================
// FAIL: test_blah (some.package.SimpleTest)
// ----------------------------------------------------------------------
// Traceback (most recent call last):
//   ...
// AssertionError
// <blank line>
static FAILURE_BLOCK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?s){DOUBLE_RULE}\n(FAIL|ERROR): (.*)\n{SINGLE_RULE}\n(.*?)\n\n"
    ))
    .expect("failure block regex is valid")
});

/// What may directly follow the double rule at the start of a failure block.
const FAILURE_HEADERS: [&str; 2] = ["\nFAIL: ", "\nERROR: "];

/// A delimited traceback block for one failed or errored test.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FailureBlock<'a> {
    /// The name of the test the block belongs to.
    pub name: &'a str,

    /// The traceback, without the trailing blank line.
    pub body: &'a str,

    /// The byte offset just past the matched block.
    pub end: usize,
}

impl<'a> FailureBlock<'a> {
    /// Finds the first complete failure block in `haystack`.
    pub fn find(haystack: &'a str) -> Option<Self> {
        Self::find_at(haystack, 0)
    }

    /// Finds the first complete failure block in `haystack` that starts at or after `start`.
    ///
    /// Offsets in the returned value are relative to the whole of `haystack`.
    pub fn find_at(haystack: &'a str, start: usize) -> Option<Self> {
        // Every match starts at a double rule, so begin the search at the first one.
        let start = start + haystack.get(start..)?.find(DOUBLE_RULE)?;
        let captures = FAILURE_BLOCK_REGEX.captures_at(haystack, start)?;
        let whole = captures.get(0).expect("group 0 is always present");

        Some(Self {
            name: captures.get(2).expect("group 2 is mandatory").as_str(),
            body: captures.get(3).expect("group 3 is mandatory").as_str(),
            end: whole.end(),
        })
    }
}

impl FailureBlock<'_> {
    /// Returns the offset of the first double rule at or after `from` that could still begin a
    /// failure block.
    ///
    /// A rule followed by anything other than a failure header can never begin a block, however
    /// much output arrives later, so it is skipped.
    pub(super) fn next_candidate(haystack: &str, from: usize) -> Option<usize> {
        let mut search_from = from;
        loop {
            let rule_start = search_from + haystack.get(search_from..)?.find(DOUBLE_RULE)?;
            let after_rule = &haystack[rule_start + DOUBLE_RULE.len()..];
            let live = FAILURE_HEADERS
                .iter()
                .any(|header| after_rule.starts_with(header) || header.starts_with(after_rule));
            if live {
                return Some(rule_start);
            }
            // Rules are ASCII, so the next byte is a char boundary.
            search_from = rule_start + 1;
        }
    }
}
