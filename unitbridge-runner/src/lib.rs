// Copyright (c) The unitbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for unitbridge.
//!
//! unitbridge runs a Python `unittest`-style test suite (through Django's `manage.py test`), scans
//! the free-form runner output for individual test outcomes and failure tracebacks, and attaches
//! per-line coverage produced by `coverage.py` to the results.
//!
//! The basic flow is:
//!
//! 1. An [engine](engine::UnitTestEngine) runs the test command, streaming merged stdout and
//!    stderr lines into a [`StreamingParser`](parse::StreamingParser).
//! 2. The [`RunAggregator`](aggregate::RunAggregator) combines the parsed results with the exit
//!    code, synthesizing a whole-suite failure if no tests could be recovered.
//! 3. If coverage is enabled, the [`CoverageAnnotator`](coverage::CoverageAnnotator) attaches a
//!    suite-wide [`CoverageMap`](coverage::CoverageMap) to every result.
//! 4. The resulting [`RunOutcome`](outcome::RunOutcome) is handed to a
//!    [reporter](reporter::Reporter).

pub mod aggregate;
pub mod config;
pub mod coverage;
pub mod engine;
pub mod errors;
mod helpers;
pub mod outcome;
pub mod parse;
pub mod reporter;
mod test_command;
