// Copyright (c) The unitbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run Python unittest suites and report structured results with line coverage.
//!
//! `unitbridge run` runs a Django project's tests through `manage.py test`, recovers individual test
//! outcomes and tracebacks from the runner output, and attaches per-line coverage from
//! `coverage.py` for the requested source files.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{Color, OutputContext, StderrStyles};
