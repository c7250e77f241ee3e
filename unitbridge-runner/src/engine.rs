// Copyright (c) The unitbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test engines.
//!
//! An engine runs one ecosystem's test suite and produces a [`RunOutcome`]. Engines are
//! independent of each other: each one runs in its own working directory and cleans up its own
//! artifacts.

mod composite;
mod django;

pub use composite::CompositeEngine;
pub use django::DjangoEngine;

use crate::{errors::EngineRunError, outcome::RunOutcome};
use camino::{Utf8Path, Utf8PathBuf};

/// A test engine.
pub trait UnitTestEngine {
    /// The name of this engine, used in reports and error messages.
    fn name(&self) -> &str;

    /// Runs the test suite.
    ///
    /// Test failures are reported through the returned outcome. An error means the suite couldn't
    /// be run at all.
    fn run(&self) -> Result<RunOutcome, EngineRunError>;
}

/// Information shared by all engines in a run.
#[derive(Clone, Debug)]
pub struct EngineContext {
    project_root: Utf8PathBuf,
    paths: Vec<Utf8PathBuf>,
}

impl EngineContext {
    /// Creates a new context.
    ///
    /// `paths` are the source files the caller is interested in, relative to the project root.
    pub fn new(project_root: impl Into<Utf8PathBuf>, paths: Vec<Utf8PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            paths,
        }
    }

    /// The project root.
    pub fn project_root(&self) -> &Utf8Path {
        &self.project_root
    }

    /// The requested source paths.
    pub fn paths(&self) -> &[Utf8PathBuf] {
        &self.paths
    }
}

/// The outcome of a single engine within a composite run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EngineOutcome {
    /// The name of the engine.
    pub engine: String,

    /// What the engine reported.
    pub outcome: RunOutcome,
}
