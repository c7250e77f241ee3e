// Copyright (c) The unitbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{EngineOutcome, UnitTestEngine};
use crate::{errors::EngineRunError, outcome::RunOutcome};
use tracing::debug;

/// Runs several engines one after the other and concatenates their results.
///
/// If two engines report a test with the same name, the later engine's entry replaces the earlier
/// one.
#[derive(Default)]
pub struct CompositeEngine {
    engines: Vec<Box<dyn UnitTestEngine>>,
}

impl CompositeEngine {
    /// Creates a new, empty composite engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an engine to the end of the list.
    pub fn push(&mut self, engine: impl UnitTestEngine + 'static) -> &mut Self {
        self.engines.push(Box::new(engine));
        self
    }

    /// The number of engines.
    pub fn len(&self) -> usize {
        self.engines.len()
    }

    /// Returns true if there are no engines.
    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Runs every engine in order, returning each engine's outcome separately.
    ///
    /// Stops at the first engine that fails to run.
    pub fn run_each(&self) -> Result<Vec<EngineOutcome>, EngineRunError> {
        self.engines
            .iter()
            .map(|engine| {
                let outcome = engine.run()?;
                debug!(
                    "engine `{}` reported {} results",
                    engine.name(),
                    outcome.len()
                );
                Ok(EngineOutcome {
                    engine: engine.name().to_owned(),
                    outcome,
                })
            })
            .collect()
    }

    /// Concatenates per-engine outcomes.
    pub fn merge(outcomes: impl IntoIterator<Item = EngineOutcome>) -> RunOutcome {
        let mut merged = RunOutcome::new();
        for engine_outcome in outcomes {
            merged.extend(engine_outcome.outcome);
        }
        merged
    }
}

impl UnitTestEngine for CompositeEngine {
    fn name(&self) -> &str {
        "composite"
    }

    fn run(&self) -> Result<RunOutcome, EngineRunError> {
        Ok(Self::merge(self.run_each()?))
    }
}
