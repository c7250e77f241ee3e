// Copyright (c) The unitbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{EngineContext, UnitTestEngine};
use crate::{
    aggregate::RunAggregator,
    config::DjangoConfig,
    coverage::{CoverageAnnotator, CoverageSource},
    errors::EngineRunError,
    outcome::RunOutcome,
    parse::StreamingParser,
    test_command::TestCommand,
};
use camino::Utf8PathBuf;
use std::io;
use tracing::{debug, info, warn};

/// The data file `coverage run` writes into its working directory.
const COVERAGE_DATA_FILE: &str = ".coverage";

/// Runs a Django project's tests through `manage.py test`.
#[derive(Clone, Debug)]
pub struct DjangoEngine {
    config: DjangoConfig,
    context: EngineContext,
}

impl DjangoEngine {
    /// The name of this engine.
    pub const NAME: &'static str = "django";

    /// Creates a new Django engine.
    pub fn new(config: DjangoConfig, context: EngineContext) -> Self {
        Self { config, context }
    }

    /// The directory tests run from: `manage-py-dir` under the project root.
    pub fn working_dir(&self) -> Utf8PathBuf {
        let project_root = self.context.project_root();
        if self.config.manage_py_dir.as_str().is_empty() {
            // Joining an empty path would add a trailing separator.
            project_root.to_owned()
        } else {
            project_root.join(&self.config.manage_py_dir)
        }
    }

    // ---
    // Helper methods
    // ---

    fn test_command(&self) -> Result<TestCommand, EngineRunError> {
        let mut command = if self.config.coverage {
            let mut command = TestCommand::new(&self.config.coverage_program, self.working_dir());
            // Only measure code under the working directory, which excludes third-party packages.
            command.add_args(["run", "--source=."]);
            command
        } else {
            TestCommand::new(&self.config.python_program, self.working_dir())
        };

        command
            .add_arg(&self.config.manage_py_file)
            .add_args(["test", "-v2"])
            .add_args(self.split_words(&self.config.test_apps)?)
            .add_args(self.split_words(&self.config.manage_py_args)?);
        Ok(command)
    }

    fn erase_command(&self) -> TestCommand {
        let mut command = TestCommand::new(&self.config.coverage_program, self.working_dir());
        command.add_arg("erase");
        command
    }

    fn split_words(&self, input: &str) -> Result<Vec<String>, EngineRunError> {
        shell_words::split(input).map_err(|error| EngineRunError::ArgsParse {
            engine: Self::NAME.to_owned(),
            input: input.to_owned(),
            error,
        })
    }

    /// Moves the coverage data file from the working directory into the project root, where
    /// `coverage annotate` runs.
    fn relocate_coverage_data(&self) {
        let working_dir = self.working_dir();
        let project_root = self.context.project_root();
        if working_dir == project_root {
            return;
        }

        let from = working_dir.join(COVERAGE_DATA_FILE);
        let to = project_root.join(COVERAGE_DATA_FILE);
        match std::fs::rename(&from, &to) {
            Ok(()) => debug!("moved {from} to {to}"),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!("no coverage data at {from}");
            }
            Err(error) => warn!("failed to move {from} to {to}: {error}"),
        }
    }
}

impl UnitTestEngine for DjangoEngine {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self) -> Result<RunOutcome, EngineRunError> {
        let command = self.test_command()?;
        info!(
            "running Django tests in {}: {}",
            command.cwd(),
            command.display()
        );

        if self.config.coverage {
            // Clear data from earlier runs.
            self.erase_command().run_quiet();
        }

        let mut parser = StreamingParser::new();
        let captured = command.run_streaming(Self::NAME, |line| parser.push_line(line))?;
        debug!(
            "{} exited with code {}, {} lines of output",
            self.config.manage_py_file,
            captured.exit_code,
            captured.lines.len()
        );
        if parser.orphaned_blocks() > 0 {
            debug!(
                "{} failure block(s) didn't match a reported test",
                parser.orphaned_blocks()
            );
        }

        if self.config.coverage {
            self.relocate_coverage_data();
        }

        let mut annotator =
            CoverageAnnotator::new(self.context.project_root(), self.context.paths());
        annotator.set_program(&self.config.coverage_program);
        let coverage: Option<&dyn CoverageSource> = if self.config.coverage {
            Some(&annotator)
        } else {
            None
        };

        Ok(
            RunAggregator::new(&self.config.manage_py_file, coverage).aggregate(
                parser.finish(),
                &captured.lines,
                captured.exit_code,
            ),
        )
    }
}
