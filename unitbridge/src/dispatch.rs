// Copyright (c) The unitbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError, UnitBridgeExitCode,
    output::{OutputContext, OutputOpts, clap_styles},
};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use unitbridge_runner::{
    config::{UnitBridgeConfig, current_dir, discover_project_root},
    engine::{CompositeEngine, DjangoEngine, EngineContext},
    reporter::{JunitReporter, MessageFormat, ReporterBuilder},
};

/// Run Python unittest suites and report structured results with line coverage.
#[derive(Debug, Parser)]
#[command(version, styles = clap_styles::style())]
pub struct UnitBridgeApp {
    #[clap(flatten)]
    output: OutputOpts,

    #[clap(subcommand)]
    command: Command,
}

impl UnitBridgeApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    ///
    /// Returns the exit code.
    pub fn exec(self, output: OutputContext) -> Result<i32, ExpectedError> {
        match self.command {
            Command::Run(opts) => opts.exec(output),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the project's unit tests
    ///
    /// Runs the Django test suite through `manage.py test`, prints one line per test and a
    /// summary, and attaches line coverage for the given source files.
    Run(RunOpts),
}

#[derive(Debug, Args)]
struct RunOpts {
    /// Project root [default: nearest ancestor with .config/unitbridge.toml, or the current
    /// directory]
    #[arg(long, value_name = "DIR")]
    project_root: Option<Utf8PathBuf>,

    /// Config file [default: <project-root>/.config/unitbridge.toml]
    #[arg(long, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,

    /// Do not collect coverage, overriding the config
    #[arg(long)]
    no_coverage: bool,

    /// Output format for the report
    #[arg(long, value_enum, default_value_t, value_name = "FORMAT")]
    message_format: MessageFormatOpt,

    /// Also write a JUnit XML report to this path
    #[arg(long, value_name = "PATH")]
    junit: Option<Utf8PathBuf>,

    /// Source files to collect coverage for
    #[arg(value_name = "PATHS")]
    paths: Vec<Utf8PathBuf>,
}

impl RunOpts {
    fn exec(self, output: OutputContext) -> Result<i32, ExpectedError> {
        let cwd = current_dir()?;
        let project_root = match self.project_root {
            Some(root) => absolutize(&cwd, &root),
            None => discover_project_root(&cwd),
        };
        debug!("project root: {project_root}");

        let mut config = UnitBridgeConfig::from_sources(
            project_root.clone(),
            self.config_file.as_deref(),
        )?;
        if self.no_coverage {
            config.django_mut().coverage = false;
        }

        let paths = self
            .paths
            .iter()
            .map(|path| relativize(&cwd, &project_root, path))
            .collect::<Result<Vec<_>, _>>()?;

        let context = EngineContext::new(project_root, paths);
        let mut composite = CompositeEngine::new();
        composite.push(DjangoEngine::new(config.django().clone(), context));

        let outcomes = composite.run_each()?;

        if let Some(junit) = &self.junit {
            let junit = absolutize(&cwd, junit);
            JunitReporter::default().write(&junit, &outcomes)?;
            info!("wrote JUnit report to {junit}");
        }

        let outcome = CompositeEngine::merge(outcomes);
        let reporter = ReporterBuilder::default()
            .set_colorize(output.color.should_colorize(supports_color::Stream::Stdout))
            .set_message_format(self.message_format.into())
            .build();
        reporter.write_outcome(&outcome, std::io::stdout().lock())?;

        if outcome.stats().is_success() {
            Ok(UnitBridgeExitCode::OK)
        } else {
            Err(ExpectedError::TestRunFailed)
        }
    }
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum MessageFormatOpt {
    /// Human-readable output
    #[default]
    Human,

    /// Pretty-printed JSON keyed by test name
    Json,
}

impl From<MessageFormatOpt> for MessageFormat {
    fn from(opt: MessageFormatOpt) -> Self {
        match opt {
            MessageFormatOpt::Human => MessageFormat::Human,
            MessageFormatOpt::Json => MessageFormat::Json,
        }
    }
}

/// Resolves `path` against `cwd`, removing `.` and `..` components lexically.
fn absolutize(cwd: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    let joined = cwd.join(path);
    let mut absolute = Utf8PathBuf::new();
    for component in joined.components() {
        match component {
            Utf8Component::CurDir => {}
            // `..` at the root stays at the root.
            Utf8Component::ParentDir => {
                absolute.pop();
            }
            other => absolute.push(other),
        }
    }
    absolute
}

/// Converts a path given on the command line into a path relative to the project root.
fn relativize(
    cwd: &Utf8Path,
    project_root: &Utf8Path,
    path: &Utf8Path,
) -> Result<Utf8PathBuf, ExpectedError> {
    let absolute = absolutize(cwd, path);
    match absolute.strip_prefix(project_root) {
        Ok(relative) => Ok(relative.to_owned()),
        Err(_) => Err(ExpectedError::path_outside_project_root(
            absolute,
            project_root.to_owned(),
        )),
    }
}
