// Copyright (c) The unitbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::EngineRunError;
use camino::{Utf8Path, Utf8PathBuf};
use std::io::{BufRead, BufReader};
use tracing::{debug, warn};

/// A command that runs a test suite.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct TestCommand {
    program: String,
    args: Vec<String>,
    cwd: Utf8PathBuf,
}

impl TestCommand {
    pub(crate) fn new(program: impl Into<String>, cwd: impl Into<Utf8PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    pub(crate) fn add_arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub(crate) fn add_args<I>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[cfg(test)]
    pub(crate) fn args(&self) -> &[String] {
        &self.args
    }

    pub(crate) fn cwd(&self) -> &Utf8Path {
        &self.cwd
    }

    /// The command line, quoted for display.
    pub(crate) fn display(&self) -> String {
        shell_words::join(std::iter::once(&self.program).chain(&self.args))
    }

    pub(crate) fn to_expression(&self) -> duct::Expression {
        // as_str so that the program is looked up in PATH.
        duct::cmd(self.program.as_str(), self.args.iter().map(|arg| arg.as_str()))
            .dir(self.cwd.as_std_path())
    }

    /// Runs the command to completion, discarding its output.
    ///
    /// Used for housekeeping steps whose failure doesn't affect the run.
    pub(crate) fn run_quiet(&self) {
        let expression = self.to_expression();
        debug!("executing `{}` in {}", self.display(), self.cwd);
        match expression
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
        {
            Ok(output) if output.status.success() => {}
            Ok(output) => {
                warn!("`{}` failed with {}", self.display(), output.status);
                debug!("stderr:\n{}", String::from_utf8_lossy(&output.stderr));
            }
            Err(error) => warn!("failed to execute `{}`: {error}", self.display()),
        }
    }

    /// Runs the command with standard error merged into standard output, calling `on_line` for
    /// each line as it is produced.
    ///
    /// Line terminators (`\n` or `\r\n`) are stripped, and invalid UTF-8 is replaced. A non-zero
    /// exit code is not an error.
    pub(crate) fn run_streaming(
        &self,
        engine: &str,
        mut on_line: impl FnMut(&str),
    ) -> Result<CapturedRun, EngineRunError> {
        let expression = self.to_expression().stderr_to_stdout().unchecked();
        debug!("executing `{}` in {}", self.display(), self.cwd);

        let handle = expression.reader().map_err(|error| EngineRunError::Spawn {
            engine: engine.to_owned(),
            command: self.display(),
            error,
        })?;

        let mut reader = BufReader::new(&handle);
        let mut lines = Vec::new();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|error| EngineRunError::ReadOutput {
                    engine: engine.to_owned(),
                    command: self.display(),
                    error,
                })?;
            if read == 0 {
                break;
            }

            let line = strip_line_terminator(&buf);
            let line = String::from_utf8_lossy(line);
            on_line(&line);
            lines.push(line.into_owned());
        }

        // Reading to EOF waits for the child to exit.
        let exit_code = match handle.try_wait() {
            Ok(Some(output)) => output.status.code().unwrap_or_else(|| {
                debug!("`{}` was terminated by a signal", self.display());
                -1
            }),
            Ok(None) => {
                warn!("`{}` closed its output but did not exit", self.display());
                -1
            }
            Err(error) => {
                return Err(EngineRunError::ReadOutput {
                    engine: engine.to_owned(),
                    command: self.display(),
                    error,
                });
            }
        };

        Ok(CapturedRun { lines, exit_code })
    }
}

/// The output and exit code of a completed test command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct CapturedRun {
    pub(crate) lines: Vec<String>,
    pub(crate) exit_code: i32,
}

fn strip_line_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_quotes_args() {
        let mut command = TestCommand::new("python", "/proj");
        command
            .add_arg("manage.py")
            .add_args(["test", "-v2"])
            .add_arg("my app");
        assert_eq!(command.display(), "python manage.py test -v2 'my app'");
    }

    #[test]
    fn strip_terminators() {
        assert_eq!(strip_line_terminator(b"ok\n"), b"ok");
        assert_eq!(strip_line_terminator(b"ok\r\n"), b"ok");
        assert_eq!(strip_line_terminator(b"ok"), b"ok");
        assert_eq!(strip_line_terminator(b"\n"), b"");
    }

    #[test]
    fn spawn_failure() {
        let dir = Utf8TempDir::new().unwrap();
        let command = TestCommand::new("unitbridge-test-no-such-python", dir.path());
        let error = command.run_streaming("django", |_| {}).unwrap_err();
        assert!(
            matches!(error, EngineRunError::Spawn { .. }),
            "unexpected error: {error}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn streams_merged_output() {
        let dir = Utf8TempDir::new().unwrap();
        let mut command = TestCommand::new("sh", dir.path());
        command.add_args([
            "-c",
            "pwd; echo out; echo err 1>&2; printf 'crlf\\r\\nlast'; exit 3",
        ]);

        let mut seen = Vec::new();
        let run = command
            .run_streaming("django", |line| seen.push(line.to_owned()))
            .unwrap();

        assert_eq!(run.exit_code, 3);
        assert_eq!(run.lines, seen);
        let cwd = dir.path().canonicalize_utf8().unwrap();
        assert_eq!(run.lines, [cwd.as_str(), "out", "err", "crlf", "last"]);
    }
}
