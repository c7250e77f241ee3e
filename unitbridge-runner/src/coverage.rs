// Copyright (c) The unitbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-line coverage from `coverage annotate` artifacts.
//!
//! `coverage annotate` writes a copy of every measured source file next to the original, named
//! `<original-path>,cover`, where each line is prefixed by a marker describing whether it ran. The
//! [`CoverageAnnotator`] runs that step, compresses each artifact into a [`CoverageString`], and
//! deletes the artifact afterwards.

use crate::{
    errors::CoverageStringParseError,
    helpers::{convert_rel_path_to_forward_slash, normalize_source_path},
};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Serialize, Serializer};
use std::{collections::BTreeMap, collections::BTreeSet, fmt, str::FromStr};
use tracing::{debug, warn};

/// The file name suffix `coverage annotate` uses for its output.
pub const ANNOTATION_SUFFIX: &str = ",cover";

/// Coverage for a set of source files, keyed by project-relative path with forward slashes.
pub type CoverageMap = BTreeMap<Utf8PathBuf, CoverageString>;

/// The coverage status of a single source line.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CoverageMark {
    /// The line was executed.
    Covered,

    /// The line is executable but was not executed.
    Uncovered,

    /// The line has no executable code.
    NotExecutable,

    /// The line was excluded from coverage accounting.
    Excluded,
}

impl CoverageMark {
    /// Maps the leading byte of an annotated line to a mark.
    ///
    /// Returns `None` for markers `coverage annotate` doesn't document.
    pub fn from_annotation_marker(marker: u8) -> Option<Self> {
        match marker {
            b'>' => Some(CoverageMark::Covered),
            b'!' => Some(CoverageMark::Uncovered),
            b' ' => Some(CoverageMark::NotExecutable),
            b'-' => Some(CoverageMark::Excluded),
            _ => None,
        }
    }

    /// The character used for this mark in a [`CoverageString`].
    pub fn as_char(self) -> char {
        match self {
            CoverageMark::Covered => 'C',
            CoverageMark::Uncovered => 'U',
            CoverageMark::NotExecutable => 'N',
            CoverageMark::Excluded => 'X',
        }
    }

    /// The inverse of [`Self::as_char`].
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            'C' => Some(CoverageMark::Covered),
            'U' => Some(CoverageMark::Uncovered),
            'N' => Some(CoverageMark::NotExecutable),
            'X' => Some(CoverageMark::Excluded),
            _ => None,
        }
    }
}

/// Line-by-line coverage for a single source file, rendered as one character per line (`C`, `U`,
/// `N` or `X`).
///
/// Lines with an unrecognized annotation marker contribute no mark, so after such a line the
/// index into the string no longer matches the source line number.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct CoverageString {
    marks: Vec<CoverageMark>,
}

impl CoverageString {
    /// Builds a coverage string from the raw contents of a `,cover` file.
    pub fn from_annotation(contents: &[u8]) -> Self {
        contents
            .split(|&b| b == b'\n')
            .filter_map(|line| line.first().copied())
            .filter_map(CoverageMark::from_annotation_marker)
            .collect()
    }

    /// The marks, in source order.
    pub fn marks(&self) -> &[CoverageMark] {
        &self.marks
    }

    /// The number of marks.
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    /// Returns true if there are no marks.
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// The number of lines with the given mark.
    pub fn count(&self, mark: CoverageMark) -> usize {
        self.marks.iter().filter(|&&m| m == mark).count()
    }

    /// The number of executable lines, covered or not.
    pub fn executable_count(&self) -> usize {
        self.count(CoverageMark::Covered) + self.count(CoverageMark::Uncovered)
    }
}

impl FromIterator<CoverageMark> for CoverageString {
    fn from_iter<T: IntoIterator<Item = CoverageMark>>(iter: T) -> Self {
        Self {
            marks: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for CoverageString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for mark in &self.marks {
            write!(f, "{}", mark.as_char())?;
        }
        Ok(())
    }
}

impl FromStr for CoverageString {
    type Err = CoverageStringParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars()
            .enumerate()
            .map(|(index, ch)| {
                CoverageMark::from_char(ch)
                    .ok_or_else(|| CoverageStringParseError::new(s, index, ch))
            })
            .collect()
    }
}

impl Serialize for CoverageString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A source of suite-wide coverage for a run.
pub trait CoverageSource {
    /// Produces the coverage map for the run.
    fn coverage_map(&self) -> CoverageMap;
}

/// Runs `coverage annotate` and turns the resulting artifacts into a [`CoverageMap`].
#[derive(Clone, Debug)]
pub struct CoverageAnnotator {
    project_root: Utf8PathBuf,
    requested: BTreeSet<Utf8PathBuf>,
    program: String,
}

impl CoverageAnnotator {
    /// The default coverage executable.
    pub const DEFAULT_PROGRAM: &'static str = "coverage";

    /// Creates a new annotator for the given project root.
    ///
    /// `requested_paths` are the source files the caller is interested in, relative to the project
    /// root. Coverage for any other file is discarded.
    pub fn new(
        project_root: impl Into<Utf8PathBuf>,
        requested_paths: impl IntoIterator<Item = impl AsRef<Utf8Path>>,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            requested: requested_paths
                .into_iter()
                .map(|path| normalize_source_path(path.as_ref()))
                .collect(),
            program: Self::DEFAULT_PROGRAM.to_owned(),
        }
    }

    /// Sets the coverage executable to run.
    pub fn set_program(&mut self, program: impl Into<String>) -> &mut Self {
        self.program = program.into();
        self
    }

    /// Runs the annotation step and collects its artifacts.
    ///
    /// This never fails: if `coverage annotate` can't be run, the returned map is empty.
    pub fn annotate(&self) -> CoverageMap {
        let swept = self.sweep_stale_artifacts();
        if swept > 0 {
            warn!(
                "removed {swept} stale coverage annotation file(s) under {}",
                self.project_root
            );
        }

        let python_paths = self.python_paths();
        if python_paths.is_empty() {
            debug!("no Python sources requested, skipping coverage annotate");
            return CoverageMap::new();
        }

        if !self.run_annotate(&python_paths) {
            return CoverageMap::new();
        }
        self.collect_artifacts()
    }

    /// Reads, deletes and filters every `,cover` artifact under the project root.
    pub fn collect_artifacts(&self) -> CoverageMap {
        let mut map = CoverageMap::new();

        for (artifact, source) in self.find_artifacts() {
            let contents = match std::fs::read(&artifact) {
                Ok(contents) => contents,
                Err(error) => {
                    warn!("failed to read coverage annotation {artifact}: {error}");
                    continue;
                }
            };
            let coverage = CoverageString::from_annotation(&contents);

            if let Err(error) = std::fs::remove_file(&artifact) {
                warn!("failed to remove coverage annotation {artifact}: {error}");
            }

            if self.requested.contains(&source) {
                debug!("coverage for {source}: {coverage}");
                map.insert(source, coverage);
            } else {
                debug!("discarding coverage for unrequested source {source}");
            }
        }

        map
    }

    // ---
    // Helper methods
    // ---

    fn python_paths(&self) -> Vec<&Utf8Path> {
        self.requested
            .iter()
            .filter(|path| path.extension() == Some("py"))
            .map(|path| path.as_path())
            .collect()
    }

    fn annotate_expression(&self, python_paths: &[&Utf8Path]) -> duct::Expression {
        let include = python_paths.iter().map(|path| path.as_str()).collect::<Vec<_>>();
        duct::cmd(
            self.program.as_str(),
            ["annotate".to_owned(), format!("--include={}", include.join(","))],
        )
        .dir(self.project_root.as_std_path())
    }

    fn run_annotate(&self, python_paths: &[&Utf8Path]) -> bool {
        let expression = self.annotate_expression(python_paths);
        debug!("executing coverage annotation: {expression:?}");

        match expression
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
        {
            Ok(output) if output.status.success() => true,
            Ok(output) => {
                warn!(
                    "`{} annotate` failed with {}, coverage will be empty",
                    self.program, output.status
                );
                debug!("stderr:\n{}", String::from_utf8_lossy(&output.stderr));
                false
            }
            Err(error) => {
                warn!(
                    "failed to execute `{} annotate`, coverage will be empty: {error}",
                    self.program
                );
                false
            }
        }
    }

    /// Removes `,cover` files for requested sources left behind by earlier runs, so they are never
    /// read as coverage for this run. Returns the number of files removed.
    ///
    /// Artifacts for other sources are not this run's to delete.
    fn sweep_stale_artifacts(&self) -> usize {
        let mut removed = 0;
        for source in &self.requested {
            let artifact = self
                .project_root
                .join(format!("{source}{ANNOTATION_SUFFIX}"));
            match std::fs::remove_file(&artifact) {
                Ok(()) => removed += 1,
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => {
                    warn!("failed to remove stale coverage annotation {artifact}: {error}");
                }
            }
        }
        removed
    }

    /// Returns `(artifact path, project-relative source path)` for every artifact.
    fn find_artifacts(&self) -> Vec<(Utf8PathBuf, Utf8PathBuf)> {
        walkdir::WalkDir::new(&self.project_root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| Utf8PathBuf::try_from(entry.into_path()).ok())
            .filter_map(|artifact| {
                let rel_path = artifact.strip_prefix(&self.project_root).ok()?;
                let source = rel_path.as_str().strip_suffix(ANNOTATION_SUFFIX)?;
                if source.is_empty() {
                    return None;
                }
                let source = convert_rel_path_to_forward_slash(Utf8Path::new(source));
                Some((artifact, source))
            })
            .collect()
    }
}

impl CoverageSource for CoverageAnnotator {
    fn coverage_map(&self) -> CoverageMap {
        self.annotate()
    }
}
