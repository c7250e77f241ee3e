// Copyright (c) The unitbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for unitbridge.
//!
//! Configuration is read from `.config/unitbridge.toml` in the project root (or an explicit file),
//! layered on top of the [default config](UnitBridgeConfig::DEFAULT_CONFIG).

use crate::errors::{ConfigParseError, ProjectRootError};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Overall configuration for unitbridge.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnitBridgeConfig {
    project_root: Utf8PathBuf,
    django: DjangoConfig,
}

impl UnitBridgeConfig {
    /// The default location of the config within the project root.
    pub const CONFIG_PATH: &'static str = ".config/unitbridge.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from the given file, or if not specified from `.config/unitbridge.toml` in
    /// the project root.
    ///
    /// If the file isn't specified and the project doesn't have a config file, the default config
    /// is used. Unknown keys are reported as warnings.
    pub fn from_sources(
        project_root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let project_root = project_root.into();

        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = project_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };
        debug!("reading config from {config_file} (layered over defaults)");

        let builder = Self::make_default_config().add_source(source);
        let (deserialized, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|err| ConfigParseError::new(&config_file, err))?;

        if !unknown.is_empty() {
            let keys = unknown.into_iter().collect::<Vec<_>>().join(", ");
            warn!("ignoring unknown config keys in {config_file}: {keys}");
        }

        Ok(Self {
            project_root,
            django: deserialized.django,
        })
    }

    #[cfg(test)]
    pub(crate) fn default_config(project_root: impl Into<Utf8PathBuf>) -> Self {
        let (deserialized, unknown) =
            Self::build_and_deserialize_config(&Self::make_default_config())
                .expect("default config is always valid");

        // The default config is embedded in the binary, so it must not contain unknown keys.
        assert!(
            unknown.is_empty(),
            "found unknown keys in default config: {unknown:?}"
        );

        Self {
            project_root: project_root.into(),
            django: deserialized.django,
        }
    }

    /// The project root this config was read for.
    pub fn project_root(&self) -> &Utf8Path {
        &self.project_root
    }

    /// Configuration for the Django engine.
    pub fn django(&self) -> &DjangoConfig {
        &self.django
    }

    /// Returns a mutable reference to the Django engine configuration, for command-line overrides.
    pub fn django_mut(&mut self) -> &mut DjangoConfig {
        &mut self.django
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(UnitBridgeConfigDeserialize, BTreeSet<String>), config::ConfigError> {
        let config = builder.build_cloned()?;

        let mut unknown = BTreeSet::new();
        let deserialized: UnitBridgeConfigDeserialize =
            serde_ignored::deserialize(config, |path: serde_ignored::Path| {
                unknown.insert(path.to_string());
            })?;

        Ok((deserialized, unknown))
    }
}

/// Configuration for the Django engine, from the `[django]` table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct DjangoConfig {
    /// The directory containing `manage.py`, relative to the project root.
    pub manage_py_dir: Utf8PathBuf,

    /// The path to `manage.py`, relative to `manage_py_dir`.
    pub manage_py_file: String,

    /// Whether to collect coverage.
    pub coverage: bool,

    /// Whitespace-separated app labels to test.
    pub test_apps: String,

    /// Extra arguments for `manage.py test`.
    pub manage_py_args: String,

    /// The Python interpreter used when coverage is disabled.
    pub python_program: String,

    /// The coverage.py executable.
    pub coverage_program: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct UnitBridgeConfigDeserialize {
    django: DjangoConfig,
}

/// Finds the project root for `start_dir`.
///
/// This is the nearest ancestor of `start_dir` (including itself) that contains
/// `.config/unitbridge.toml`. If there is no such directory, `start_dir` is returned.
pub fn discover_project_root(start_dir: &Utf8Path) -> Utf8PathBuf {
    start_dir
        .ancestors()
        .find(|dir| dir.join(UnitBridgeConfig::CONFIG_PATH).is_file())
        .unwrap_or(start_dir)
        .to_owned()
}

/// Returns the current directory, which project root discovery starts from.
pub fn current_dir() -> Result<Utf8PathBuf, ProjectRootError> {
    let cwd = std::env::current_dir().map_err(ProjectRootError::CurrentDir)?;
    Utf8PathBuf::try_from(cwd).map_err(ProjectRootError::NonUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn write_config(root: &Utf8Path, contents: &str) {
        let path = root.join(UnitBridgeConfig::CONFIG_PATH);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn defaults() {
        let dir = Utf8TempDir::new().unwrap();
        let config = UnitBridgeConfig::from_sources(dir.path(), None).unwrap();
        assert_eq!(config, UnitBridgeConfig::default_config(dir.path()));

        let django = config.django();
        assert_eq!(django.manage_py_dir, "");
        assert_eq!(django.manage_py_file, "manage.py");
        assert!(django.coverage);
        assert_eq!(django.test_apps, "");
        assert_eq!(django.manage_py_args, "");
        assert_eq!(django.python_program, "python");
        assert_eq!(django.coverage_program, "coverage");
    }

    #[test]
    fn overrides_from_project_config() {
        let dir = Utf8TempDir::new().unwrap();
        write_config(
            dir.path(),
            indoc! {r#"
                [django]
                manage-py-dir = "backend"
                coverage = false
                test-apps = "accounts billing"
                some-unknown-key = 1
            "#},
        );

        let config = UnitBridgeConfig::from_sources(dir.path(), None).unwrap();
        let django = config.django();
        assert_eq!(django.manage_py_dir, "backend");
        assert!(!django.coverage);
        assert_eq!(django.test_apps, "accounts billing");
        // Unset keys keep their defaults.
        assert_eq!(django.manage_py_file, "manage.py");
    }

    #[test]
    fn explicit_config_file() {
        let dir = Utf8TempDir::new().unwrap();
        let file = dir.path().join("custom.toml");
        std::fs::write(&file, "[django]\nmanage-py-args = \"--parallel 4\"\n").unwrap();

        let config = UnitBridgeConfig::from_sources(dir.path(), Some(&file)).unwrap();
        assert_eq!(config.django().manage_py_args, "--parallel 4");
        assert_eq!(config.project_root(), dir.path());
    }

    #[test]
    fn missing_explicit_config_file_is_an_error() {
        let dir = Utf8TempDir::new().unwrap();
        let file = dir.path().join("missing.toml");
        let error = UnitBridgeConfig::from_sources(dir.path(), Some(&file)).unwrap_err();
        assert_eq!(error.config_file(), &file);
    }

    #[test_case("[django]\ncoverage = \"maybe\"\n" ; "wrong type")]
    #[test_case("[django\n" ; "invalid toml")]
    fn invalid_config(contents: &str) {
        let dir = Utf8TempDir::new().unwrap();
        write_config(dir.path(), contents);
        let error = UnitBridgeConfig::from_sources(dir.path(), None).unwrap_err();
        assert_eq!(
            error.config_file(),
            &dir.path().join(UnitBridgeConfig::CONFIG_PATH)
        );
    }

    #[test]
    fn project_root_discovery() {
        let dir = Utf8TempDir::new().unwrap();
        let root = dir.path().join("project");
        let nested = root.join("backend/accounts");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(discover_project_root(&nested), nested, "no config anywhere");

        write_config(&root, "");
        assert_eq!(discover_project_root(&nested), root);
        assert_eq!(discover_project_root(&root), root);
    }
}
