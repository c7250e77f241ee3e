// Copyright (c) The unitbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};

/// On Windows, convert relative paths to use forward slashes.
#[cfg(windows)]
pub(crate) fn convert_rel_path_to_forward_slash(rel_path: &Utf8Path) -> Utf8PathBuf {
    if !rel_path.is_relative() {
        panic!("path for conversion to forward slash '{rel_path}' is not relative");
    }
    rel_path.as_str().replace('\\', "/").into()
}

#[cfg(not(windows))]
pub(crate) fn convert_rel_path_to_forward_slash(rel_path: &Utf8Path) -> Utf8PathBuf {
    rel_path.to_path_buf()
}

/// Normalizes a caller-provided source path so it can be compared against paths recovered from
/// the file system: forward slashes, no leading `./`.
pub(crate) fn normalize_source_path(path: &Utf8Path) -> Utf8PathBuf {
    let path = if path.is_relative() {
        convert_rel_path_to_forward_slash(path)
    } else {
        path.to_path_buf()
    };
    let mut s = path.as_str();
    while let Some(rest) = s.strip_prefix("./") {
        s = rest;
    }
    s.into()
}

/// Returns the plural form of "test" for the given count.
pub(crate) fn plural_tests(count: usize) -> &'static str {
    if count == 1 { "test" } else { "tests" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize() {
        assert_eq!(
            normalize_source_path(Utf8Path::new("./app/models.py")),
            "app/models.py"
        );
        assert_eq!(
            normalize_source_path(Utf8Path::new("app/models.py")),
            "app/models.py"
        );
    }
}
