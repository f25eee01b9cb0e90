//! Finding the file that declares a type inside a package directory

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use crate::error::SyntaxError;
use crate::syntax::{is_go_file, is_test_file, GoSource};

/// Non-test Go files of a directory, sorted by name
pub fn package_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && is_go_file(path)
                && !path
                    .file_name()
                    .is_some_and(|name| is_test_file(&name.to_string_lossy()))
        })
        .collect();
    files.sort();
    files
}

/// Word-boundary pattern for a declared name
pub(crate) fn word_pattern(name: &str) -> Option<Regex> {
    Regex::new(&format!(r"\b{}\b", regex::escape(name))).ok()
}

/// Parse the first file of `dir` declaring type `name`.
///
/// Files are checked with a text search before being parsed; unreadable
/// files are skipped.
pub fn locate_type(dir: &Path, name: &str) -> Result<Option<GoSource>, SyntaxError> {
    let Some(pattern) = word_pattern(name) else {
        return Ok(None);
    };

    for file in package_files(dir) {
        let Ok(text) = fs::read_to_string(&file) else {
            debug!("Skipping unreadable file {}", file.display());
            continue;
        };
        if !text.contains("type") || !pattern.is_match(&text) {
            continue;
        }
        let source = GoSource::parse(&file, text)?;
        if source.find_type_spec(name).is_some() {
            return Ok(Some(source));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_locate_skips_tests_and_non_matching_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.go"), "package m\n\ntype Other struct{}\n").unwrap();
        fs::write(dir.path().join("b.go"), "package m\n\ntype (\n\tUser struct{ ID int }\n)\n").unwrap();
        fs::write(dir.path().join("c_test.go"), "package m\n\ntype Fixture struct{}\n").unwrap();

        let found = locate_type(dir.path(), "User").unwrap().unwrap();
        assert!(found.path.ends_with("b.go"));
        assert!(locate_type(dir.path(), "Fixture").unwrap().is_none());
        assert!(locate_type(dir.path(), "Us").unwrap().is_none());
        assert_eq!(package_files(dir.path()).len(), 2);
    }
}
