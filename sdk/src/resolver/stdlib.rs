//! Standard library package discovery

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::syntax::{is_go_file, is_test_file};

/// Directory names never holding importable standard library packages
const SKIPPED_DIRS: &[&str] = &["vendor", "testdata", "internal"];

/// Paths whose first segment contains a dot are never standard library
pub fn may_be_std(import_path: &str) -> bool {
    let first = import_path.split('/').next().unwrap_or("");
    !first.is_empty() && !first.contains('.')
}

/// Walk `<goroot>/src` and record every directory holding a non-test Go file
pub fn scan_std_packages(src_root: &Path) -> HashSet<String> {
    let mut packages = HashSet::new();

    let walker = WalkDir::new(src_root).into_iter().filter_entry(|entry| {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        !(name.starts_with('.') || name.starts_with('_') || SKIPPED_DIRS.contains(&name.as_ref()))
    });

    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_file() || !is_go_file(entry.path()) {
            continue;
        }
        if is_test_file(&entry.file_name().to_string_lossy()) {
            continue;
        }
        let Some(dir) = entry.path().parent() else {
            continue;
        };
        let Ok(rel) = dir.strip_prefix(src_root) else {
            continue;
        };
        let import_path = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        if !import_path.is_empty() {
            packages.insert(import_path);
        }
    }

    debug!("Indexed {} standard library packages under {}", packages.len(), src_root.display());
    packages
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_may_be_std() {
        assert!(may_be_std("fmt"));
        assert!(may_be_std("net/http"));
        assert!(!may_be_std("github.com/x/y"));
        assert!(!may_be_std("gopkg.in/yaml.v3"));
        assert!(!may_be_std(""));
    }

    #[test]
    fn test_scan_skips_internal_vendor_testdata_and_tests_only() {
        let dir = TempDir::new().unwrap();
        let src = dir.path();
        for (path, body) in [
            ("fmt/print.go", "package fmt\n"),
            ("net/http/server.go", "package http\n"),
            ("internal/abi/abi.go", "package abi\n"),
            ("vendor/golang.org/x/net/n.go", "package net\n"),
            ("io/testdata/t.go", "package t\n"),
            ("onlytests/a_test.go", "package onlytests\n"),
        ] {
            let file = src.join(path);
            fs::create_dir_all(file.parent().unwrap()).unwrap();
            fs::write(file, body).unwrap();
        }

        let packages = scan_std_packages(src);
        assert!(packages.contains("fmt"));
        assert!(packages.contains("net/http"));
        assert!(!packages.contains("net"));
        assert!(!packages.contains("internal/abi"));
        assert!(!packages.iter().any(|p| p.starts_with("vendor")));
        assert!(!packages.contains("io/testdata"));
        assert!(!packages.contains("onlytests"));
    }
}
