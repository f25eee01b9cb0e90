//! Import path resolution: standard library, project module and module cache
//!
//! A [`PackageResolver`] is built once per generation run and handed to every
//! parsing call. It caches package names by import path and by directory for
//! its own lifetime; nothing is shared between runs.

pub mod gomod;
pub mod modcache;
pub mod stdlib;

pub use gomod::{ModuleInfo, find_module_root};

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::error::ResolveError;
use crate::syntax::{is_go_file, is_test_file};

/// Narrow capability used by the declaration parser and generators
pub trait PackageResolve: Send + Sync {
    /// Declared package name for an import path; never fails, falls back to a guess
    fn package_name(&self, import_path: &str) -> String;

    /// Directory holding the sources of an import path
    fn package_dir(&self, import_path: &str) -> Option<PathBuf>;

    /// Import path of a source directory, if it can be determined
    fn import_path_of(&self, dir: &Path) -> Option<String>;
}

/// Locations the resolver searches
#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    /// Go distribution root (the directory containing `src/`)
    pub goroot: PathBuf,
    /// Module cache, usually `$GOPATH/pkg/mod`
    pub modcache: Option<PathBuf>,
    /// Directory containing the project's go.mod
    pub module_root: Option<PathBuf>,
}

/// Resolves import paths to directories and declared package names
pub struct PackageResolver {
    goroot_src: PathBuf,
    modcache: Option<PathBuf>,
    module: Option<ModuleInfo>,
    std_packages: OnceLock<HashSet<String>>,
    names_by_import: DashMap<String, String>,
    names_by_dir: DashMap<PathBuf, String>,
}

impl PackageResolver {
    /// Create a resolver; fails when the standard library root does not exist
    pub fn new(config: ResolverConfig) -> Result<Self, ResolveError> {
        let goroot_src = config.goroot.join("src");
        if !goroot_src.is_dir() {
            return Err(ResolveError::GoRootNotFound { path: goroot_src });
        }

        let module = match &config.module_root {
            Some(root) => ModuleInfo::load(root)?,
            None => None,
        };
        if let Some(module) = &module {
            debug!("Project module {} at {}", module.path, module.root.display());
        }

        Ok(Self {
            goroot_src,
            modcache: config.modcache,
            module,
            std_packages: OnceLock::new(),
            names_by_import: DashMap::new(),
            names_by_dir: DashMap::new(),
        })
    }

    /// Whether an import path names a standard library package
    pub fn is_std_lib(&self, import_path: &str) -> bool {
        if !stdlib::may_be_std(import_path) {
            return false;
        }
        self.std_packages
            .get_or_init(|| stdlib::scan_std_packages(&self.goroot_src))
            .contains(import_path)
    }

    fn resolve_dir(&self, import_path: &str) -> Option<PathBuf> {
        if self.is_std_lib(import_path) {
            return Some(self.goroot_src.join(import_path));
        }

        if let Some(dir) = self.module.as_ref().and_then(|m| m.dir_for(import_path)) {
            return dir.is_dir().then_some(dir);
        }

        let cache = self.modcache.as_ref()?;
        modcache::find_in_module_cache(cache, import_path)
    }

    fn remember(&self, import_path: &str, dir: &Path, name: &str) {
        self.names_by_import.insert(import_path.to_string(), name.to_string());
        self.names_by_dir.insert(dir.to_path_buf(), name.to_string());
    }

    /// Declared package name of a directory, cached by directory
    pub fn package_name_in_dir(&self, dir: &Path) -> Option<String> {
        if let Some(name) = self.names_by_dir.get(dir) {
            return Some(name.value().clone());
        }
        let name = read_package_name(dir)?;
        self.names_by_dir.insert(dir.to_path_buf(), name.clone());
        Some(name)
    }
}

impl PackageResolve for PackageResolver {
    fn package_name(&self, import_path: &str) -> String {
        if let Some(name) = self.names_by_import.get(import_path) {
            return name.value().clone();
        }

        if let Some(dir) = self.resolve_dir(import_path) {
            if let Some(name) = self.package_name_in_dir(&dir) {
                self.remember(import_path, &dir, &name);
                return name;
            }
        }

        let guess = fallback_package_name(import_path);
        warn!("Could not resolve package name of '{}', guessing '{}'", import_path, guess);
        guess
    }

    fn package_dir(&self, import_path: &str) -> Option<PathBuf> {
        self.resolve_dir(import_path)
    }

    fn import_path_of(&self, dir: &Path) -> Option<String> {
        if let Some(path) = self.module.as_ref().and_then(|m| m.import_path_for(dir)) {
            return Some(path);
        }
        if let Ok(rel) = dir.strip_prefix(&self.goroot_src) {
            return Some(join_components(rel));
        }
        let rel = dir.strip_prefix(self.modcache.as_ref()?).ok()?;
        Some(unescape_cache_path(&join_components(rel)))
    }
}

fn join_components(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Turn a module cache relative path back into an import path
fn unescape_cache_path(rel: &str) -> String {
    let mut out = Vec::new();
    for segment in rel.split('/') {
        let segment = segment.split('@').next().unwrap_or(segment);
        let mut unescaped = String::with_capacity(segment.len());
        let mut chars = segment.chars();
        while let Some(ch) = chars.next() {
            match ch {
                '!' => {
                    if let Some(next) = chars.next() {
                        unescaped.push(next.to_ascii_uppercase());
                    }
                }
                other => unescaped.push(other),
            }
        }
        out.push(unescaped);
    }
    out.join("/")
}

/// Best-effort package name from an import path: its last segment, skipping
/// a trailing major version suffix such as `/v2`
pub fn fallback_package_name(import_path: &str) -> String {
    let mut segments = import_path.rsplit('/').filter(|s| !s.is_empty());
    let last = segments.next().unwrap_or(import_path);
    let is_major_version = last.len() > 1
        && last.starts_with('v')
        && last[1..].chars().all(|c| c.is_ascii_digit());
    if is_major_version {
        if let Some(previous) = segments.next() {
            return previous.to_string();
        }
    }
    last.to_string()
}

/// Read the package clause of the first non-test Go file in a directory
pub fn read_package_name(dir: &Path) -> Option<String> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && is_go_file(path)
                && !path
                    .file_name()
                    .is_some_and(|n| is_test_file(&n.to_string_lossy()))
        })
        .collect();
    files.sort();

    files
        .iter()
        .filter_map(|file| fs::read_to_string(file).ok())
        .find_map(|content| package_clause(&content))
}

/// Extract the identifier of the `package` clause, skipping leading comments
pub fn package_clause(content: &str) -> Option<String> {
    let mut in_block = false;
    for line in content.lines() {
        let mut line = line.trim();
        if in_block {
            match line.find("*/") {
                Some(end) => {
                    in_block = false;
                    line = line[end + 2..].trim();
                }
                None => continue,
            }
        }
        if let Some(start) = line.strip_prefix("/*") {
            match start.find("*/") {
                Some(end) => line = start[end + 2..].trim(),
                None => {
                    in_block = true;
                    continue;
                }
            }
        }
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        let name = line.strip_prefix("package")?;
        if !name.starts_with(char::is_whitespace) {
            return None;
        }
        let name = name.split("//").next().unwrap_or("").trim().trim_end_matches(';');
        return (!name.is_empty()).then(|| name.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: PathBuf, body: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    struct Fixture {
        _dir: TempDir,
        goroot: PathBuf,
        modcache: PathBuf,
        project: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let goroot = dir.path().join("goroot");
        let modcache = dir.path().join("gopath/pkg/mod");
        let project = dir.path().join("project");

        write(goroot.join("src/fmt/print.go"), "// Copyright\n\npackage fmt\n");
        write(goroot.join("src/net/http/server.go"), "package http\n");
        write(modcache.join("github.com/!acme/gg@v1.0.0/gg.go"), "/* generated\n */\npackage g2\n");
        write(project.join("go.mod"), "module example.com/shop\n\ngo 1.22\n");
        write(project.join("internal/store/store.go"), "package storage\n");
        write(project.join("internal/store/store_test.go"), "package storage_test\n");

        Fixture {
            _dir: dir,
            goroot,
            modcache,
            project,
        }
    }

    fn resolver(fx: &Fixture) -> PackageResolver {
        PackageResolver::new(ResolverConfig {
            goroot: fx.goroot.clone(),
            modcache: Some(fx.modcache.clone()),
            module_root: Some(fx.project.clone()),
        })
        .unwrap()
    }

    #[test]
    fn test_missing_goroot_is_fatal() {
        let dir = TempDir::new().unwrap();
        let result = PackageResolver::new(ResolverConfig {
            goroot: dir.path().join("nope"),
            ..Default::default()
        });
        assert!(matches!(result, Err(ResolveError::GoRootNotFound { .. })));
    }

    #[test]
    fn test_three_tier_resolution() {
        let fx = fixture();
        let r = resolver(&fx);

        assert!(r.is_std_lib("fmt"));
        assert!(r.is_std_lib("net/http"));
        assert!(!r.is_std_lib("example.com/shop/internal/store"));

        assert_eq!(r.package_name("net/http"), "http");
        assert_eq!(r.package_name("example.com/shop/internal/store"), "storage");
        assert_eq!(r.package_name("github.com/Acme/gg"), "g2");
    }

    #[test]
    fn test_unresolvable_falls_back_to_last_segment() {
        let fx = fixture();
        let r = resolver(&fx);
        assert_eq!(r.package_name("example.org/missing/thing"), "thing");
        assert_eq!(r.package_name("example.org/missing/api/v3"), "api");
    }

    #[test]
    fn test_cache_hit_does_not_touch_filesystem() {
        let fx = fixture();
        let r = resolver(&fx);

        let first = r.package_name("github.com/Acme/gg");
        fs::remove_dir_all(fx.modcache.join("github.com")).unwrap();
        let second = r.package_name("github.com/Acme/gg");

        assert_eq!(first, "g2");
        assert_eq!(second, first);
    }

    #[test]
    fn test_import_path_of_dirs() {
        let fx = fixture();
        let r = resolver(&fx);
        assert_eq!(
            r.import_path_of(&fx.project.join("internal/store")).as_deref(),
            Some("example.com/shop/internal/store")
        );
        assert_eq!(r.import_path_of(&fx.goroot.join("src/net/http")).as_deref(), Some("net/http"));
        assert_eq!(
            r.import_path_of(&fx.modcache.join("github.com/!acme/gg@v1.0.0")).as_deref(),
            Some("github.com/Acme/gg")
        );
    }

    #[test]
    fn test_package_clause_variants() {
        assert_eq!(package_clause("package main\n").as_deref(), Some("main"));
        assert_eq!(package_clause("// +build x\n\npackage foo // doc\n").as_deref(), Some("foo"));
        assert_eq!(package_clause("/* a */ package bar\n").as_deref(), Some("bar"));
        assert_eq!(package_clause("func main() {}\n"), None);
    }

    #[test]
    fn test_shared_across_threads() {
        let fx = fixture();
        let r = std::sync::Arc::new(resolver(&fx));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let r = r.clone();
                std::thread::spawn(move || r.package_name("example.com/shop/internal/store"))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "storage");
        }
    }
}
