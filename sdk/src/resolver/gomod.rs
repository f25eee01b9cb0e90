//! `go.mod` module directive handling

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ResolveError;

/// The project module: its declared path and the directory holding go.mod
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub path: String,
    pub root: PathBuf,
}

impl ModuleInfo {
    /// Read the `module` directive from `<root>/go.mod`
    pub fn load(root: &Path) -> Result<Option<Self>, ResolveError> {
        let manifest = root.join("go.mod");
        if !manifest.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&manifest).map_err(|e| ResolveError::ModuleFile {
            path: manifest.clone(),
            reason: e.to_string(),
        })?;

        Ok(parse_module_directive(&content).map(|path| Self {
            path,
            root: root.to_path_buf(),
        }))
    }

    /// Map an import path inside this module to its directory
    pub fn dir_for(&self, import_path: &str) -> Option<PathBuf> {
        if import_path == self.path {
            return Some(self.root.clone());
        }
        import_path
            .strip_prefix(&self.path)
            .and_then(|rest| rest.strip_prefix('/'))
            .map(|rest| rest.split('/').fold(self.root.clone(), |dir, seg| dir.join(seg)))
    }

    /// Map a directory inside the module back to its import path
    pub fn import_path_for(&self, dir: &Path) -> Option<String> {
        let rel = dir.strip_prefix(&self.root).ok()?;
        let segments: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if segments.is_empty() {
            Some(self.path.clone())
        } else {
            Some(format!("{}/{}", self.path, segments.join("/")))
        }
    }
}

/// Extract the module path from go.mod content
pub fn parse_module_directive(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let line = line.split("//").next().unwrap_or("").trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let path = rest.trim().trim_matches('"');
        (!path.is_empty()).then(|| path.to_string())
    })
}

/// Walk upwards from `start` to the nearest directory holding a go.mod
pub fn find_module_root(start: &Path) -> Option<PathBuf> {
    let start = if start.is_file() { start.parent()? } else { start };
    start
        .ancestors()
        .find(|dir| dir.join("go.mod").is_file())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_module_directive() {
        let content = "// header\nmodule example.com/shop // trailing\n\ngo 1.22\n";
        assert_eq!(parse_module_directive(content).as_deref(), Some("example.com/shop"));
        assert_eq!(parse_module_directive("modules x\n"), None);
        assert_eq!(parse_module_directive("module \"quoted/mod\"\n").as_deref(), Some("quoted/mod"));
    }

    #[test]
    fn test_dir_and_import_path_mapping() {
        let module = ModuleInfo {
            path: "example.com/shop".to_string(),
            root: PathBuf::from("/work/shop"),
        };
        assert_eq!(module.dir_for("example.com/shop/api/v1"), Some(PathBuf::from("/work/shop/api/v1")));
        assert_eq!(module.dir_for("example.com/shopping"), None);
        assert_eq!(
            module.import_path_for(Path::new("/work/shop/internal/db")).as_deref(),
            Some("example.com/shop/internal/db")
        );
    }

    #[test]
    fn test_find_module_root() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("go.mod"), "module m\n").unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_module_root(&nested), Some(dir.path().to_path_buf()));
        let loaded = ModuleInfo::load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.path, "m");
    }
}
