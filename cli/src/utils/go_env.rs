//! Locating the Go toolchain and module cache

use anyhow::{anyhow, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use super::config::GogenConfig;

/// Where the standard library and downloaded modules live
#[derive(Debug, Clone, PartialEq)]
pub struct GoEnv {
    pub goroot: PathBuf,
    pub gomodcache: Option<PathBuf>,
}

impl GoEnv {
    /// Resolve locations from config (with env overrides already applied),
    /// then `GOPATH`, then the `go` binary on `PATH`
    pub fn detect(config: &GogenConfig) -> Result<Self> {
        let goroot = match &config.goroot {
            Some(goroot) => goroot.clone(),
            None => goroot_from_toolchain().ok_or_else(|| {
                anyhow!("Cannot find GOROOT: set it in gogen.yaml, export GOROOT or put `go` on PATH")
            })?,
        };
        let gomodcache = config.gomodcache.clone().or_else(|| {
            modcache_from(env::var_os("GOPATH").as_deref(), dirs::home_dir().as_deref())
        });

        debug!("GOROOT={} GOMODCACHE={:?}", goroot.display(), gomodcache);
        Ok(Self { goroot, gomodcache })
    }
}

fn goroot_from_toolchain() -> Option<PathBuf> {
    let go = which::which("go").ok()?;

    if let Ok(output) = Command::new(&go).args(["env", "GOROOT"]).output() {
        if output.status.success() {
            let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !root.is_empty() {
                return Some(PathBuf::from(root));
            }
        }
    }

    // <goroot>/bin/go
    let binary = go.canonicalize().unwrap_or(go);
    let root = binary.parent()?.parent()?;
    root.join("src").is_dir().then(|| root.to_path_buf())
}

/// Module cache under the first `GOPATH` entry, else `~/go/pkg/mod` when it exists
pub fn modcache_from(gopath: Option<&std::ffi::OsStr>, home: Option<&Path>) -> Option<PathBuf> {
    if let Some(first) = gopath.and_then(|p| env::split_paths(p).find(|p| !p.as_os_str().is_empty())) {
        return Some(first.join("pkg").join("mod"));
    }

    let fallback = home?.join("go").join("pkg").join("mod");
    fallback.is_dir().then_some(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use tempfile::TempDir;

    #[test]
    fn test_configured_locations_win() {
        let config = GogenConfig {
            goroot: Some(PathBuf::from("/opt/go")),
            gomodcache: Some(PathBuf::from("/cache")),
            ..Default::default()
        };
        let go = GoEnv::detect(&config).unwrap();
        assert_eq!(go.goroot, PathBuf::from("/opt/go"));
        assert_eq!(go.gomodcache, Some(PathBuf::from("/cache")));
    }

    #[test]
    fn test_modcache_from_gopath() {
        let gopath = env::join_paths(["/work/gopath", "/other"]).unwrap();
        assert_eq!(
            modcache_from(Some(gopath.as_os_str()), None),
            Some(PathBuf::from("/work/gopath/pkg/mod"))
        );
    }

    #[test]
    fn test_modcache_home_fallback() {
        let home = TempDir::new().unwrap();
        assert_eq!(modcache_from(None, Some(home.path())), None);

        std::fs::create_dir_all(home.path().join("go/pkg/mod")).unwrap();
        assert_eq!(
            modcache_from(Some(OsString::new().as_os_str()), Some(home.path())),
            Some(home.path().join("go/pkg/mod"))
        );
    }
}
