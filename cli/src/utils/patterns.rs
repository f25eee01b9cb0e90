use std::path::{Path, PathBuf};

/// A command line path argument; a trailing `/...` asks for recursion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    pub root: PathBuf,
    pub recursive: bool,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed == "..." {
            return Self {
                root: PathBuf::from("."),
                recursive: true,
            };
        }
        match trimmed.strip_suffix("/...") {
            Some(root) => Self {
                root: PathBuf::from(if root.is_empty() { "/" } else { root }),
                recursive: true,
            },
            None => Self {
                root: PathBuf::from(if trimmed.is_empty() { "." } else { trimmed }),
                recursive: false,
            },
        }
    }

    /// Same pattern rooted at an absolute path, resolved against `cwd`
    pub fn absolute(self, cwd: &Path) -> Self {
        let joined = cwd.join(&self.root);
        Self {
            root: joined.canonicalize().unwrap_or(joined),
            ..self
        }
    }
}

/// Parse all arguments; no arguments means the current directory
pub fn parse_patterns(raw: &[String]) -> Vec<PathPattern> {
    if raw.is_empty() {
        return vec![PathPattern::parse(".")];
    }
    raw.iter().map(|r| PathPattern::parse(r)).collect()
}
