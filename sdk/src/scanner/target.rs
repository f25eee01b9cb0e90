//! Annotated declarations found by the scanner

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::annotation::Annotation;

/// Kind of declaration an annotation is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Struct,
    Interface,
    Var,
    Const,
    /// A free-standing `go:gen:` annotation naming its subject through `source=`
    Comment,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetKind::Struct => "struct",
            TargetKind::Interface => "interface",
            TargetKind::Var => "var",
            TargetKind::Const => "const",
            TargetKind::Comment => "comment",
        };
        f.write_str(name)
    }
}

/// A located declaration carrying one or more annotations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Target {
    pub kind: TargetKind,
    pub name: String,
    pub package_name: String,
    pub file_path: PathBuf,
    /// 1-based line of the declared name
    pub line: usize,
    /// 1-based column of the declared name
    pub column: usize,
    pub annotations: Vec<Annotation>,
    /// Initializer text of a var/const spec
    pub value: Option<String>,
    /// Declared type of a var/const spec
    pub type_text: Option<String>,
}

impl Target {
    /// Annotations carrying one of the given names, in source order
    pub fn annotations_named<'a>(&'a self, names: &'a [&str]) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.annotations
            .iter()
            .filter(move |a| names.contains(&a.name.as_str()))
    }

    /// Directory holding the declaring file
    pub fn dir(&self) -> PathBuf {
        self.file_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default()
    }
}

/// One `@Config(output=..., generator=...)` entry of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputRule {
    /// Generator the rule applies to, `None` for every generator
    pub generator: Option<String>,
    pub output: String,
}

/// Per-file settings declared with `//go:gen:@Config(...)`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileConfig {
    pub rules: Vec<OutputRule>,
}

impl FileConfig {
    /// Output pattern for a generator: a rule naming it wins over a general rule
    pub fn output_for(&self, generator: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.generator.as_deref() == Some(generator))
            .or_else(|| self.rules.iter().find(|r| r.generator.is_none()))
            .map(|r| r.output.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_for_prefers_specific_rule() {
        let config = FileConfig {
            rules: vec![
                OutputRule {
                    generator: None,
                    output: "all_gen.go".to_string(),
                },
                OutputRule {
                    generator: Some("gsql".to_string()),
                    output: "sql_gen.go".to_string(),
                },
            ],
        };
        assert_eq!(config.output_for("gsql"), Some("sql_gen.go"));
        assert_eq!(config.output_for("pick"), Some("all_gen.go"));
        assert_eq!(FileConfig::default().output_for("pick"), None);
    }
}
