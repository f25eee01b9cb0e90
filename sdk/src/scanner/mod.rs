//! Source tree scanning for annotated declarations
//!
//! The scanner walks a directory, skips files that cannot contain a
//! registered annotation, parses the rest and reports every declaration
//! carrying at least one registered annotation as a [`Target`].

pub mod comments;
pub mod target;

pub use comments::CommentIndex;
pub use target::{FileConfig, OutputRule, Target, TargetKind};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::Serialize;
use tracing::{debug, warn};
use tree_sitter::Node;
use walkdir::WalkDir;

use crate::annotation::{parse_annotations, Annotation};
use crate::error::{SyntaxError, TargetError};
use crate::syntax::source::{is_grouped, type_specs};
use crate::syntax::{field_children, is_go_file, is_test_file, named_children, GoSource};

/// Marker of free-standing annotation comments
pub const FREE_COMMENT_MARKER: &str = "go:gen:";

/// Annotation configuring the outputs of one file
pub const CONFIG_ANNOTATION: &str = "Config";

const SKIPPED_DIRS: &[&str] = &["vendor", "testdata"];

/// How a scan walks the tree
#[derive(Debug, Clone, Default, Builder)]
#[builder(default)]
pub struct ScanOptions {
    /// Descend into subdirectories
    pub recursive: bool,
    /// Also scan `_test.go` files
    pub include_tests: bool,
}

/// Annotated targets and settings of one file
#[derive(Debug, Clone, Serialize)]
pub struct FileScan {
    pub path: PathBuf,
    pub package_name: String,
    pub targets: Vec<Target>,
    pub config: FileConfig,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    pub files: Vec<FileScan>,
    pub errors: Vec<TargetError>,
    /// Files that passed the text pre-filter and were parsed
    pub files_parsed: usize,
}

impl ScanResult {
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.files.iter().flat_map(|f| f.targets.iter())
    }

    pub fn target_count(&self) -> usize {
        self.files.iter().map(|f| f.targets.len()).sum()
    }

    pub fn extend(&mut self, other: ScanResult) {
        self.files.extend(other.files);
        self.errors.extend(other.errors);
        self.files_parsed += other.files_parsed;
    }
}

/// Finds declarations carrying registered annotations
pub struct Scanner {
    names: BTreeSet<String>,
    tokens: Vec<String>,
    options: ScanOptions,
}

impl Scanner {
    pub fn new<I, S>(annotation_names: I, options: ScanOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: BTreeSet<String> = annotation_names.into_iter().map(Into::into).collect();
        let mut tokens: Vec<String> = names.iter().map(|n| format!("@{n}(")).collect();
        tokens.push(FREE_COMMENT_MARKER.to_string());
        Self { names, tokens, options }
    }

    /// Cheap substring test deciding whether a file is worth parsing
    pub fn may_contain_targets(&self, text: &str) -> bool {
        self.tokens.iter().any(|token| text.contains(token.as_str()))
    }

    /// Scan a directory (or a single file)
    pub fn scan(&self, root: &Path) -> ScanResult {
        let mut result = ScanResult::default();
        for file in self.candidate_files(root) {
            self.scan_into(&file, &mut result);
        }
        debug!(
            "Scanned {}: {} files parsed, {} targets, {} errors",
            root.display(),
            result.files_parsed,
            result.target_count(),
            result.errors.len()
        );
        result
    }

    /// Scan one file, appending its targets or errors to `result`
    pub fn scan_into(&self, file: &Path, result: &mut ScanResult) {
        let text = match fs::read_to_string(file) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to read {}: {}", file.display(), e);
                result.errors.push(scan_error(file, 0, e.to_string()));
                return;
            }
        };
        if !self.may_contain_targets(&text) || is_generated(&text) {
            return;
        }

        result.files_parsed += 1;
        match self.scan_source(file, text) {
            Ok(Some(scan)) => result.files.push(scan),
            Ok(None) => {}
            Err(e) => {
                let line = match &e {
                    SyntaxError::Invalid { line, .. } => *line,
                    _ => 0,
                };
                warn!("Skipping {}: {}", file.display(), e);
                result.errors.push(scan_error(file, line, e.to_string()));
            }
        }
    }

    /// Extract targets from source text; `None` when nothing is annotated
    pub fn scan_source(&self, file: &Path, text: String) -> Result<Option<FileScan>, SyntaxError> {
        let source = GoSource::parse_strict(file, text)?;
        let package_name = source.package_name().unwrap_or_default();
        let mut comments = CommentIndex::new(source.comments());
        let mut file_scan = FileScan {
            path: file.to_path_buf(),
            package_name,
            targets: Vec::new(),
            config: FileConfig::default(),
        };

        for decl in named_children(source.root()) {
            match decl.kind() {
                "type_declaration" => self.scan_type_decl(&source, decl, &mut comments, &mut file_scan),
                "var_declaration" => self.scan_value_decl(&source, decl, TargetKind::Var, &mut comments, &mut file_scan),
                "const_declaration" => {
                    self.scan_value_decl(&source, decl, TargetKind::Const, &mut comments, &mut file_scan)
                }
                "function_declaration" | "method_declaration" => {
                    comments.discard_doc(decl.start_position().row, FREE_COMMENT_MARKER)
                }
                _ => {}
            }
        }

        for decl in named_children(source.root()) {
            if decl.kind() == "comment" && !comments.is_claimed(decl.start_byte()) {
                self.scan_free_comment(&source, decl, &mut file_scan);
            }
        }

        if file_scan.targets.is_empty() && file_scan.config.is_empty() {
            return Ok(None);
        }
        Ok(Some(file_scan))
    }

    fn candidate_files(&self, root: &Path) -> Vec<PathBuf> {
        if root.is_file() {
            return vec![root.to_path_buf()];
        }

        let mut walker = WalkDir::new(root);
        if !self.options.recursive {
            walker = walker.max_depth(1);
        }
        let mut files: Vec<PathBuf> = walker
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                !(name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref()))
            })
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && is_go_file(entry.path()))
            .filter(|entry| self.options.include_tests || !is_test_file(&entry.file_name().to_string_lossy()))
            .map(|entry| entry.into_path())
            .collect();
        files.sort();
        files
    }

    fn recognized(&self, comments: &[String]) -> Vec<Annotation> {
        comments
            .iter()
            .flat_map(|c| parse_annotations(c))
            .filter(|a| self.names.contains(&a.name))
            .collect()
    }

    fn scan_type_decl(&self, source: &GoSource, decl: Node<'_>, comments: &mut CommentIndex, out: &mut FileScan) {
        let grouped = is_grouped(decl);
        let group_doc = if grouped {
            comments.discard_doc(decl.start_position().row, FREE_COMMENT_MARKER);
            Vec::new()
        } else {
            comments.doc_for(decl.start_position().row)
        };

        for spec in type_specs(decl) {
            let mut own = if grouped {
                comments.doc_for(spec.start_position().row)
            } else {
                group_doc.clone()
            };
            own.extend(comments.trailing_for(spec));

            let kind = match spec.child_by_field_name("type").map(|t| t.kind()) {
                Some("struct_type") => TargetKind::Struct,
                Some("interface_type") => TargetKind::Interface,
                _ => continue,
            };
            let Some(name) = spec.child_by_field_name("name") else {
                continue;
            };
            let annotations = self.recognized(&own);
            if annotations.is_empty() {
                continue;
            }
            out.targets.push(Target {
                kind,
                name: source.node_text(name).to_string(),
                package_name: out.package_name.clone(),
                file_path: out.path.clone(),
                line: name.start_position().row + 1,
                column: name.start_position().column + 1,
                annotations,
                value: None,
                type_text: None,
            });
        }
    }

    fn scan_value_decl(
        &self,
        source: &GoSource,
        decl: Node<'_>,
        kind: TargetKind,
        comments: &mut CommentIndex,
        out: &mut FileScan,
    ) {
        let grouped = is_grouped(decl);
        let group_doc = if grouped {
            comments.discard_doc(decl.start_position().row, FREE_COMMENT_MARKER);
            Vec::new()
        } else {
            comments.doc_for(decl.start_position().row)
        };

        for spec in value_specs(decl) {
            let mut own = if grouped {
                comments.doc_for(spec.start_position().row)
            } else {
                group_doc.clone()
            };
            own.extend(comments.trailing_for(spec));

            let annotations = self.recognized(&own);
            if annotations.is_empty() {
                continue;
            }

            let type_text = spec
                .child_by_field_name("type")
                .map(|t| source.node_text(t).to_string());
            let values: Vec<String> = spec
                .child_by_field_name("value")
                .map(|list| {
                    named_children(list)
                        .into_iter()
                        .map(|v| source.node_text(v).to_string())
                        .collect()
                })
                .unwrap_or_default();

            for (idx, name) in field_children(spec, "name").into_iter().enumerate() {
                out.targets.push(Target {
                    kind,
                    name: source.node_text(name).to_string(),
                    package_name: out.package_name.clone(),
                    file_path: out.path.clone(),
                    line: name.start_position().row + 1,
                    column: name.start_position().column + 1,
                    annotations: annotations.clone(),
                    value: values.get(idx).cloned(),
                    type_text: type_text.clone(),
                });
            }
        }
    }

    fn scan_free_comment(&self, source: &GoSource, comment: Node<'_>, out: &mut FileScan) {
        let text = source.node_text(comment);
        if !text.contains(FREE_COMMENT_MARKER) {
            return;
        }

        for annotation in parse_annotations(text) {
            if annotation.name == CONFIG_ANNOTATION {
                match annotation.get("output") {
                    Some(output) => out.config.rules.push(OutputRule {
                        generator: annotation.get("generator").map(str::to_string),
                        output: output.to_string(),
                    }),
                    None => warn!("@Config without output in {}", out.path.display()),
                }
                continue;
            }
            if !self.names.contains(&annotation.name) {
                continue;
            }
            let name = annotation.get("source").unwrap_or_default().to_string();
            out.targets.push(Target {
                kind: TargetKind::Comment,
                name,
                package_name: out.package_name.clone(),
                file_path: out.path.clone(),
                line: comment.start_position().row + 1,
                column: comment.start_position().column + 1,
                annotations: vec![annotation],
                value: None,
                type_text: None,
            });
        }
    }
}

/// The `var_spec`/`const_spec` nodes of a declaration, flattening `var_spec_list`
fn value_specs(decl: Node<'_>) -> Vec<Node<'_>> {
    let mut specs = Vec::new();
    for child in named_children(decl) {
        match child.kind() {
            "var_spec" | "const_spec" => specs.push(child),
            "var_spec_list" => specs.extend(
                named_children(child)
                    .into_iter()
                    .filter(|n| n.kind() == "var_spec"),
            ),
            _ => {}
        }
    }
    specs
}

/// Go's marker for machine generated files
fn is_generated(text: &str) -> bool {
    text.lines()
        .take_while(|line| !line.trim_start().starts_with("package"))
        .any(|line| line.starts_with("// Code generated") && line.trim_end().ends_with("DO NOT EDIT."))
}

fn scan_error(file: &Path, line: usize, message: String) -> TargetError {
    TargetError {
        generator: "scanner".to_string(),
        file: file.to_path_buf(),
        target: file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        line,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scanner() -> Scanner {
        Scanner::new(["Code", "Pick", "Gsql", "Mock"], ScanOptions::default())
    }

    fn scan_text(text: &str) -> FileScan {
        scanner()
            .scan_source(Path::new("x.go"), text.to_string())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_group_header_is_not_inherited() {
        let file = scan_text(
            "package errs\n\n// @Code(code=1)\nconst (\n\t// @Code(code=100, msg=\"bad\")\n\tErrBad = 100\n\tErrPlain = 101\n\tErrTail = 102 // @Code(code=102)\n)\n",
        );
        let names: Vec<&str> = file.targets.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["ErrBad", "ErrTail"]);
        assert_eq!(file.targets[0].annotations[0].get("msg"), Some("bad"));
        assert_eq!(file.targets[0].value.as_deref(), Some("100"));
        assert_eq!(file.targets[0].kind, TargetKind::Const);
        assert_eq!(file.targets[1].line, 8);
    }

    #[test]
    fn test_ungrouped_uses_declaration_doc() {
        let file = scan_text(
            "package m\n\n// User is a user.\n// @Pick(name=A)\n// @Pick(name=B)\ntype User struct{ ID int }\n\n// @Code(code=7)\nvar ErrX int32 = 7\n",
        );
        assert_eq!(file.targets.len(), 2);
        let user = &file.targets[0];
        assert_eq!(user.kind, TargetKind::Struct);
        assert_eq!(user.annotations.len(), 2);
        assert_eq!((user.line, user.column), (6, 6));

        let var = &file.targets[1];
        assert_eq!(var.kind, TargetKind::Var);
        assert_eq!(var.type_text.as_deref(), Some("int32"));
    }

    #[test]
    fn test_grouped_types_use_their_own_comments() {
        let file = scan_text(
            "package m\n\n// @Gsql()\ntype (\n\t// @Mock()\n\tRepo interface{ Get() }\n\tRow struct{}\n)\n",
        );
        assert_eq!(file.targets.len(), 1);
        assert_eq!(file.targets[0].name, "Repo");
        assert_eq!(file.targets[0].kind, TargetKind::Interface);
    }

    #[test]
    fn test_free_comments_and_config() {
        let file = scan_text(
            "package m\n\n//go:gen:@Config(output=models_gen.go, generator=pick)\n\n//go:gen:@Pick(name=Brief, source=\"time.Location\", fields=[name])\n\nfunc f() {}\n",
        );
        assert_eq!(file.config.output_for("pick"), Some("models_gen.go"));
        assert_eq!(file.targets.len(), 1);
        assert_eq!(file.targets[0].kind, TargetKind::Comment);
        assert_eq!(file.targets[0].name, "time.Location");
    }

    #[test]
    fn test_free_comment_directly_above_func() {
        let file = scan_text(
            "package m\n\n// f does things.\n// go:gen: @Pick(name=Brief, source=User)\n// @Gsql()\nfunc f() {}\n\ntype User struct{ ID int }\n",
        );
        assert_eq!(file.targets.len(), 1);
        assert_eq!(file.targets[0].kind, TargetKind::Comment);
        assert_eq!(file.targets[0].name, "User");
        assert_eq!(file.targets[0].line, 4);
    }

    #[test]
    fn test_unannotated_file_yields_nothing() {
        let result = scanner()
            .scan_source(Path::new("x.go"), "package m\n\n// plain @Unknown(x)\ntype T struct{}\n".to_string())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_scan_tree_skips_and_reports() {
        let dir = TempDir::new().unwrap();
        let write = |rel: &str, body: &str| {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        };
        write("a.go", "package m\n\n// @Gsql()\ntype A struct{}\n");
        write("sub/b.go", "package sub\n\n// @Gsql()\ntype B struct{}\n");
        write("vendor/v/v.go", "package v\n\n// @Gsql()\ntype V struct{}\n");
        write(".hidden/h.go", "package h\n\n// @Gsql()\ntype H struct{}\n");
        write("a_test.go", "package m\n\n// @Gsql()\ntype T struct{}\n");
        write("broken.go", "package m\n\n// @Gsql()\ntype Broken struct {\n");
        write("plain.go", "package m\n\ntype P struct{}\n");
        write("gen.go", "// Code generated by gogen. DO NOT EDIT.\n\npackage m\n\n// @Gsql()\ntype G struct{}\n");

        let flat = scanner().scan(dir.path());
        let names: Vec<&str> = flat.targets().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["A"]);
        assert_eq!(flat.errors.len(), 1);
        assert!(flat.errors[0].file.ends_with("broken.go"));
        assert_eq!(flat.files_parsed, 2);

        let options = ScanOptionsBuilder::default()
            .recursive(true)
            .include_tests(true)
            .build()
            .unwrap();
        let deep = Scanner::new(["Gsql"], options).scan(dir.path());
        let mut names: Vec<&str> = deep.targets().map(|t| t.name.as_str()).collect();
        names.sort();
        assert_eq!(names, ["A", "B", "T"]);
    }
}
