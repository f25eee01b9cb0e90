//! Parsed Go source file

use std::fs;
use std::path::{Path, PathBuf};

use tree_sitter::{Node, Parser, Tree};

use super::{field_children, named_children, text, unquote};
use crate::error::SyntaxError;

/// A comment with the positional facts needed to attach it to declarations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentNode {
    pub text: String,
    pub start_row: usize,
    pub end_row: usize,
    pub start_byte: usize,
    pub end_byte: usize,
    /// Nothing but whitespace precedes the comment on its first line
    pub own_line: bool,
}

/// One import of a file, `name` holding the explicit alias if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub name: Option<String>,
    pub path: String,
}

/// A Go source file together with its syntax tree
pub struct GoSource {
    pub path: PathBuf,
    pub text: String,
    tree: Tree,
}

impl GoSource {
    /// Read and parse a file from disk
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, SyntaxError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SyntaxError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, text)
    }

    /// Parse source text that is associated with `path`
    pub fn parse<P: AsRef<Path>>(path: P, text: impl Into<String>) -> Result<Self, SyntaxError> {
        let path = path.as_ref().to_path_buf();
        let text = text.into();

        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| SyntaxError::Language(e.to_string()))?;
        let tree = parser
            .parse(&text, None)
            .ok_or_else(|| SyntaxError::NoTree { path: path.clone() })?;

        Ok(Self { path, text, tree })
    }

    /// Parse and reject trees containing syntax errors
    pub fn parse_strict<P: AsRef<Path>>(path: P, text: impl Into<String>) -> Result<Self, SyntaxError> {
        let source = Self::parse(path, text)?;
        match source.first_error_line() {
            Some(line) => Err(SyntaxError::Invalid {
                path: source.path.clone(),
                line,
            }),
            None => Ok(source),
        }
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Text covered by a node of this file
    pub fn node_text(&self, node: Node<'_>) -> &str {
        text(node, &self.text)
    }

    /// 1-based line of the first error or missing node
    pub fn first_error_line(&self) -> Option<usize> {
        let root = self.root();
        if !root.has_error() {
            return None;
        }
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.is_error() || node.is_missing() {
                return Some(node.start_position().row + 1);
            }
            if node.has_error() {
                let mut kids = super::children(node);
                kids.reverse();
                stack.extend(kids);
            }
        }
        Some(root.start_position().row + 1)
    }

    /// Declared package name from the `package` clause
    pub fn package_name(&self) -> Option<String> {
        named_children(self.root())
            .into_iter()
            .find(|n| n.kind() == "package_clause")
            .and_then(|clause| named_children(clause).into_iter().next())
            .map(|ident| self.node_text(ident).to_string())
    }

    /// All import specs in declaration order
    pub fn imports(&self) -> Vec<ImportSpec> {
        let mut specs = Vec::new();
        for decl in named_children(self.root()) {
            if decl.kind() != "import_declaration" {
                continue;
            }
            let mut pending = named_children(decl);
            while let Some(node) = pending.pop() {
                match node.kind() {
                    "import_spec_list" => pending.extend(named_children(node)),
                    "import_spec" => {
                        let Some(path) = node.child_by_field_name("path") else {
                            continue;
                        };
                        specs.push(ImportSpec {
                            name: node
                                .child_by_field_name("name")
                                .map(|n| self.node_text(n).to_string()),
                            path: unquote(self.node_text(path)),
                        });
                    }
                    _ => {}
                }
            }
        }
        specs.sort_by_key(|spec| spec.path.clone());
        specs
    }

    /// Every comment in the file, ordered by position
    pub fn comments(&self) -> Vec<CommentNode> {
        let mut found = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            if node.kind() == "comment" {
                let start = node.start_byte();
                let line_start = self.text[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
                found.push(CommentNode {
                    text: self.node_text(node).to_string(),
                    start_row: node.start_position().row,
                    end_row: node.end_position().row,
                    start_byte: start,
                    end_byte: node.end_byte(),
                    own_line: self.text[line_start..start].trim().is_empty(),
                });
                continue;
            }
            stack.extend(super::children(node));
        }
        found.sort_by_key(|c| c.start_byte);
        found
    }

    /// Find the `type_spec` (or `type_alias`) declaring `name`
    pub fn find_type_spec(&self, name: &str) -> Option<Node<'_>> {
        named_children(self.root())
            .into_iter()
            .filter(|n| n.kind() == "type_declaration")
            .flat_map(type_specs)
            .find(|spec| {
                spec.child_by_field_name("name")
                    .is_some_and(|n| self.node_text(n) == name)
            })
    }

    /// Names of the identifiers stored under `field` of a node
    pub fn field_names(&self, node: Node<'_>, field: &str) -> Vec<String> {
        field_children(node, field)
            .into_iter()
            .map(|n| self.node_text(n).to_string())
            .collect()
    }
}

/// The `type_spec`/`type_alias` children of a type declaration
pub fn type_specs(decl: Node<'_>) -> Vec<Node<'_>> {
    named_children(decl)
        .into_iter()
        .filter(|n| matches!(n.kind(), "type_spec" | "type_alias"))
        .collect()
}

/// Whether a declaration uses the parenthesised group form
pub fn is_grouped(decl: Node<'_>) -> bool {
    super::children(decl)
        .iter()
        .any(|n| matches!(n.kind(), "(" | "var_spec_list"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = r#"package shop

import (
	"fmt"
	db "example.com/shop/internal/store"
	_ "embed"
)

import "time"

// Order is placed by a customer.
type Order struct {
	ID   int64
	At   time.Time // created
}

type (
	A struct{}
	B = A
)
"#;

    #[test]
    fn test_package_and_imports() {
        let src = GoSource::parse("order.go", SRC).unwrap();
        assert_eq!(src.package_name().as_deref(), Some("shop"));

        let imports = src.imports();
        assert_eq!(imports.len(), 4);
        let store = imports.iter().find(|i| i.path == "example.com/shop/internal/store").unwrap();
        assert_eq!(store.name.as_deref(), Some("db"));
        let time = imports.iter().find(|i| i.path == "time").unwrap();
        assert_eq!(time.name, None);
    }

    #[test]
    fn test_comments_are_positioned() {
        let src = GoSource::parse("order.go", SRC).unwrap();
        let comments = src.comments();
        assert_eq!(comments.len(), 2);
        assert!(comments[0].own_line);
        assert_eq!(comments[0].text, "// Order is placed by a customer.");
        assert!(!comments[1].own_line);
    }

    #[test]
    fn test_find_type_spec_in_group() {
        let src = GoSource::parse("order.go", SRC).unwrap();
        assert!(src.find_type_spec("Order").is_some());
        assert!(src.find_type_spec("A").is_some());
        assert_eq!(src.find_type_spec("B").map(|n| n.kind()), Some("type_alias"));
        assert!(src.find_type_spec("Missing").is_none());
    }

    #[test]
    fn test_strict_parse_reports_line() {
        let err = GoSource::parse_strict("bad.go", "package x\n\ntype T struct {\n\tA int\n").err();
        assert!(matches!(err, Some(SyntaxError::Invalid { .. })));
    }
}
