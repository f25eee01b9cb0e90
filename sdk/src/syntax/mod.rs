//! Go syntax trees backed by tree-sitter

pub mod render;
pub mod source;

pub use render::{collapse_whitespace, parse_params, render_params, render_type, Param};
pub use source::{CommentNode, GoSource, ImportSpec};

use tree_sitter::Node;

/// Collect the named children of a node
pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Collect all children of a node, including anonymous tokens
pub fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Collect the children stored under a field name
pub fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

/// Source text of a node, empty when the range is not valid UTF-8
pub fn text<'s>(node: Node<'_>, src: &'s str) -> &'s str {
    node.utf8_text(src.as_bytes()).unwrap_or("")
}

/// Strip the quotes of an interpreted or raw string literal
pub fn unquote(literal: &str) -> String {
    let lit = literal.trim();
    if lit.len() >= 2
        && ((lit.starts_with('"') && lit.ends_with('"')) || (lit.starts_with('`') && lit.ends_with('`')))
    {
        lit[1..lit.len() - 1].to_string()
    } else {
        lit.to_string()
    }
}

/// Whether the file name denotes a Go test file
pub fn is_test_file(name: &str) -> bool {
    name.ends_with("_test.go")
}

/// Whether a path is a Go source file
pub fn is_go_file(path: &std::path::Path) -> bool {
    path.extension().is_some_and(|ext| ext == "go")
}
