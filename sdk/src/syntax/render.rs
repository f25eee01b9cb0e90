//! Canonical text for Go type expressions

use serde::Serialize;
use tree_sitter::Node;

use super::{field_children, named_children, text};

/// One parameter or result of a function signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: Option<String>,
    pub ty: String,
    pub variadic: bool,
}

impl Param {
    /// Type as written in a signature (`...T` for variadic parameters)
    pub fn signature_type(&self) -> String {
        if self.variadic {
            format!("...{}", self.ty)
        } else {
            self.ty.clone()
        }
    }
}

/// Collapse runs of whitespace into single spaces
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render a type expression node to canonical Go text
pub fn render_type(node: Node<'_>, src: &str) -> String {
    let child = |field: &str| node.child_by_field_name(field).map(|n| render_type(n, src));
    let first_named = || named_children(node).into_iter().next().map(|n| render_type(n, src));

    match node.kind() {
        "type_identifier" | "identifier" | "package_identifier" | "field_identifier" => {
            text(node, src).to_string()
        }
        "qualified_type" => format!(
            "{}.{}",
            node.child_by_field_name("package").map(|n| text(n, src)).unwrap_or_default(),
            node.child_by_field_name("name").map(|n| text(n, src)).unwrap_or_default()
        ),
        "pointer_type" => format!("*{}", first_named().unwrap_or_default()),
        "slice_type" => format!("[]{}", child("element").unwrap_or_default()),
        "array_type" => format!(
            "[{}]{}",
            node.child_by_field_name("length")
                .map(|n| collapse_whitespace(text(n, src)))
                .unwrap_or_default(),
            child("element").unwrap_or_default()
        ),
        "implicit_length_array_type" => format!("[...]{}", child("element").unwrap_or_default()),
        "map_type" => format!(
            "map[{}]{}",
            child("key").unwrap_or_default(),
            child("value").unwrap_or_default()
        ),
        "channel_type" => {
            let raw = text(node, src);
            let value = child("value").unwrap_or_default();
            if raw.starts_with("<-") {
                format!("<-chan {value}")
            } else if raw.trim_start_matches("chan").trim_start().starts_with("<-") {
                format!("chan<- {value}")
            } else {
                format!("chan {value}")
            }
        }
        "function_type" => {
            let params = node
                .child_by_field_name("parameters")
                .map(|n| render_params(n, src))
                .unwrap_or_else(|| "()".to_string());
            match node.child_by_field_name("result") {
                Some(result) => format!("func{} {}", params, render_result(result, src)),
                None => format!("func{params}"),
            }
        }
        "generic_type" => {
            let base = child("type").unwrap_or_default();
            let args = node
                .child_by_field_name("type_arguments")
                .map(|args| {
                    named_children(args)
                        .into_iter()
                        .map(|n| render_type(n, src))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            format!("{base}[{args}]")
        }
        "type_elem" => named_children(node)
            .into_iter()
            .map(|n| render_type(n, src))
            .collect::<Vec<_>>()
            .join(" | "),
        "negated_type" => format!("~{}", first_named().unwrap_or_default()),
        "parenthesized_type" => format!("({})", first_named().unwrap_or_default()),
        "interface_type" if named_children(node).is_empty() => "interface{}".to_string(),
        "struct_type" if is_empty_struct(node) => "struct{}".to_string(),
        _ => collapse_whitespace(text(node, src)),
    }
}

fn is_empty_struct(node: Node<'_>) -> bool {
    named_children(node)
        .into_iter()
        .all(|list| named_children(list).is_empty())
}

/// Render a function result: a bare type or a parenthesised list
pub fn render_result(node: Node<'_>, src: &str) -> String {
    if node.kind() == "parameter_list" {
        let params = parse_params(node, src);
        if params.len() == 1 && params[0].name.is_none() {
            return params[0].signature_type();
        }
        render_params(node, src)
    } else {
        render_type(node, src)
    }
}

/// Render a parameter list as `(a int, b ...string)`
pub fn render_params(node: Node<'_>, src: &str) -> String {
    let mut parts = Vec::new();
    for decl in named_children(node) {
        let names: Vec<String> = field_children(decl, "name")
            .into_iter()
            .map(|n| text(n, src).to_string())
            .collect();
        let ty = decl
            .child_by_field_name("type")
            .map(|n| render_type(n, src))
            .unwrap_or_default();
        let ty = if decl.kind() == "variadic_parameter_declaration" {
            format!("...{ty}")
        } else {
            ty
        };
        match decl.kind() {
            "parameter_declaration" | "variadic_parameter_declaration" if names.is_empty() => parts.push(ty),
            "parameter_declaration" | "variadic_parameter_declaration" => {
                parts.push(format!("{} {}", names.join(", "), ty))
            }
            _ => {}
        }
    }
    format!("({})", parts.join(", "))
}

/// Expand a parameter list so every name gets its own entry
pub fn parse_params(node: Node<'_>, src: &str) -> Vec<Param> {
    if node.kind() != "parameter_list" {
        return vec![Param {
            name: None,
            ty: render_type(node, src),
            variadic: false,
        }];
    }

    let mut params = Vec::new();
    for decl in named_children(node) {
        let variadic = match decl.kind() {
            "parameter_declaration" => false,
            "variadic_parameter_declaration" => true,
            _ => continue,
        };
        let ty = decl
            .child_by_field_name("type")
            .map(|n| render_type(n, src))
            .unwrap_or_default();
        let names = field_children(decl, "name");
        if names.is_empty() {
            params.push(Param { name: None, ty, variadic });
        } else {
            for name in names {
                params.push(Param {
                    name: Some(text(name, src).to_string()),
                    ty: ty.clone(),
                    variadic,
                });
            }
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::GoSource;

    /// Render the type of field `F` in `type T struct { F <ty> }`
    fn field_type(ty: &str) -> String {
        let src = GoSource::parse("t.go", format!("package p\n\ntype T struct {{\n\tF {ty}\n}}\n")).unwrap();
        let spec = src.find_type_spec("T").unwrap();
        let strukt = spec.child_by_field_name("type").unwrap();
        let list = named_children(strukt).into_iter().next().unwrap();
        let field = named_children(list).into_iter().find(|n| n.kind() == "field_declaration").unwrap();
        render_type(field.child_by_field_name("type").unwrap(), &src.text)
    }

    #[test]
    fn test_render_simple_and_composite_types() {
        assert_eq!(field_type("string"), "string");
        assert_eq!(field_type("*time.Time"), "*time.Time");
        assert_eq!(field_type("[]  *pkg.User"), "[]*pkg.User");
        assert_eq!(field_type("[4]byte"), "[4]byte");
        assert_eq!(field_type("map[string] []int"), "map[string][]int");
    }

    #[test]
    fn test_render_channels() {
        assert_eq!(field_type("chan int"), "chan int");
        assert_eq!(field_type("<-chan int"), "<-chan int");
        assert_eq!(field_type("chan<- int"), "chan<- int");
    }

    #[test]
    fn test_render_functions() {
        assert_eq!(field_type("func()"), "func()");
        assert_eq!(field_type("func(a, b int) error"), "func(a, b int) error");
        assert_eq!(field_type("func(string, ...any) (int, error)"), "func(string, ...any) (int, error)");
    }

    #[test]
    fn test_render_generics_and_literals() {
        assert_eq!(field_type("List[string]"), "List[string]");
        assert_eq!(field_type("pkg.Pair[K, V]"), "pkg.Pair[K, V]");
        assert_eq!(field_type("interface{}"), "interface{}");
        assert_eq!(field_type("struct{}"), "struct{}");
    }
}
