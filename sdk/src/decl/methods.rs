//! Method discovery across a package directory

use std::fs;
use std::path::Path;

use regex::Regex;
use tracing::debug;
use tree_sitter::Node;

use super::locate::package_files;
use super::types::MethodInfo;
use crate::generators::GENERATED_HEADER;
use crate::syntax::render::render_result;
use crate::syntax::{named_children, GoSource};

/// Receiver pattern matching `(r *T)`, `(r T)`, `(*T)` and generic receivers
fn receiver_pattern(type_name: &str) -> Option<Regex> {
    Regex::new(&format!(
        r"func\s*\(\s*(?:\w+\s+)?\*?\s*{}\s*(?:\[[^\]]*\])?\s*\)",
        regex::escape(type_name)
    ))
    .ok()
}

/// Every method declared on `type_name` in the non-test files of `dir`.
///
/// Files without a matching receiver are never parsed; files that fail to
/// parse cleanly and files written by gogen itself are skipped.
pub fn collect_methods(dir: &Path, type_name: &str) -> Vec<MethodInfo> {
    let Some(pattern) = receiver_pattern(type_name) else {
        return Vec::new();
    };

    let mut methods = Vec::new();
    for file in package_files(dir) {
        let Ok(text) = fs::read_to_string(&file) else {
            continue;
        };
        if !pattern.is_match(&text) || text.starts_with(GENERATED_HEADER) {
            continue;
        }
        let source = match GoSource::parse_strict(&file, text) {
            Ok(source) => source,
            Err(e) => {
                debug!("Skipping methods of {}: {}", file.display(), e);
                continue;
            }
        };
        for decl in named_children(source.root()) {
            if decl.kind() != "method_declaration" {
                continue;
            }
            if let Some(method) = method_info(&source, decl, type_name) {
                methods.push(method);
            }
        }
    }
    methods
}

fn method_info(source: &GoSource, decl: Node<'_>, type_name: &str) -> Option<MethodInfo> {
    let receiver = decl.child_by_field_name("receiver")?;
    let param = named_children(receiver)
        .into_iter()
        .find(|n| n.kind() == "parameter_declaration")?;
    let ty = param.child_by_field_name("type")?;

    let (pointer, base) = match ty.kind() {
        "pointer_type" => (true, named_children(ty).into_iter().next()?),
        _ => (false, ty),
    };
    let base = match base.kind() {
        "generic_type" => base.child_by_field_name("type")?,
        _ => base,
    };
    if source.node_text(base) != type_name {
        return None;
    }

    Some(MethodInfo {
        name: source.node_text(decl.child_by_field_name("name")?).to_string(),
        receiver_name: param
            .child_by_field_name("name")
            .map(|n| source.node_text(n).to_string())
            .unwrap_or_default(),
        receiver_type: type_name.to_string(),
        pointer_receiver: pointer,
        return_type: decl
            .child_by_field_name("result")
            .map(|r| render_result(r, &source.text))
            .unwrap_or_default(),
        file_path: source.path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_receiver_pattern() {
        let p = receiver_pattern("User").unwrap();
        assert!(p.is_match("func (u *User) Name() string"));
        assert!(p.is_match("func (User) Kind() int"));
        assert!(p.is_match("func (u *User[T]) Get() T"));
        assert!(!p.is_match("func (u *UserList) Len() int"));
    }

    #[test]
    fn test_collect_methods_across_files() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("user.go"),
            "package m\n\ntype User struct{ name string }\n\nfunc (u *User) Name() string { return u.name }\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("user_more.go"),
            "package m\n\nfunc (u User) Pair() (int, error) { return 0, nil }\n\nfunc (o *Other) Name() {}\n",
        )
        .unwrap();
        fs::write(dir.path().join("broken.go"), "package m\n\nfunc (u *User) Broken( {\n").unwrap();
        fs::write(
            dir.path().join("user_setter_gen.go"),
            format!("{GENERATED_HEADER}\n\npackage m\n\nfunc (u *User) SetName(v string) *User {{ return u }}\n"),
        )
        .unwrap();
        fs::write(dir.path().join("user_test.go"), "package m\n\nfunc (u *User) Helper() {}\n").unwrap();

        let methods = collect_methods(dir.path(), "User");
        let names: Vec<&str> = methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Name", "Pair"]);

        assert!(methods[0].pointer_receiver);
        assert_eq!(methods[0].receiver_name, "u");
        assert_eq!(methods[0].return_type, "string");
        assert!(!methods[1].pointer_receiver);
        assert_eq!(methods[1].return_type, "(int, error)");
    }
}
