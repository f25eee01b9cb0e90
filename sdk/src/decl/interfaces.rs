//! Interface method sets with embedded interfaces flattened

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;
use tree_sitter::Node;

use super::types::{InterfaceInfo, InterfaceMethod};
use super::{is_identifier, split_qualified, DeclParser, Scope};
use crate::error::DeclError;
use crate::syntax::{field_children, named_children, render_type, GoSource, Param};

fn interface_body(spec: Node<'_>) -> Option<Node<'_>> {
    spec.child_by_field_name("type")
        .filter(|ty| ty.kind() == "interface_type")
}

/// The type named by an embedded interface element, if it is a single type
fn embedded_type(elem: Node<'_>) -> Option<Node<'_>> {
    match elem.kind() {
        "type_identifier" | "qualified_type" => Some(elem),
        "type_elem" | "interface_type_name" | "constraint_elem" => {
            let kids = named_children(elem);
            match kids.as_slice() {
                [single] if matches!(single.kind(), "type_identifier" | "qualified_type") => Some(*single),
                _ => None,
            }
        }
        _ => None,
    }
}

fn builtin_error_method() -> InterfaceMethod {
    InterfaceMethod {
        name: "Error".to_string(),
        params: Vec::new(),
        results: vec![Param {
            name: None,
            ty: "string".to_string(),
            variadic: false,
        }],
        signature: "() string".to_string(),
        packages: Vec::new(),
    }
}

/// Build the signature text `(a int, b ...string) (int, error)`
pub fn format_signature(params: &[Param], results: &[Param]) -> String {
    let render = |list: &[Param]| {
        list.iter()
            .map(|p| match &p.name {
                Some(name) => format!("{} {}", name, p.signature_type()),
                None => p.signature_type(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    };
    let params = format!("({})", render(params));
    match results {
        [] => params,
        [single] if single.name.is_none() => format!("{} {}", params, single.signature_type()),
        _ => format!("{} ({})", params, render(results)),
    }
}

impl<'r> DeclParser<'r> {
    /// Parse interface `name` declared in `file`
    pub fn parse_interface(&self, file: &Path, name: &str) -> Result<InterfaceInfo, DeclError> {
        let source = self.load_file(file)?;
        self.interface_from_source(&source, name)
    }

    /// Parse interface `name` declared somewhere in package directory `dir`
    pub fn find_interface(&self, dir: &Path, name: &str) -> Result<InterfaceInfo, DeclError> {
        let source = self.load_declaring(dir, name)?;
        self.interface_from_source(&source, name)
    }

    /// Parse interface `name` of another package, qualifying its local types
    /// with `qualifier` so they read correctly from the importing file
    pub fn find_foreign_interface(
        &self,
        dir: &Path,
        name: &str,
        qualifier: &str,
        import_path: &str,
    ) -> Result<InterfaceInfo, DeclError> {
        let source = self.load_declaring(dir, name)?;
        self.interface_in(&source, name, Some((qualifier.to_string(), import_path.to_string())))
    }

    pub fn interface_from_source(&self, source: &GoSource, name: &str) -> Result<InterfaceInfo, DeclError> {
        self.interface_in(source, name, None)
    }

    fn interface_in(
        &self,
        source: &GoSource,
        name: &str,
        foreign: Option<(String, String)>,
    ) -> Result<InterfaceInfo, DeclError> {
        let spec = source.find_type_spec(name).ok_or_else(|| DeclError::NotFound {
            name: name.to_string(),
            location: source.path.display().to_string(),
        })?;
        let body = interface_body(spec).ok_or_else(|| DeclError::NotInterface { name: name.to_string() })?;

        let scope = Scope::new(source, self.resolver, foreign);
        let own_key = format!("{}:{}", self.package_key(&scope.dir), name);
        let mut visited = HashSet::from([own_key]);
        let mut methods = Vec::new();
        self.collect_interface(&scope, body, &mut visited, &mut methods)?;
        debug!("Parsed interface {} with {} methods", name, methods.len());

        Ok(InterfaceInfo {
            name: name.to_string(),
            package_name: source.package_name().unwrap_or_default(),
            file_path: source.path.clone(),
            methods,
            imports: scope.imports,
        })
    }

    fn package_key(&self, dir: &Path) -> String {
        self.resolver
            .import_path_of(dir)
            .unwrap_or_else(|| dir.display().to_string())
    }

    fn collect_interface(
        &self,
        scope: &Scope<'_>,
        body: Node<'_>,
        visited: &mut HashSet<String>,
        out: &mut Vec<InterfaceMethod>,
    ) -> Result<(), DeclError> {
        for elem in named_children(body) {
            match elem.kind() {
                "method_elem" | "method_spec" => {
                    let method = method_from_elem(scope, elem);
                    if let Some(method) = method {
                        push_unique(out, method);
                    }
                }
                "comment" => {}
                _ => match embedded_type(elem) {
                    Some(ty) => self.embed_interface(scope, ty, visited, out)?,
                    None => debug!("Ignoring type set element '{}'", scope.text(elem)),
                },
            }
        }
        Ok(())
    }

    fn embed_interface(
        &self,
        scope: &Scope<'_>,
        ty: Node<'_>,
        visited: &mut HashSet<String>,
        out: &mut Vec<InterfaceMethod>,
    ) -> Result<(), DeclError> {
        let raw = render_type(ty, &scope.source.text);
        let (qualifier, name) = split_qualified(&raw);
        let unresolved = || DeclError::UnresolvedType {
            ty: raw.clone(),
            owner: scope.source.path.display().to_string(),
        };
        if !is_identifier(name) {
            return Err(unresolved());
        }

        let local_spec = match qualifier {
            None => scope.source.find_type_spec(name),
            Some(_) => None,
        };

        if qualifier.is_none() && local_spec.is_none() && name == "error" {
            if visited.insert("builtin:error".to_string()) {
                push_unique(out, builtin_error_method());
            }
            return Ok(());
        }

        let (dir, foreign) = match qualifier {
            None => (scope.dir.clone(), scope.foreign.clone()),
            Some(q) => {
                let (dir, path) = self.package_of(scope, q).ok_or_else(unresolved)?;
                (dir, Some((q.to_string(), path)))
            }
        };

        let key = format!("{}:{}", self.package_key(&dir), name);
        if !visited.insert(key.clone()) {
            debug!("Interface {} already flattened, skipping", key);
            return Ok(());
        }

        if let Some(spec) = local_spec {
            return match interface_body(spec) {
                Some(body) => self.collect_interface(scope, body, visited, out),
                None => Err(DeclError::NotInterface { name: raw.clone() }),
            };
        }

        let source = match self.load_declaring(&dir, name) {
            Ok(source) => source,
            Err(DeclError::NotFound { .. }) => return Err(unresolved()),
            Err(other) => return Err(other),
        };
        let Some(body) = source.find_type_spec(name).and_then(interface_body) else {
            return Err(DeclError::NotInterface { name: raw.clone() });
        };
        let inner = Scope::new(&source, self.resolver, foreign);
        self.collect_interface(&inner, body, visited, out)
    }
}

fn push_unique(out: &mut Vec<InterfaceMethod>, method: InterfaceMethod) {
    if !out.iter().any(|m| m.name == method.name) {
        out.push(method);
    }
}

fn method_from_elem(scope: &Scope<'_>, elem: Node<'_>) -> Option<InterfaceMethod> {
    let name = scope.text(elem.child_by_field_name("name")?).to_string();
    let mut packages = Vec::new();

    let params = elem
        .child_by_field_name("parameters")
        .map(|list| params_in(scope, list, &mut packages))
        .unwrap_or_default();
    let results = elem
        .child_by_field_name("result")
        .map(|result| params_in(scope, result, &mut packages))
        .unwrap_or_default();

    Some(InterfaceMethod {
        signature: format_signature(&params, &results),
        name,
        params,
        results,
        packages,
    })
}

/// Parameters of a list (or a bare result type) rendered as seen from the root file
fn params_in(scope: &Scope<'_>, node: Node<'_>, packages: &mut Vec<(String, String)>) -> Vec<Param> {
    let mut note = |ty: Node<'_>| {
        for entry in scope.packages_in(ty) {
            if !packages.contains(&entry) {
                packages.push(entry);
            }
        }
        scope.type_ref(ty).ty
    };

    if node.kind() != "parameter_list" {
        return vec![Param {
            name: None,
            ty: note(node),
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
        let Some(ty_node) = decl.child_by_field_name("type") else {
            continue;
        };
        let ty = note(ty_node);
        let names = field_children(decl, "name");
        if names.is_empty() {
            params.push(Param { name: None, ty, variadic });
        } else {
            for name in names {
                params.push(Param {
                    name: Some(scope.text(name).to_string()),
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
    use crate::resolver::{PackageResolver, ResolverConfig};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(path: PathBuf, body: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn setup(files: &[(&str, &str)]) -> (TempDir, PathBuf, PackageResolver) {
        let dir = TempDir::new().unwrap();
        let goroot = dir.path().join("goroot");
        write(
            goroot.join("src/io/io.go"),
            "package io\n\ntype Reader interface {\n\tRead(p []byte) (n int, err error)\n}\n\ntype Closer interface {\n\tClose() error\n}\n",
        );
        write(goroot.join("src/context/context.go"), "package context\n\ntype Context interface{}\n");
        let root = dir.path().join("app");
        write(root.join("go.mod"), "module example.com/app\n");
        for (path, body) in files {
            write(root.join(path), body);
        }
        let resolver = PackageResolver::new(ResolverConfig {
            goroot,
            modcache: None,
            module_root: Some(root.clone()),
        })
        .unwrap();
        (dir, root, resolver)
    }

    #[test]
    fn test_format_signature() {
        let p = |name: Option<&str>, ty: &str, variadic| Param {
            name: name.map(str::to_string),
            ty: ty.to_string(),
            variadic,
        };
        assert_eq!(format_signature(&[], &[]), "()");
        assert_eq!(
            format_signature(&[p(Some("a"), "int", false), p(Some("rest"), "string", true)], &[p(None, "error", false)]),
            "(a int, rest ...string) error"
        );
        assert_eq!(
            format_signature(&[], &[p(None, "int", false), p(None, "error", false)]),
            "() (int, error)"
        );
    }

    #[test]
    fn test_flattens_stdlib_local_and_builtin_embeds() {
        let (_dir, root, resolver) = setup(&[(
            "store.go",
            "package app\n\nimport (\n\t\"context\"\n\t\"io\"\n)\n\ntype Store interface {\n\tio.Reader\n\tCloser\n\terror\n\tGet(ctx context.Context, id string) (*Item, error)\n\tClose() error\n}\n\ntype Closer interface {\n\tClose() error\n\tFlush(force bool)\n}\n\ntype Item struct{}\n",
        )]);
        let parser = DeclParser::new(&resolver);
        let info = parser.parse_interface(&root.join("store.go"), "Store").unwrap();

        let names: Vec<&str> = info.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Read", "Close", "Flush", "Error", "Get"]);

        let read = info.method("Read").unwrap();
        assert_eq!(read.signature, "(p []byte) (n int, err error)");

        let get = info.method("Get").unwrap();
        assert_eq!(get.signature, "(ctx context.Context, id string) (*Item, error)");
        assert_eq!(get.packages, vec![("context".to_string(), "context".to_string())]);
    }

    #[test]
    fn test_cross_package_cycle_terminates() {
        let (_dir, root, resolver) = setup(&[
            (
                "a/a.go",
                "package a\n\nimport \"example.com/app/b\"\n\ntype A interface {\n\tb.B\n\tDoA()\n}\n",
            ),
            (
                "b/b.go",
                "package b\n\nimport \"example.com/app/a\"\n\ntype B interface {\n\ta.A\n\tDoB(x Thing) Thing\n}\n\ntype Thing int\n",
            ),
        ]);
        let parser = DeclParser::new(&resolver);
        let info = parser.find_interface(&root.join("a"), "A").unwrap();

        let names: Vec<&str> = info.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["DoB", "DoA"]);
        assert_eq!(info.method("DoB").unwrap().signature, "(x b.Thing) b.Thing");
    }

    #[test]
    fn test_struct_is_not_interface() {
        let (_dir, root, resolver) = setup(&[("t.go", "package app\n\ntype T struct{}\n")]);
        let parser = DeclParser::new(&resolver);
        let err = parser.parse_interface(&root.join("t.go"), "T").unwrap_err();
        assert!(matches!(err, DeclError::NotInterface { .. }));
    }
}
