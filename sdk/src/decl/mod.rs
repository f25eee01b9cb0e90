//! Struct and interface declaration parsing
//!
//! [`DeclParser`] turns a named Go declaration into flattened metadata:
//! struct fields with embedded structs expanded, methods found across the
//! package directory, and interface method sets with embedded interfaces
//! folded in. Cross-package references go through the [`PackageResolve`]
//! handed to the parser.

pub mod imports;
pub mod interfaces;
pub mod locate;
pub mod methods;
pub mod structs;
pub mod types;

pub use imports::build_import_table;
pub use locate::{locate_type, package_files};
pub use types::{
    tag_lookup, FieldInfo, ImportInfo, ImportTable, InterfaceInfo, InterfaceMethod, MethodInfo, StructInfo,
};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use tree_sitter::Node;

use crate::error::DeclError;
use crate::resolver::PackageResolve;
use crate::syntax::{named_children, text, GoSource};

/// Maximum nesting of embedded structs before expansion gives up
pub const MAX_EMBED_DEPTH: usize = 10;

/// Parses declarations, resolving foreign packages through a resolver
pub struct DeclParser<'r> {
    resolver: &'r dyn PackageResolve,
}

impl<'r> DeclParser<'r> {
    pub fn new(resolver: &'r dyn PackageResolve) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &dyn PackageResolve {
        self.resolver
    }

    /// Load the file declaring `name` inside `dir`
    fn load_declaring(&self, dir: &Path, name: &str) -> Result<GoSource, DeclError> {
        locate_type(dir, name)?.ok_or_else(|| DeclError::NotFound {
            name: name.to_string(),
            location: dir.display().to_string(),
        })
    }

    fn load_file(&self, file: &Path) -> Result<GoSource, DeclError> {
        Ok(GoSource::read(file)?)
    }

    /// Resolve a package qualifier of `scope` to its directory and import path
    fn package_of(&self, scope: &Scope<'_>, qualifier: &str) -> Option<(PathBuf, String)> {
        let info = scope.imports.get(qualifier)?;
        let dir = self.resolver.package_dir(&info.path)?;
        Some((dir, info.path.clone()))
    }
}

/// The file a declaration is read from, plus how its types are seen from the root
pub(crate) struct Scope<'s> {
    pub source: &'s GoSource,
    pub dir: PathBuf,
    pub imports: ImportTable,
    /// Qualifier and import path applied to unqualified exported types when
    /// the declaration lives outside the root package
    pub foreign: Option<(String, String)>,
}

impl<'s> Scope<'s> {
    pub fn new(source: &'s GoSource, resolver: &dyn PackageResolve, foreign: Option<(String, String)>) -> Self {
        let dir = source
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            source,
            dir,
            imports: build_import_table(source, resolver),
            foreign,
        }
    }

    pub fn text(&self, node: Node<'_>) -> &str {
        text(node, &self.source.text)
    }

    /// Every package (qualifier, import path) a type expression refers to
    pub fn packages_in(&self, node: Node<'_>) -> Vec<(String, String)> {
        let mut found: Vec<(String, String)> = Vec::new();
        if let Some((qualifier, path)) = &self.foreign {
            if !exported_local_types(node, &self.source.text).is_empty() {
                found.push((qualifier.clone(), path.clone()));
            }
        }
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if current.kind() == "qualified_type" {
                let info = current
                    .child_by_field_name("package")
                    .and_then(|pkg| self.imports.get(self.text(pkg)).map(|info| (self.text(pkg), info)));
                if let Some((qualifier, info)) = info {
                    let entry = (qualifier.to_string(), info.path.clone());
                    if !found.contains(&entry) {
                        found.push(entry);
                    }
                }
                continue;
            }
            stack.extend(named_children(current));
        }
        found
    }

    /// Render a type node as seen from the root file, with the package it comes from
    pub fn type_ref(&self, node: Node<'_>) -> TypeRef {
        let mut ty = crate::syntax::render_type(node, &self.source.text);

        if let Some((qualifier, path)) = &self.foreign {
            let local = exported_local_types(node, &self.source.text);
            if !local.is_empty() {
                ty = qualify(&ty, qualifier, &local);
                return TypeRef {
                    ty,
                    pkg_path: path.clone(),
                    pkg_alias: qualifier.clone(),
                };
            }
        }

        match first_qualifier(node, &self.source.text).and_then(|q| self.imports.get(&q).map(|i| (q, i))) {
            Some((qualifier, info)) => TypeRef {
                ty,
                pkg_path: info.path.clone(),
                pkg_alias: qualifier,
            },
            None => TypeRef {
                ty,
                pkg_path: String::new(),
                pkg_alias: String::new(),
            },
        }
    }
}

/// A rendered type with the package it must be imported from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TypeRef {
    pub ty: String,
    pub pkg_path: String,
    pub pkg_alias: String,
}

/// Exported type identifiers used without a package qualifier
fn exported_local_types(node: Node<'_>, src: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        match current.kind() {
            "qualified_type" => continue,
            "type_identifier" => {
                let name = text(current, src);
                if name.starts_with(|c: char| c.is_ascii_uppercase()) {
                    found.insert(name.to_string());
                }
            }
            _ => stack.extend(named_children(current)),
        }
    }
    found
}

/// Package qualifier of the first qualified type inside a type expression
fn first_qualifier(node: Node<'_>, src: &str) -> Option<String> {
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if current.kind() == "qualified_type" {
            return current
                .child_by_field_name("package")
                .map(|pkg| text(pkg, src).to_string());
        }
        let mut kids = named_children(current);
        kids.reverse();
        stack.extend(kids);
    }
    None
}

/// Prefix the given bare type names with `qualifier.`
pub(crate) fn qualify(ty: &str, qualifier: &str, names: &BTreeSet<String>) -> String {
    let alternatives: Vec<String> = names.iter().map(|n| regex::escape(n)).collect();
    let Ok(pattern) = Regex::new(&format!(r"(^|[^.\w])({})\b", alternatives.join("|"))) else {
        return ty.to_string();
    };
    pattern
        .replace_all(ty, |caps: &regex::Captures<'_>| format!("{}{}.{}", &caps[1], qualifier, &caps[2]))
        .into_owned()
}

/// Split `pkg.Name` into its qualifier and name
pub(crate) fn split_qualified(ty: &str) -> (Option<&str>, &str) {
    match ty.split_once('.') {
        Some((pkg, name)) => (Some(pkg), name),
        None => (None, ty),
    }
}

/// Whether a string is a plain Go identifier
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualify_only_bare_names() {
        let names: BTreeSet<String> = ["Item".to_string(), "Tag".to_string()].into();
        assert_eq!(qualify("[]Item", "models", &names), "[]models.Item");
        assert_eq!(qualify("map[Tag]*Item", "m", &names), "map[m.Tag]*m.Item");
        assert_eq!(qualify("other.Item", "m", &names), "other.Item");
        assert_eq!(qualify("Items", "m", &names), "Items");
    }

    #[test]
    fn test_split_and_identifier() {
        assert_eq!(split_qualified("models.Base"), (Some("models"), "Base"));
        assert_eq!(split_qualified("Base"), (None, "Base"));
        assert!(is_identifier("Base"));
        assert!(!is_identifier("[3]Base"));
        assert!(!is_identifier(""));
    }
}
