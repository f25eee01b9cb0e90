//! Declaration metadata extracted from Go sources

use std::collections::BTreeMap;
use std::path::PathBuf;

use convert_case::{Case, Casing};
use serde::Serialize;

use crate::syntax::Param;

/// One flattened struct field after embedding expansion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldInfo {
    pub name: String,
    /// Type as written, qualified with the package name for foreign types
    pub ty: String,
    /// Import path of the package the type comes from, empty for local/builtin types
    pub pkg_path: String,
    /// Package qualifier used in `ty`
    pub pkg_alias: String,
    /// Raw struct tag without the surrounding backticks
    pub tag: String,
    /// Embedded type the field was promoted from (outermost level only)
    pub source_type: String,
    /// Dotted access path for tag-embedded fields, empty for promoted fields
    pub source_field: String,
    /// Column prefix accumulated through `embeddedPrefix` tags
    pub embedded_prefix: String,
}

impl FieldInfo {
    /// Field name with the accumulated embedded prefix applied
    pub fn prefixed_name(&self) -> String {
        format!("{}{}", self.embedded_prefix, self.name)
    }

    /// Expression reaching this field from a value of the owning struct
    pub fn access_path(&self, receiver: &str) -> String {
        if self.source_field.is_empty() {
            format!("{}.{}", receiver, self.name)
        } else {
            format!("{}.{}.{}", receiver, self.source_field, self.name)
        }
    }

    /// Value of `key` in the struct tag, e.g. `tag_value("json")`
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        tag_lookup(&self.tag, key)
    }

    /// Database column: an explicit `gorm:"column:x"` wins, otherwise the prefixed snake case name
    pub fn column_name(&self) -> String {
        let explicit = self.tag_value("gorm").and_then(|gorm| {
            gorm.split(';')
                .find_map(|item| item.trim().strip_prefix("column:").map(str::to_string))
        });
        explicit.unwrap_or_else(|| format!("{}{}", self.embedded_prefix, self.name.to_case(Case::Snake)))
    }
}

/// Look up one key of a Go struct tag (`key:"value" other:"x"`)
pub fn tag_lookup<'t>(tag: &'t str, key: &str) -> Option<&'t str> {
    let mut rest = tag.trim();
    while !rest.is_empty() {
        let colon = rest.find(':')?;
        let name = rest[..colon].trim();
        let after = rest[colon + 1..].strip_prefix('"')?;

        let mut end = None;
        let mut escaped = false;
        for (idx, ch) in after.char_indices() {
            match ch {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => {
                    end = Some(idx);
                    break;
                }
                _ => escaped = false,
            }
        }
        let end = end?;
        if name == key {
            return Some(&after[..end]);
        }
        rest = after[end + 1..].trim_start();
    }
    None
}

/// A method declared on a named type somewhere in its package directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodInfo {
    pub name: String,
    pub receiver_name: String,
    pub receiver_type: String,
    pub pointer_receiver: bool,
    pub return_type: String,
    pub file_path: PathBuf,
}

/// An entry of a file's import table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportInfo {
    pub path: String,
    /// Alias as written in the import spec, if any
    pub alias: Option<String>,
    /// Package name declared by the imported package
    pub name: String,
}

impl ImportInfo {
    /// Qualifier code in the importing file uses for this package
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Imports of one file keyed by every qualifier that can refer to them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportTable {
    entries: BTreeMap<String, ImportInfo>,
}

impl ImportTable {
    pub(crate) fn insert(&mut self, key: String, info: ImportInfo) {
        self.entries.entry(key).or_insert(info);
    }

    pub fn get(&self, qualifier: &str) -> Option<&ImportInfo> {
        self.entries.get(qualifier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A parsed struct declaration
#[derive(Debug, Clone, Serialize)]
pub struct StructInfo {
    pub name: String,
    pub package_name: String,
    pub file_path: PathBuf,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub imports: ImportTable,
}

impl StructInfo {
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m.name == name)
    }
}

/// A method of an interface after embedded interfaces are flattened
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceMethod {
    pub name: String,
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    /// Signature without the method name, e.g. `(ctx context.Context) error`
    pub signature: String,
    /// Packages referenced by the signature as (qualifier, import path)
    pub packages: Vec<(String, String)>,
}

/// A parsed interface declaration
#[derive(Debug, Clone, Serialize)]
pub struct InterfaceInfo {
    pub name: String,
    pub package_name: String,
    pub file_path: PathBuf,
    pub methods: Vec<InterfaceMethod>,
    pub imports: ImportTable,
}

impl InterfaceInfo {
    pub fn method(&self, name: &str) -> Option<&InterfaceMethod> {
        self.methods.iter().find(|m| m.name == name)
    }
}
