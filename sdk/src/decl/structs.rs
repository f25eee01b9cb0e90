//! Struct field extraction with embedding expansion

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;
use tree_sitter::Node;

use super::methods::collect_methods;
use super::types::{tag_lookup, FieldInfo, StructInfo};
use super::{is_identifier, split_qualified, DeclParser, Scope, TypeRef, MAX_EMBED_DEPTH};
use crate::error::DeclError;
use crate::syntax::{children, named_children, render_type, unquote, GoSource};

const BUILTIN_TYPES: &[&str] = &[
    "bool", "string", "byte", "rune", "error", "any", "int", "int8", "int16", "int32", "int64", "uint", "uint8",
    "uint16", "uint32", "uint64", "uintptr", "float32", "float64", "complex64", "complex128",
];

/// Types that are structs but are treated as opaque values
const OPAQUE_TYPES: &[&str] = &["time.Time", "time.Duration"];

/// Whether an embedded type is a candidate for expansion
pub fn is_expandable(ty: &str) -> bool {
    let excluded_prefix = ["*", "[]", "map[", "chan", "<-chan", "func"]
        .iter()
        .any(|prefix| ty.starts_with(prefix));
    !(excluded_prefix || BUILTIN_TYPES.contains(&ty) || OPAQUE_TYPES.contains(&ty))
}

/// The `embeddedPrefix` of a `gorm:"embedded"` tag, empty when the tag has none
pub fn gorm_embedded_prefix(tag: &str) -> Option<String> {
    let gorm = tag_lookup(tag, "gorm")?;
    let items: Vec<&str> = gorm.split(';').map(str::trim).collect();
    if !items.contains(&"embedded") {
        return None;
    }
    Some(
        items
            .iter()
            .find_map(|item| item.strip_prefix("embeddedPrefix:"))
            .unwrap_or("")
            .to_string(),
    )
}

/// Field name Go gives an anonymous embedded field of type `ty`
fn embedded_field_name(ty: &str) -> String {
    let base = ty.trim_start_matches('*');
    let base = base.split('[').next().unwrap_or(base);
    base.rsplit('.').next().unwrap_or(base).to_string()
}

fn struct_body(spec: Node<'_>) -> Option<Node<'_>> {
    spec.child_by_field_name("type")
        .filter(|ty| ty.kind() == "struct_type")
}

fn visit_key(dir: &Path, name: &str) -> String {
    format!("{}:{}", dir.display(), name)
}

/// Where the fields being collected sit relative to the root struct
#[derive(Debug, Clone, Default)]
struct Level {
    depth: usize,
    owner: String,
    source_type: String,
    source_field: String,
    prefix: String,
}

impl Level {
    fn root(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            ..Default::default()
        }
    }

    /// Level for the fields of an embedded struct; `tagged` carries the
    /// `embeddedPrefix` when the embedding comes from a gorm tag
    fn descend(&self, embedded: &str, field_name: &str, tagged: Option<&str>) -> Self {
        let source_field = match tagged {
            Some(_) if self.source_field.is_empty() => field_name.to_string(),
            Some(_) => format!("{}.{}", self.source_field, field_name),
            None => self.source_field.clone(),
        };
        Self {
            depth: self.depth + 1,
            owner: embedded.to_string(),
            source_type: if self.source_type.is_empty() {
                embedded.to_string()
            } else {
                self.source_type.clone()
            },
            source_field,
            prefix: format!("{}{}", self.prefix, tagged.unwrap_or("")),
        }
    }

    fn field(&self, name: &str, ty: &TypeRef, tag: &str) -> FieldInfo {
        FieldInfo {
            name: name.to_string(),
            ty: ty.ty.clone(),
            pkg_path: ty.pkg_path.clone(),
            pkg_alias: ty.pkg_alias.clone(),
            tag: tag.to_string(),
            source_type: self.source_type.clone(),
            source_field: self.source_field.clone(),
            embedded_prefix: self.prefix.clone(),
        }
    }
}

/// One embedded field awaiting expansion
struct Embedding<'a> {
    raw: &'a str,
    ty: TypeRef,
    field_name: String,
    tag: String,
    tagged_prefix: Option<String>,
}

impl<'r> DeclParser<'r> {
    /// Parse struct `name` declared in `file`
    pub fn parse_struct(&self, file: &Path, name: &str) -> Result<StructInfo, DeclError> {
        let source = self.load_file(file)?;
        self.struct_from_source(&source, name)
    }

    /// Parse struct `name` declared somewhere in package directory `dir`
    pub fn find_struct(&self, dir: &Path, name: &str) -> Result<StructInfo, DeclError> {
        let source = self.load_declaring(dir, name)?;
        self.struct_from_source(&source, name)
    }

    /// Parse struct `name` of another package, qualifying its local types
    /// with `qualifier` so they read correctly from the importing file
    pub fn find_foreign_struct(
        &self,
        dir: &Path,
        name: &str,
        qualifier: &str,
        import_path: &str,
    ) -> Result<StructInfo, DeclError> {
        let source = self.load_declaring(dir, name)?;
        self.struct_in(&source, name, Some((qualifier.to_string(), import_path.to_string())))
    }

    pub fn struct_from_source(&self, source: &GoSource, name: &str) -> Result<StructInfo, DeclError> {
        self.struct_in(source, name, None)
    }

    fn struct_in(
        &self,
        source: &GoSource,
        name: &str,
        foreign: Option<(String, String)>,
    ) -> Result<StructInfo, DeclError> {
        let spec = source.find_type_spec(name).ok_or_else(|| DeclError::NotFound {
            name: name.to_string(),
            location: source.path.display().to_string(),
        })?;
        let body = struct_body(spec).ok_or_else(|| DeclError::NotStruct { name: name.to_string() })?;

        let scope = Scope::new(source, self.resolver, foreign);
        let mut visiting = HashSet::from([visit_key(&scope.dir, name)]);
        let mut fields = Vec::new();
        self.expand_fields(&scope, body, &Level::root(name), &mut visiting, &mut fields)?;

        let methods = collect_methods(&scope.dir, name);
        debug!(
            "Parsed struct {} with {} fields and {} methods",
            name,
            fields.len(),
            methods.len()
        );

        Ok(StructInfo {
            name: name.to_string(),
            package_name: source.package_name().unwrap_or_default(),
            file_path: source.path.clone(),
            fields,
            methods,
            imports: scope.imports,
        })
    }

    fn expand_fields(
        &self,
        scope: &Scope<'_>,
        body: Node<'_>,
        level: &Level,
        visiting: &mut HashSet<String>,
        out: &mut Vec<FieldInfo>,
    ) -> Result<(), DeclError> {
        let Some(list) = named_children(body)
            .into_iter()
            .find(|n| n.kind() == "field_declaration_list")
        else {
            return Ok(());
        };

        for decl in named_children(list) {
            if decl.kind() != "field_declaration" {
                continue;
            }
            let Some(type_node) = decl.child_by_field_name("type") else {
                continue;
            };
            let tag = decl
                .child_by_field_name("tag")
                .map(|t| unquote(scope.text(t)))
                .unwrap_or_default();
            let names = scope.source.field_names(decl, "name");

            let pointer = children(decl).iter().any(|c| c.kind() == "*");
            let mut raw = render_type(type_node, &scope.source.text);
            let mut ty = scope.type_ref(type_node);
            if pointer {
                raw = format!("*{raw}");
                ty.ty = format!("*{}", ty.ty);
            }

            if names.is_empty() {
                let tagged_prefix = gorm_embedded_prefix(&tag);
                let embedding = Embedding {
                    field_name: embedded_field_name(&raw),
                    raw: &raw,
                    ty,
                    tag,
                    tagged_prefix,
                };
                self.embed(scope, embedding, level, visiting, out)?;
                continue;
            }

            if let (Some(prefix), [name]) = (gorm_embedded_prefix(&tag), names.as_slice()) {
                let embedding = Embedding {
                    field_name: name.clone(),
                    raw: &raw,
                    ty,
                    tag,
                    tagged_prefix: Some(prefix),
                };
                self.embed(scope, embedding, level, visiting, out)?;
                continue;
            }

            for name in &names {
                out.push(level.field(name, &ty, &tag));
            }
        }

        Ok(())
    }

    fn embed(
        &self,
        scope: &Scope<'_>,
        embedding: Embedding<'_>,
        level: &Level,
        visiting: &mut HashSet<String>,
        out: &mut Vec<FieldInfo>,
    ) -> Result<(), DeclError> {
        let keep = |out: &mut Vec<FieldInfo>| out.push(level.field(&embedding.field_name, &embedding.ty, &embedding.tag));

        if !is_expandable(embedding.raw) {
            keep(out);
            return Ok(());
        }

        let unresolved = || DeclError::UnresolvedType {
            ty: embedding.raw.to_string(),
            owner: level.owner.clone(),
        };
        let base = if embedding.raw.starts_with('[') {
            embedding.raw
        } else {
            embedding.raw.split('[').next().unwrap_or(embedding.raw)
        };
        let (qualifier, type_name) = split_qualified(base);
        if !is_identifier(type_name) || qualifier.is_some_and(|q| !is_identifier(q)) {
            return Err(unresolved());
        }

        let (dir, foreign) = match qualifier {
            None => (scope.dir.clone(), scope.foreign.clone()),
            Some(q) => {
                let (dir, path) = self.package_of(scope, q).ok_or_else(unresolved)?;
                (dir, Some((q.to_string(), path)))
            }
        };

        let key = visit_key(&dir, type_name);
        if visiting.contains(&key) {
            debug!("Embedding cycle at {}, skipping", key);
            return Ok(());
        }

        let embedded = embedding.ty.ty.trim_start_matches('*').to_string();
        let next = level.descend(&embedded, &embedding.field_name, embedding.tagged_prefix.as_deref());

        let local_spec = match qualifier {
            None => scope.source.find_type_spec(type_name),
            Some(_) => None,
        };
        if let Some(spec) = local_spec {
            let Some(body) = struct_body(spec) else {
                keep(out);
                return Ok(());
            };
            return self.descend_into(scope, body, &next, key, visiting, out);
        }

        let source = match self.load_declaring(&dir, type_name) {
            Ok(source) => source,
            Err(DeclError::NotFound { .. }) => return Err(unresolved()),
            Err(other) => return Err(other),
        };
        let Some(body) = source.find_type_spec(type_name).and_then(struct_body) else {
            keep(out);
            return Ok(());
        };
        let inner = Scope::new(&source, self.resolver, foreign);
        self.descend_into(&inner, body, &next, key, visiting, out)
    }

    fn descend_into(
        &self,
        scope: &Scope<'_>,
        body: Node<'_>,
        next: &Level,
        key: String,
        visiting: &mut HashSet<String>,
        out: &mut Vec<FieldInfo>,
    ) -> Result<(), DeclError> {
        if next.depth > MAX_EMBED_DEPTH {
            return Err(DeclError::DepthExceeded {
                ty: next.owner.clone(),
                limit: MAX_EMBED_DEPTH,
            });
        }
        visiting.insert(key.clone());
        let result = self.expand_fields(scope, body, next, visiting, out);
        visiting.remove(&key);
        result
    }
}
