//! Built-in generators
//!
//! Each generator turns its batch of annotated targets into [`GoFile`]s.
//! Targets that fail are reported individually; the rest of the batch still
//! produces output.

pub mod errcode;
pub mod gofile;
pub mod gsql;
pub mod mock;
pub mod pick;
pub mod setter;

pub use errcode::{ErrCodeGenerator, TypedInt};
pub use gofile::{GoFile, GENERATED_HEADER};
pub use gsql::GsqlGenerator;
pub use mock::MockGenerator;
pub use pick::PickGenerator;
pub use setter::SetterGenerator;

use std::path::{Path, PathBuf};

use convert_case::{Case, Casing};

use crate::core::{AnnotatedTarget, GenContext, GenerateOutput, GeneratorRegistry};
use crate::decl::{build_import_table, FieldInfo};
use crate::error::GenError;
use crate::syntax::GoSource;

/// Registry holding every built-in generator
pub fn builtin_registry() -> GeneratorRegistry {
    let mut registry = GeneratorRegistry::new();
    registry
        .register(Box::new(ErrCodeGenerator))
        .register(Box::new(GsqlGenerator))
        .register(Box::new(PickGenerator))
        .register(Box::new(SetterGenerator))
        .register(Box::new(MockGenerator));
    registry
}

/// A type named by a `source=` parameter, located on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub dir: PathBuf,
    pub type_name: String,
    /// Qualifier and import path when the type lives in another package
    pub package: Option<(String, String)>,
}

impl SourceRef {
    /// Type expression naming the source from the annotated file
    pub fn type_expr(&self) -> String {
        match &self.package {
            Some((qualifier, _)) => format!("{}.{}", qualifier, self.type_name),
            None => self.type_name.clone(),
        }
    }
}

/// Resolve `source` (`Type`, `pkg.Type` or `import/path.Type`) as seen from `file`
pub fn resolve_source(ctx: &GenContext<'_>, file: &Path, source: &str) -> Result<SourceRef, GenError> {
    let file_dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
    let source = source.trim();
    if source.is_empty() {
        return Err(GenError::invalid("missing source type"));
    }

    let Some((package, type_name)) = source.rsplit_once('.') else {
        return Ok(SourceRef {
            dir: file_dir,
            type_name: source.to_string(),
            package: None,
        });
    };

    let import_path = if package.contains('/') {
        package.to_string()
    } else {
        let parsed = GoSource::read(file).map_err(|e| GenError::invalid(e.to_string()))?;
        let imports = build_import_table(&parsed, ctx.resolver);
        imports
            .get(package)
            .map(|info| info.path.clone())
            .ok_or_else(|| GenError::invalid(format!("package '{package}' is not imported")))?
    };

    if ctx.resolver.import_path_of(&file_dir).as_deref() == Some(import_path.as_str()) {
        return Ok(SourceRef {
            dir: file_dir,
            type_name: type_name.to_string(),
            package: None,
        });
    }

    let dir = ctx
        .resolver
        .package_dir(&import_path)
        .ok_or_else(|| GenError::invalid(format!("cannot locate package '{import_path}'")))?;
    let qualifier = if package.contains('/') {
        ctx.resolver.package_name(&import_path)
    } else {
        package.to_string()
    };

    Ok(SourceRef {
        dir,
        type_name: type_name.to_string(),
        package: Some((qualifier, import_path)),
    })
}

/// Add the import a field's type needs
pub fn import_field(ctx: &GenContext<'_>, file: &mut GoFile, field: &FieldInfo) {
    if !field.pkg_path.is_empty() {
        let declared = ctx.resolver.package_name(&field.pkg_path);
        file.import_as(field.pkg_path.clone(), &field.pkg_alias, &declared);
    }
}

/// Exported Go identifier for a field name with its embedded prefix
pub fn exported_name(field: &FieldInfo) -> String {
    let prefix = field.embedded_prefix.to_case(Case::Pascal);
    let name = upper_first(&field.name);
    format!("{prefix}{name}")
}

pub fn upper_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Go string literal for arbitrary text
pub fn go_quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Pad `rows` of (left, right) so the right column lines up
pub fn align(rows: &[(String, String)], indent: &str) -> String {
    let width = rows.iter().map(|(left, _)| left.len()).max().unwrap_or(0);
    rows.iter()
        .map(|(left, right)| {
            if right.is_empty() {
                format!("{indent}{left}")
            } else {
                format!("{indent}{left:<width$} {right}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fold per-output files of one generator into `out`, recording merge failures on `target`
pub(crate) fn add_output(
    out: &mut GenerateOutput,
    generator: &str,
    target: &AnnotatedTarget,
    file: GoFile,
) {
    if let Err(e) = out.add(target.output.clone(), file) {
        out.errors.push(target.error(generator, e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_and_quoting() {
        let field = FieldInfo {
            name: "city".to_string(),
            embedded_prefix: "home_".to_string(),
            ..Default::default()
        };
        assert_eq!(exported_name(&field), "HomeCity");
        assert_eq!(lower_first("User"), "user");
        assert_eq!(go_quote("say \"hi\"\n"), "\"say \\\"hi\\\"\\n\"");
    }

    #[test]
    fn test_align() {
        let rows = vec![
            ("ID".to_string(), "string".to_string()),
            ("CreatedAt".to_string(), "string".to_string()),
        ];
        assert_eq!(align(&rows, "\t"), "\tID        string\n\tCreatedAt string");
    }

    #[test]
    fn test_builtin_registry_covers_all_annotations() {
        let registry = builtin_registry();
        let names: Vec<String> = registry.annotation_names().into_iter().collect();
        assert_eq!(names, ["Code", "Gsql", "Mock", "Pick", "Setter"]);
    }
}
