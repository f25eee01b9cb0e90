//! `@Setter`: chainable setters for struct fields

use std::collections::HashSet;

use tracing::debug;

use super::{add_output, exported_name, import_field, lower_first, GoFile};
use crate::annotation::{ParamKind, ParamSpec};
use crate::core::{AnnotatedTarget, GenContext, GenerateOutput, Generator};
use crate::decl::{FieldInfo, StructInfo};
use crate::error::GenError;
use crate::scanner::TargetKind;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::optional("prefix", ParamKind::String, "setter name prefix").with_default("Set"),
    ParamSpec::optional("fields", ParamKind::List, "fields to generate setters for; all when empty"),
];

/// Generator for `@Setter`
pub struct SetterGenerator;

/// Receiver name used by the struct's existing methods, else its lowercased initial
pub fn receiver_name(info: &StructInfo) -> String {
    info.methods
        .iter()
        .map(|m| m.receiver_name.as_str())
        .find(|name| !name.is_empty() && *name != "_")
        .map(str::to_string)
        .unwrap_or_else(|| lower_first(&info.name.chars().take(1).collect::<String>()))
}

fn setter_suffix(field: &FieldInfo) -> String {
    exported_name(field)
}

impl SetterGenerator {
    fn setters(&self, ctx: &GenContext<'_>, target: &AnnotatedTarget) -> Result<GoFile, GenError> {
        let info = ctx.parser().parse_struct(&target.target.file_path, &target.target.name)?;
        let prefix = target.params.str("prefix").unwrap_or("Set");
        let wanted = target.params.list("fields");

        let fields: Vec<&FieldInfo> = if wanted.is_empty() {
            info.fields.iter().collect()
        } else {
            wanted
                .iter()
                .map(|name| {
                    info.fields
                        .iter()
                        .find(|f| f.name == *name || setter_suffix(f) == *name)
                        .ok_or_else(|| GenError::invalid(format!("unknown field '{name}'")))
                })
                .collect::<Result<_, _>>()?
        };

        let receiver = receiver_name(&info);
        let value = if receiver == "v" { "value" } else { "v" };
        let mut file = GoFile::new(target.target.package_name.clone());
        let mut emitted = HashSet::new();

        for field in fields {
            let method = format!("{}{}", prefix, setter_suffix(field));
            if info.has_method(&method) {
                debug!("{}.{} already declared, skipping setter", info.name, method);
                continue;
            }
            if !emitted.insert(method.clone()) {
                continue;
            }
            import_field(ctx, &mut file, field);
            file.push(format!(
                "// {method} sets {field} and returns the receiver.\nfunc ({receiver} *{ty}) {method}({value} {field_ty}) *{ty} {{\n\t{path} = {value}\n\treturn {receiver}\n}}",
                field = field.prefixed_name(),
                ty = info.name,
                field_ty = field.ty,
                path = field.access_path(&receiver),
            ));
        }

        Ok(file)
    }
}

impl Generator for SetterGenerator {
    fn name(&self) -> &str {
        "setter"
    }

    fn annotations(&self) -> &[&'static str] {
        &["Setter"]
    }

    fn target_kinds(&self) -> &[TargetKind] {
        &[TargetKind::Struct]
    }

    fn params(&self) -> &[ParamSpec] {
        PARAMS
    }

    fn default_output(&self) -> &str {
        "$FILE_setter_gen.go"
    }

    fn generate(&self, ctx: &GenContext<'_>, targets: &[AnnotatedTarget]) -> GenerateOutput {
        let mut out = GenerateOutput::default();
        for target in targets {
            match self.setters(ctx, target) {
                Ok(file) if file.is_empty() => {
                    debug!("No setters left to generate for {}", target.target.name);
                }
                Ok(file) => add_output(&mut out, self.name(), target, file),
                Err(e) => out.errors.push(target.error(self.name(), e)),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{ImportTable, MethodInfo};
    use std::path::PathBuf;

    fn info(receivers: &[&str]) -> StructInfo {
        StructInfo {
            name: "Account".to_string(),
            package_name: "bank".to_string(),
            file_path: PathBuf::from("account.go"),
            fields: Vec::new(),
            methods: receivers
                .iter()
                .map(|r| MethodInfo {
                    name: "Balance".to_string(),
                    receiver_name: r.to_string(),
                    receiver_type: "Account".to_string(),
                    pointer_receiver: true,
                    return_type: "int".to_string(),
                    file_path: PathBuf::from("account.go"),
                })
                .collect(),
            imports: ImportTable::default(),
        }
    }

    #[test]
    fn test_receiver_name() {
        assert_eq!(receiver_name(&info(&[])), "a");
        assert_eq!(receiver_name(&info(&["acct"])), "acct");
        assert_eq!(receiver_name(&info(&["", "_", "x"])), "x");
    }
}
