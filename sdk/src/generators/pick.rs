//! `@Pick`: a struct holding a subset of another struct's fields

use std::collections::HashSet;

use tracing::debug;

use super::{add_output, align, exported_name, import_field, resolve_source, GoFile, SourceRef};
use crate::annotation::{ParamKind, ParamSpec};
use crate::core::{AnnotatedTarget, GenContext, GenerateOutput, Generator};
use crate::decl::{FieldInfo, StructInfo};
use crate::error::GenError;
use crate::scanner::TargetKind;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required("name", ParamKind::String, "name of the generated struct"),
    ParamSpec::optional("fields", ParamKind::List, "fields to keep; all fields when empty"),
    ParamSpec::optional("omit", ParamKind::List, "fields to drop"),
    ParamSpec::optional("source", ParamKind::String, "struct to pick from (Type, pkg.Type or import/path.Type)"),
];

/// Generator for `@Pick`
pub struct PickGenerator;

/// Name of a picked field in the generated struct
fn picked_name(field: &FieldInfo) -> String {
    if field.embedded_prefix.is_empty() {
        field.name.clone()
    } else {
        exported_name(field)
    }
}

fn matches(field: &FieldInfo, wanted: &str) -> bool {
    field.name == wanted || picked_name(field) == wanted
}

/// Apply `fields` then `omit` to the source fields, keeping the requested order
pub fn select_fields<'a>(
    fields: &'a [FieldInfo],
    keep: &[String],
    omit: &[String],
) -> Result<Vec<&'a FieldInfo>, GenError> {
    let mut selected: Vec<&FieldInfo> = if keep.is_empty() {
        fields.iter().collect()
    } else {
        let mut picked = Vec::with_capacity(keep.len());
        for wanted in keep {
            let field = fields
                .iter()
                .find(|f| matches(f, wanted))
                .ok_or_else(|| GenError::invalid(format!("unknown field '{wanted}'")))?;
            if !picked.iter().any(|p: &&FieldInfo| std::ptr::eq(*p, field)) {
                picked.push(field);
            }
        }
        picked
    };

    for dropped in omit {
        if !fields.iter().any(|f| matches(f, dropped)) {
            return Err(GenError::invalid(format!("unknown field '{dropped}' in omit")));
        }
        selected.retain(|f| !matches(f, dropped));
    }

    let mut seen = HashSet::new();
    for field in &selected {
        let name = picked_name(field);
        if !seen.insert(name.clone()) {
            return Err(GenError::invalid(format!("field '{name}' is picked twice")));
        }
    }
    Ok(selected)
}

impl PickGenerator {
    fn load(&self, ctx: &GenContext<'_>, target: &AnnotatedTarget) -> Result<(StructInfo, SourceRef), GenError> {
        let parser = ctx.parser();
        let file = &target.target.file_path;

        if target.target.kind != TargetKind::Comment {
            let info = parser.parse_struct(file, &target.target.name)?;
            let source = SourceRef {
                dir: target.target.dir(),
                type_name: info.name.clone(),
                package: None,
            };
            return Ok((info, source));
        }

        let name = target
            .params
            .str("source")
            .ok_or_else(|| GenError::invalid("@Pick on a comment needs source="))?;
        let source = resolve_source(ctx, file, name)?;
        let info = match &source.package {
            Some((qualifier, path)) => parser.find_foreign_struct(&source.dir, &source.type_name, qualifier, path)?,
            None => parser.find_struct(&source.dir, &source.type_name)?,
        };
        Ok((info, source))
    }

    fn pick(&self, ctx: &GenContext<'_>, target: &AnnotatedTarget) -> Result<GoFile, GenError> {
        let name = target
            .params
            .str("name")
            .ok_or_else(|| GenError::invalid("missing name"))?;
        let (info, source) = self.load(ctx, target)?;
        let fields = select_fields(&info.fields, target.params.list("fields"), target.params.list("omit"))?;

        let mut file = GoFile::new(target.target.package_name.clone());
        if let Some((qualifier, path)) = &source.package {
            let declared = ctx.resolver.package_name(path);
            file.import_as(path.clone(), qualifier, &declared);
        }

        let decl_rows: Vec<(String, String)> = fields
            .iter()
            .map(|f| {
                import_field(ctx, &mut file, f);
                let ty = if f.tag.is_empty() {
                    f.ty.clone()
                } else {
                    format!("{} `{}`", f.ty, f.tag)
                };
                (picked_name(f), ty)
            })
            .collect();
        let value_rows: Vec<(String, String)> = fields
            .iter()
            .map(|f| (format!("{}:", picked_name(f)), format!("{},", f.access_path("src"))))
            .collect();

        let src_type = source.type_expr();
        file.push(format!(
            "// {name} is picked from {src_type}.\ntype {name} struct {{\n{}\n}}",
            align(&decl_rows, "\t")
        ));
        file.push(format!(
            "// New{name}From copies the picked fields of src.\nfunc New{name}From(src *{src_type}) *{name} {{\n\tif src == nil {{\n\t\treturn nil\n\t}}\n\treturn &{name}{{\n{}\n\t}}\n}}",
            align(&value_rows, "\t\t")
        ));

        debug!("Picked {} of {} fields from {} into {}", fields.len(), info.fields.len(), src_type, name);
        Ok(file)
    }
}

impl Generator for PickGenerator {
    fn name(&self) -> &str {
        "pick"
    }

    fn annotations(&self) -> &[&'static str] {
        &["Pick"]
    }

    fn target_kinds(&self) -> &[TargetKind] {
        &[TargetKind::Struct, TargetKind::Comment]
    }

    fn params(&self) -> &[ParamSpec] {
        PARAMS
    }

    fn default_output(&self) -> &str {
        "$FILE_pick_gen.go"
    }

    fn generate(&self, ctx: &GenContext<'_>, targets: &[AnnotatedTarget]) -> GenerateOutput {
        let mut out = GenerateOutput::default();
        for target in targets {
            match self.pick(ctx, target) {
                Ok(file) => add_output(&mut out, self.name(), target, file),
                Err(e) => out.errors.push(target.error(self.name(), e)),
            }
        }
        out
    }
}
