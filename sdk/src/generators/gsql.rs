//! `@Gsql`: table name and column constants for gorm models

use convert_case::{Case, Casing};

use super::{add_output, align, exported_name, go_quote, GoFile};
use crate::annotation::{ParamKind, ParamSpec};
use crate::core::{AnnotatedTarget, GenContext, GenerateOutput, Generator};
use crate::decl::StructInfo;
use crate::error::GenError;
use crate::scanner::TargetKind;

const PARAMS: &[ParamSpec] = &[ParamSpec::optional(
    "table",
    ParamKind::String,
    "table name; defaults to the snake case struct name plus s",
)];

/// Default table of a model: `OrderItem` -> `order_items`
pub fn default_table_name(struct_name: &str) -> String {
    format!("{}s", struct_name.to_case(Case::Snake))
}

/// Generator for `@Gsql`
pub struct GsqlGenerator;

impl GsqlGenerator {
    fn render(&self, info: &StructInfo, table: &str) -> String {
        let mut chunks = Vec::new();

        if !info.has_method("TableName") {
            chunks.push(format!(
                "// TableName returns the table backing {name}.\nfunc ({name}) TableName() string {{\n\treturn {table}\n}}",
                name = info.name,
                table = go_quote(table)
            ));
        }

        let columns: Vec<(String, String)> = info
            .fields
            .iter()
            .filter(|f| f.tag_value("gorm") != Some("-"))
            .map(|f| (exported_name(f), f.column_name()))
            .collect();

        let decl_rows: Vec<(String, String)> = columns
            .iter()
            .map(|(field, _)| (field.clone(), "string".to_string()))
            .collect();
        let value_rows: Vec<(String, String)> = columns
            .iter()
            .map(|(field, column)| (format!("{field}:"), format!("{},", go_quote(column))))
            .collect();

        chunks.push(format!(
            "// {name}Columns holds the column names of {name}.\nvar {name}Columns = struct {{\n{decl}\n}}{{\n{values}\n}}",
            name = info.name,
            decl = align(&decl_rows, "\t"),
            values = align(&value_rows, "\t"),
        ));

        chunks.join("\n\n")
    }
}

impl Generator for GsqlGenerator {
    fn name(&self) -> &str {
        "gsql"
    }

    fn annotations(&self) -> &[&'static str] {
        &["Gsql"]
    }

    fn target_kinds(&self) -> &[TargetKind] {
        &[TargetKind::Struct]
    }

    fn params(&self) -> &[ParamSpec] {
        PARAMS
    }

    fn default_output(&self) -> &str {
        "$FILE_gsql_gen.go"
    }

    fn generate(&self, ctx: &GenContext<'_>, targets: &[AnnotatedTarget]) -> GenerateOutput {
        let mut out = GenerateOutput::default();
        let parser = ctx.parser();

        for target in targets {
            let info = match parser.parse_struct(&target.target.file_path, &target.target.name) {
                Ok(info) => info,
                Err(e) => {
                    out.errors.push(target.error(self.name(), GenError::from(e)));
                    continue;
                }
            };
            let table = target
                .params
                .str("table")
                .map(str::to_string)
                .unwrap_or_else(|| default_table_name(&info.name));

            let mut file = GoFile::new(target.target.package_name.clone());
            file.push(self.render(&info, &table));
            add_output(&mut out, self.name(), target, file);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{FieldInfo, ImportTable, MethodInfo};
    use std::path::PathBuf;

    fn field(name: &str, tag: &str, prefix: &str) -> FieldInfo {
        FieldInfo {
            name: name.to_string(),
            ty: "string".to_string(),
            tag: tag.to_string(),
            embedded_prefix: prefix.to_string(),
            ..Default::default()
        }
    }

    fn info(methods: Vec<MethodInfo>) -> StructInfo {
        StructInfo {
            name: "OrderItem".to_string(),
            package_name: "shop".to_string(),
            file_path: PathBuf::from("item.go"),
            fields: vec![
                field("ID", r#"gorm:"column:item_id""#, ""),
                field("Secret", r#"gorm:"-""#, ""),
                field("City", "", "ship_"),
            ],
            methods,
            imports: ImportTable::default(),
        }
    }

    #[test]
    fn test_default_table_name() {
        assert_eq!(default_table_name("OrderItem"), "order_items");
        assert_eq!(default_table_name("User"), "users");
    }

    #[test]
    fn test_render_columns() {
        let text = GsqlGenerator.render(&info(Vec::new()), "order_items");
        assert!(text.contains("func (OrderItem) TableName() string {\n\treturn \"order_items\"\n}"));
        assert!(text.contains("var OrderItemColumns = struct {\n\tID       string\n\tShipCity string\n}{"));
        assert!(text.contains("\tID:       \"item_id\",\n\tShipCity: \"ship_city\",\n}"));
        assert!(!text.contains("Secret"));
    }

    #[test]
    fn test_existing_table_name_method_is_kept() {
        let existing = MethodInfo {
            name: "TableName".to_string(),
            receiver_name: String::new(),
            receiver_type: "OrderItem".to_string(),
            pointer_receiver: false,
            return_type: "string".to_string(),
            file_path: PathBuf::from("item.go"),
        };
        let text = GsqlGenerator.render(&info(vec![existing]), "x");
        assert!(!text.contains("TableName()"));
    }
}
