//! `@Mock`: function-field test doubles for interfaces

use tracing::debug;

use super::{add_output, align, resolve_source, GoFile, SourceRef};
use crate::annotation::{ParamKind, ParamSpec};
use crate::core::{AnnotatedTarget, GenContext, GenerateOutput, Generator};
use crate::decl::interfaces::format_signature;
use crate::decl::{InterfaceInfo, InterfaceMethod};
use crate::error::GenError;
use crate::scanner::TargetKind;
use crate::syntax::Param;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::optional("name", ParamKind::String, "mock type name; defaults to Mock<Interface>"),
    ParamSpec::optional("source", ParamKind::String, "interface to mock (Type, pkg.Type or import/path.Type)"),
];

/// Generator for `@Mock`
pub struct MockGenerator;

/// Parameters with every entry named, so the mock can forward them
fn named_params(params: &[Param]) -> Vec<Param> {
    params
        .iter()
        .enumerate()
        .map(|(i, p)| Param {
            name: match p.name.as_deref() {
                Some(name) if name != "_" => Some(name.to_string()),
                _ => Some(format!("a{i}")),
            },
            ty: p.ty.clone(),
            variadic: p.variadic,
        })
        .collect()
}

fn pick_receiver(params: &[Param]) -> &'static str {
    if params.iter().any(|p| p.name.as_deref() == Some("m")) {
        "mock"
    } else {
        "m"
    }
}

/// Delegating method forwarding to the `<Method>Func` field
pub fn render_method(mock: &str, method: &InterfaceMethod) -> String {
    let params = named_params(&method.params);
    let receiver = pick_receiver(&params);
    let signature = format_signature(&params, &method.results);
    let args = params
        .iter()
        .map(|p| {
            let name = p.name.clone().unwrap_or_default();
            if p.variadic {
                format!("{name}...")
            } else {
                name
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    let call = format!("{receiver}.{}Func({args})", method.name);
    let body = if method.results.is_empty() {
        call
    } else {
        format!("return {call}")
    };

    format!(
        "func ({receiver} *{mock}) {name}{signature} {{\n\tif {receiver}.{name}Func == nil {{\n\t\tpanic(\"{mock}.{name} called without {name}Func\")\n\t}}\n\t{body}\n}}",
        name = method.name,
    )
}

impl MockGenerator {
    fn load(&self, ctx: &GenContext<'_>, target: &AnnotatedTarget) -> Result<(InterfaceInfo, SourceRef), GenError> {
        let parser = ctx.parser();
        let file = &target.target.file_path;

        if target.target.kind != TargetKind::Comment {
            let info = parser.parse_interface(file, &target.target.name)?;
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
            .ok_or_else(|| GenError::invalid("@Mock on a comment needs source="))?;
        let source = resolve_source(ctx, file, name)?;
        let info = match &source.package {
            Some((qualifier, path)) => {
                parser.find_foreign_interface(&source.dir, &source.type_name, qualifier, path)?
            }
            None => parser.find_interface(&source.dir, &source.type_name)?,
        };
        Ok((info, source))
    }

    fn mock(&self, ctx: &GenContext<'_>, target: &AnnotatedTarget) -> Result<GoFile, GenError> {
        let (info, source) = self.load(ctx, target)?;
        let name = target
            .params
            .str("name")
            .map(str::to_string)
            .unwrap_or_else(|| format!("Mock{}", info.name));

        let mut file = GoFile::new(target.target.package_name.clone());
        if let Some((qualifier, path)) = &source.package {
            let declared = ctx.resolver.package_name(path);
            file.import_as(path.clone(), qualifier, &declared);
        }
        for method in &info.methods {
            for (qualifier, path) in &method.packages {
                let declared = ctx.resolver.package_name(path);
                file.import_as(path.clone(), qualifier, &declared);
            }
        }

        let fields: Vec<(String, String)> = info
            .methods
            .iter()
            .map(|m| {
                let params = named_params(&m.params);
                (
                    format!("{}Func", m.name),
                    format!("func{}", format_signature(&params, &m.results)),
                )
            })
            .collect();

        let iface = source.type_expr();
        file.push(format!(
            "// {name} implements {iface} by delegating to its function fields.\ntype {name} struct {{\n{}\n}}",
            align(&fields, "\t")
        ));
        file.push(format!("var _ {iface} = (*{name})(nil)"));
        for method in &info.methods {
            file.push(render_method(&name, method));
        }

        debug!("Mocked {} with {} methods as {}", iface, info.methods.len(), name);
        Ok(file)
    }
}

impl Generator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    fn annotations(&self) -> &[&'static str] {
        &["Mock"]
    }

    fn target_kinds(&self) -> &[TargetKind] {
        &[TargetKind::Interface, TargetKind::Comment]
    }

    fn params(&self) -> &[ParamSpec] {
        PARAMS
    }

    fn default_output(&self) -> &str {
        "$FILE_mock_gen.go"
    }

    fn generate(&self, ctx: &GenContext<'_>, targets: &[AnnotatedTarget]) -> GenerateOutput {
        let mut out = GenerateOutput::default();
        for target in targets {
            match self.mock(ctx, target) {
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

    fn param(name: Option<&str>, ty: &str, variadic: bool) -> Param {
        Param {
            name: name.map(str::to_string),
            ty: ty.to_string(),
            variadic,
        }
    }

    fn method(name: &str, params: Vec<Param>, results: Vec<Param>) -> InterfaceMethod {
        let signature = format_signature(&params, &results);
        InterfaceMethod {
            name: name.to_string(),
            params,
            results,
            signature,
            packages: Vec::new(),
        }
    }

    #[test]
    fn test_render_method_with_results() {
        let m = method(
            "Find",
            vec![param(Some("ctx"), "context.Context", false), param(None, "string", true)],
            vec![param(None, "*User", false), param(None, "error", false)],
        );
        let text = render_method("MockStore", &m);
        assert!(text.starts_with(
            "func (m *MockStore) Find(ctx context.Context, a1 ...string) (*User, error) {\n"
        ));
        assert!(text.contains("\treturn m.FindFunc(ctx, a1...)\n}"));
        assert!(text.contains("panic(\"MockStore.Find called without FindFunc\")"));
    }

    #[test]
    fn test_render_method_without_results() {
        let m = method("Close", vec![param(Some("m"), "int", false)], Vec::new());
        let text = render_method("MockCloser", &m);
        assert!(text.starts_with("func (mock *MockCloser) Close(m int) {\n"));
        assert!(text.contains("\n\tmock.CloseFunc(m)\n}"));
        assert!(!text.contains("return"));
    }
}
