//! In-memory Go source file assembled by generators

use std::collections::BTreeMap;

use crate::error::GenError;

/// First line of every file this tool writes
pub const GENERATED_HEADER: &str = "// Code generated by gogen. DO NOT EDIT.";

/// A generated Go file: package clause, import set and declaration chunks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoFile {
    package: String,
    /// import path -> alias
    imports: BTreeMap<String, Option<String>>,
    chunks: Vec<String>,
}

impl GoFile {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ..Default::default()
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn import(&mut self, path: impl Into<String>) -> &mut Self {
        self.imports.entry(path.into()).or_insert(None);
        self
    }

    /// Import a package referenced as `qualifier`, aliasing it only when the
    /// qualifier differs from the name the package declares
    pub fn import_as(&mut self, path: impl Into<String>, qualifier: &str, declared: &str) -> &mut Self {
        let alias = (qualifier != declared && !qualifier.is_empty()).then(|| qualifier.to_string());
        let entry = self.imports.entry(path.into()).or_insert(None);
        if entry.is_none() {
            *entry = alias;
        }
        self
    }

    /// Append one top-level declaration (or group of declarations)
    pub fn push(&mut self, chunk: impl Into<String>) -> &mut Self {
        let chunk = chunk.into();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            self.chunks.push(trimmed.to_string());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Append another file's imports and declarations to this one
    pub fn merge(&mut self, other: GoFile) -> Result<(), GenError> {
        if self.package.is_empty() {
            self.package = other.package.clone();
        } else if !other.package.is_empty() && other.package != self.package {
            return Err(GenError::invalid(format!(
                "cannot merge package {} into package {}",
                other.package, self.package
            )));
        }
        for (path, alias) in other.imports {
            let entry = self.imports.entry(path).or_insert(None);
            if entry.is_none() {
                *entry = alias;
            }
        }
        self.chunks.extend(other.chunks);
        Ok(())
    }

    /// Full file text
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(GENERATED_HEADER);
        out.push_str("\n\n");
        out.push_str(&format!("package {}\n", self.package));

        let imports: Vec<String> = self
            .imports
            .iter()
            .map(|(path, alias)| match alias {
                Some(alias) => format!("{alias} \"{path}\""),
                None => format!("\"{path}\""),
            })
            .collect();
        match imports.as_slice() {
            [] => {}
            [single] => out.push_str(&format!("\nimport {single}\n")),
            many => {
                out.push_str("\nimport (\n");
                for line in many {
                    out.push_str(&format!("\t{line}\n"));
                }
                out.push_str(")\n");
            }
        }

        for chunk in &self.chunks {
            out.push('\n');
            out.push_str(chunk);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_layout() {
        let mut file = GoFile::new("shop");
        file.import("fmt")
            .import_as("example.com/shop/internal/store", "db", "storage")
            .import_as("time", "time", "time");
        file.push("type A struct{}\n\n").push("   ").push("func (A) X() {}");

        let text = file.render();
        assert!(text.starts_with(GENERATED_HEADER));
        assert!(text.contains("package shop\n\nimport (\n\tdb \"example.com/shop/internal/store\"\n\t\"fmt\"\n\t\"time\"\n)\n"));
        assert!(text.ends_with("\ntype A struct{}\n\nfunc (A) X() {}\n"));
        assert_eq!(file.chunk_count(), 2);
    }

    #[test]
    fn test_single_import_and_merge() {
        let mut a = GoFile::new("m");
        a.import("strings").push("var a = 1");
        let mut b = GoFile::new("m");
        b.import("strings").push("var b = 2");
        a.merge(b).unwrap();

        let text = a.render();
        assert!(text.contains("import \"strings\"\n"));
        assert!(text.find("var a").unwrap() < text.find("var b").unwrap());

        let err = a.merge(GoFile::new("other")).unwrap_err();
        assert!(err.to_string().contains("cannot merge"));
    }
}
