//! Schema-driven binding of raw annotation parameters to typed values

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use super::Annotation;
use crate::error::ParamError;

/// Parameter accepted by every generator to override its output path
pub const OUTPUT_PARAM: &str = "output";

/// Value shape expected for a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Bool,
    Int,
    List,
}

/// Declaration of one parameter a generator understands
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<&'static str>,
    pub description: &'static str,
    /// Generator specific check run on the raw value after kind coercion succeeds
    pub validator: Option<fn(&str) -> Result<(), String>>,
}

impl ParamSpec {
    pub const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
            description,
            validator: None,
        }
    }

    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            description,
            validator: None,
        }
    }

    pub const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    pub const fn with_validator(mut self, validator: fn(&str) -> Result<(), String>) -> Self {
        self.validator = Some(validator);
        self
    }
}

/// A coerced parameter value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    Bool(bool),
    Int(i64),
    List(Vec<String>),
}

/// Parameters of one annotation after binding against a generator schema
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoundParams {
    values: BTreeMap<String, ParamValue>,
}

impl BoundParams {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ParamValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ParamValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(ParamValue::Bool(true)))
    }

    /// List parameter; absent lists read as empty
    pub fn list(&self, name: &str) -> &[String] {
        match self.values.get(name) {
            Some(ParamValue::List(items)) => items,
            _ => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parse the list encoding `[a, b, c]`; empty input and `[]` give an empty list
pub fn parse_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(trimmed);

    inner
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Validate and coerce an annotation's parameters against a schema
pub fn bind(specs: &[ParamSpec], annotation: &Annotation) -> Result<BoundParams, ParamError> {
    let mut bound = BoundParams::default();

    for spec in specs {
        let raw = match annotation.get(spec.name).or(spec.default) {
            Some(raw) => raw,
            None if spec.required => {
                return Err(ParamError::Missing {
                    annotation: annotation.name.clone(),
                    name: spec.name.to_string(),
                });
            }
            None => continue,
        };

        let invalid = |reason: String| ParamError::Invalid {
            annotation: annotation.name.clone(),
            name: spec.name.to_string(),
            value: raw.to_string(),
            reason,
        };

        let value = match spec.kind {
            ParamKind::String => ParamValue::String(raw.to_string()),
            ParamKind::List => ParamValue::List(parse_list(raw)),
            ParamKind::Int => ParamValue::Int(
                raw.trim()
                    .parse::<i64>()
                    .map_err(|_| invalid("expected an integer".to_string()))?,
            ),
            ParamKind::Bool => match raw.trim() {
                "true" | "1" | "yes" => ParamValue::Bool(true),
                "false" | "0" | "no" | "" => ParamValue::Bool(false),
                _ => return Err(invalid("expected true or false".to_string())),
            },
        };

        if let Some(validator) = spec.validator {
            validator(raw.trim()).map_err(invalid)?;
        }

        bound.values.insert(spec.name.to_string(), value);
    }

    if let Some(output) = annotation.get(OUTPUT_PARAM) {
        bound
            .values
            .entry(OUTPUT_PARAM.to_string())
            .or_insert_with(|| ParamValue::String(output.to_string()));
    }

    for (key, _) in annotation.params() {
        if key != OUTPUT_PARAM && !specs.iter().any(|spec| spec.name == key) {
            warn!("@{}: ignoring unknown parameter '{}'", annotation.name, key);
        }
    }

    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positive(raw: &str) -> Result<(), String> {
        match raw.parse::<i64>() {
            Ok(v) if v > 0 => Ok(()),
            _ => Err("must be positive".to_string()),
        }
    }

    const SPECS: &[ParamSpec] = &[
        ParamSpec::required("name", ParamKind::String, "struct name"),
        ParamSpec::optional("fields", ParamKind::List, "fields to keep"),
        ParamSpec::optional("count", ParamKind::Int, "a count")
            .with_default("3")
            .with_validator(positive),
        ParamSpec::optional("strict", ParamKind::Bool, "strict mode"),
    ];

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("[A, B ,C]"), vec!["A", "B", "C"]);
        assert!(parse_list("[]").is_empty());
        assert!(parse_list("").is_empty());
        assert_eq!(parse_list("A,B"), vec!["A", "B"]);
    }

    #[test]
    fn test_bind_defaults_and_lists() {
        let ann = Annotation::new("Pick")
            .with_param("name", "Lite")
            .with_param("fields", "[ID, Name]");
        let bound = bind(SPECS, &ann).unwrap();
        assert_eq!(bound.str("name"), Some("Lite"));
        assert_eq!(bound.list("fields"), ["ID", "Name"]);
        assert_eq!(bound.int("count"), Some(3));
        assert!(!bound.bool("strict"));
    }

    #[test]
    fn test_bind_missing_required() {
        let ann = Annotation::new("Pick").with_param("fields", "[ID]");
        let err = bind(SPECS, &ann).unwrap_err();
        assert_eq!(
            err,
            ParamError::Missing {
                annotation: "Pick".to_string(),
                name: "name".to_string()
            }
        );
    }

    #[test]
    fn test_bind_validator_rejects() {
        let ann = Annotation::new("Pick")
            .with_param("name", "Lite")
            .with_param("count", "-2");
        let err = bind(SPECS, &ann).unwrap_err();
        assert!(err.to_string().contains("must be positive"));
    }

    #[test]
    fn test_bind_bad_int() {
        let ann = Annotation::new("Pick")
            .with_param("name", "Lite")
            .with_param("count", "many");
        assert!(matches!(bind(SPECS, &ann), Err(ParamError::Invalid { .. })));
    }

    #[test]
    fn test_output_is_always_accepted() {
        let ann = Annotation::new("Pick")
            .with_param("name", "Lite")
            .with_param("output", "lite_gen.go");
        let bound = bind(SPECS, &ann).unwrap();
        assert_eq!(bound.str("output"), Some("lite_gen.go"));
    }
}
