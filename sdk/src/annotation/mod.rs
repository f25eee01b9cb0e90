//! `@Name(key=value, ...)` comment annotations and their typed parameters

pub mod params;
pub mod parser;

pub use params::{BoundParams, OUTPUT_PARAM, ParamKind, ParamSpec, ParamValue, bind, parse_list};
pub use parser::{parse_annotation, parse_annotations, strip_comment_markers};

use serde::Serialize;

/// A parsed annotation with its parameters in source order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub name: String,
    params: Vec<(String, String)>,
}

impl Annotation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Add a parameter; a repeated key replaces the earlier value in place
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key.into(), value.into());
        self
    }

    pub(crate) fn insert(&mut self, key: String, value: String) {
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key, value)),
        }
    }

    /// Get a raw parameter value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate parameters in declaration order
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}
