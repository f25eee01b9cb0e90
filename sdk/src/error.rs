//! Error types shared across the generation pipeline

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Errors raised while setting up package resolution
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Go standard library root not found at '{path}' (set GOROOT or `goroot` in gogen.yaml)")]
    GoRootNotFound { path: PathBuf },

    #[error("Failed to read module file '{path}': {reason}")]
    ModuleFile { path: PathBuf, reason: String },
}

/// Errors raised when parsing Go source into a syntax tree
#[derive(Error, Debug)]
pub enum SyntaxError {
    #[error("Failed to load Go grammar: {0}")]
    Language(String),

    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parser produced no tree for '{path}'")]
    NoTree { path: PathBuf },

    #[error("Syntax error in '{path}' near line {line}")]
    Invalid { path: PathBuf, line: usize },
}

/// Errors raised while extracting struct or interface declarations
#[derive(Error, Debug)]
pub enum DeclError {
    #[error("Declaration '{name}' not found in {location}")]
    NotFound { name: String, location: String },

    #[error("'{name}' is not a struct type")]
    NotStruct { name: String },

    #[error("'{name}' is not an interface type")]
    NotInterface { name: String },

    #[error("Cannot resolve embedded type '{ty}' referenced from '{owner}'")]
    UnresolvedType { ty: String, owner: String },

    #[error("Embedding depth exceeded {limit} while expanding '{ty}'")]
    DepthExceeded { ty: String, limit: usize },

    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

/// Errors raised when projecting annotation parameters onto a generator schema
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    #[error("@{annotation}: missing required parameter '{name}'")]
    Missing { annotation: String, name: String },

    #[error("@{annotation}: invalid value '{value}' for '{name}': {reason}")]
    Invalid {
        annotation: String,
        name: String,
        value: String,
        reason: String,
    },
}

/// Top level error for a single generator target
#[derive(Error, Debug)]
pub enum GenError {
    #[error(transparent)]
    Param(#[from] ParamError),

    #[error(transparent)]
    Decl(#[from] DeclError),

    #[error("{0}")]
    Invalid(String),
}

impl GenError {
    pub fn invalid(message: impl Into<String>) -> Self {
        GenError::Invalid(message.into())
    }
}

/// A failure tied to one annotated target, reported alongside successful output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetError {
    pub generator: String,
    pub file: PathBuf,
    pub target: String,
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for TargetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {}:{} {}: {}",
            self.generator,
            self.file.display(),
            self.line,
            self.target,
            self.message
        )
    }
}
