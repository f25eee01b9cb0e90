pub mod annotation;
pub mod codegen;
pub mod core;
pub mod decl;
pub mod error;
pub mod generators;
pub mod resolver;
pub mod scanner;
pub mod syntax;

// Re-export commonly used types for convenience
pub use annotation::{Annotation, BoundParams, ParamKind, ParamSpec, ParamValue};
pub use codegen::{BatchResult, Codegen, CodegenOptions, CodegenOptionsBuilder, CodegenResult};
pub use crate::core::{AnnotatedTarget, GenContext, GenerateOutput, Generator, GeneratorRegistry, OutputDefaults};
pub use decl::{DeclParser, FieldInfo, InterfaceInfo, MethodInfo, StructInfo};
pub use error::{DeclError, GenError, ResolveError, SyntaxError, TargetError};
pub use generators::{builtin_registry, GoFile};
pub use resolver::{find_module_root, PackageResolve, PackageResolver, ResolverConfig};
pub use scanner::{ScanOptions, ScanResult, Scanner, Target, TargetKind};
