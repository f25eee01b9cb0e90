pub mod output;
pub mod plugin;
pub mod registry;

pub use output::{expand_pattern, select_pattern, write_atomic, OutputDefaults};
pub use plugin::{AnnotatedTarget, GenContext, GenerateOutput, GeneratedFile, Generator};
pub use registry::{Batch, Dispatch, GeneratorRegistry};
