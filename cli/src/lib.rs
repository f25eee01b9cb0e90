//! gogen CLI library
//!
//! Programmatic access to the `gen` and `dev` commands, the project
//! configuration and Go environment discovery they share.

pub mod commands;
pub mod utils;

// Re-export command types for advanced usage
pub use commands::{dev::DevCommand, generate::GenCommand, Command};
pub use utils::config::{ConfigManager, GeneratorConfig, GogenConfig};
pub use utils::go_env::GoEnv;

/// Initialize logging based on the verbose flag.
/// `RUST_LOG` wins when set; an already installed subscriber is left alone.
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    // a subscriber installed by an embedding program stays in place
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()),
        )
        .with_target(false)
        .with_line_number(verbose)
        .with_file(verbose)
        .try_init();
}
