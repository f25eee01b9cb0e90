pub mod config;
pub mod go_env;
pub mod patterns;
pub mod watcher;
