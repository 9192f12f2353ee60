//! Configuration loading, merging, and validation.
mod apply;
mod loader;
pub mod settings;
pub mod types;


pub use apply::apply_config;
pub use loader::load_config;
pub use settings::{Auth, LoadTestSettings, ThinkTime};

#[cfg(test)]
pub(crate) use loader::load_config_file;
