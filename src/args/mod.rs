//! CLI argument types and parsing helpers.
mod cli;
mod defaults;
pub(crate) mod parsers;
mod types;


pub use cli::SurgeArgs;
pub use types::{
    AuthType, HttpMethod, OutputFormat, PositiveU64, PositiveUsize, Protocol, ScenarioKind,
    TestMode, UrlMode,
};

pub(crate) use defaults::{DEFAULT_CONFIG_FILES, DEFAULT_PATHS, DEFAULT_USER_AGENT};
pub(crate) use parsers::{parse_cookie, parse_header};
