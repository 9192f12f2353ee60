use super::{JsonPathError, ValidationError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to parse JSON config '{path}': {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unsupported config extension '{ext}'. Use .toml or .json.")]
    UnsupportedExtension { ext: String },
    #[error("Config file must have .toml or .json extension.")]
    MissingExtension,
    #[error("Missing target URL (pass it as an argument or set 'url' in config).")]
    MissingUrl,
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("URL scheme must be http, https, ws, or wss (got '{scheme}').")]
    UnsupportedScheme { scheme: String },
    #[error("URL '{url}' must include a hostname.")]
    MissingHost { url: String },
    #[error("Config '{field}' must be >= 1: {source}")]
    FieldMustBePositive {
        field: String,
        #[source]
        source: ValidationError,
    },
    #[error("Minimum think time cannot be negative.")]
    ThinkTimeNegative,
    #[error("Think time bounds must be finite numbers.")]
    ThinkTimeNotFinite,
    #[error("Maximum think time ({max}) must be >= minimum think time ({min}).")]
    ThinkTimeBounds { min: f64, max: f64 },
    #[error("Workflow file must be specified for the workflow scenario.")]
    WorkflowMissing,
    #[error("Failed to read workflow file '{path}': {source}")]
    ReadWorkflow {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in workflow file '{path}': {source}")]
    ParseWorkflow {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Workflow must contain a non-empty list of steps.")]
    EmptyWorkflow,
    #[error("Workflow step {index} must include a URL in exact URL mode.")]
    WorkflowStepMissingUrl { index: usize },
    #[error("Failed to read payload file '{path}': {source}")]
    ReadPayload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Basic authentication requires username and password.")]
    BasicAuthIncomplete,
    #[error("Bearer authentication requires a token.")]
    BearerTokenMissing,
    #[error("Custom authentication requires a header in 'Name: Value' format.")]
    CustomAuthHeaderMissing,
    #[error("Invalid custom auth header: {source}")]
    InvalidAuthHeader {
        #[source]
        source: ValidationError,
    },
    #[error("Invalid header: {source}")]
    InvalidHeader {
        #[source]
        source: ValidationError,
    },
    #[error("Invalid cookie: {source}")]
    InvalidCookie {
        #[source]
        source: ValidationError,
    },
    #[error("Invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Invalid JSON path '{path}': {source}")]
    InvalidJsonPath {
        path: String,
        #[source]
        source: JsonPathError,
    },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
