mod app;
mod config;
mod jsonpath;
mod protocol;
mod report;
mod scenario;
mod validation;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use jsonpath::JsonPathError;
pub use protocol::ProtocolError;
pub use report::ReportError;
pub use scenario::ScenarioError;
pub use validation::ValidationError;
