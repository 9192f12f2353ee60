use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid header format '{value}'. Expected 'Name: Value'.")]
    InvalidHeaderFormat { value: String },
    #[error("Invalid cookie format '{value}'. Expected 'name=value'.")]
    InvalidCookieFormat { value: String },
    #[error("Invalid boolean '{value}'. Use true/false, yes/no, on/off, or 1/0.")]
    InvalidBoolean { value: String },
    #[error("Value must be >= {min}.")]
    ValueTooSmall { min: u64 },
    #[error("Invalid number: {source}")]
    InvalidNumber {
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Invalid number: {source}")]
    InvalidFloat {
        #[source]
        source: std::num::ParseFloatError,
    },
    #[error("Value must be a finite, non-negative number (got {value}).")]
    InvalidSeconds { value: f64 },
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
