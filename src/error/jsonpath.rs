use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JsonPathError {
    #[error("JSON path is empty.")]
    Empty,
    #[error("{message}")]
    Parse { message: String },
}
