//! JSON path queries over `serde_json::Value`, backed by `serde_json_path`.
//!
//! Expressions follow RFC 9535 (recursive descent, slices, filters). A
//! leading bare key (`data.id`) or bracket (`['id']`) is accepted as if it
//! were rooted at `$`.
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::JsonPathError;

#[derive(Debug, Clone)]
pub struct JsonPath {
    source: String,
    query: serde_json_path::JsonPath,
}

impl JsonPath {
    /// Parses a path expression.
    ///
    /// # Errors
    ///
    /// Returns an error for empty input or an expression the query parser
    /// rejects.
    pub fn parse(expr: &str) -> Result<Self, JsonPathError> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(JsonPathError::Empty);
        }
        let rooted = rooted(trimmed);
        let query = serde_json_path::JsonPath::parse(&rooted).map_err(|err| {
            JsonPathError::Parse {
                message: err.to_string(),
            }
        })?;
        Ok(Self {
            source: trimmed.to_owned(),
            query,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns every value matched by the path, in document order.
    #[must_use]
    pub fn find<'doc>(&self, root: &'doc Value) -> Vec<&'doc Value> {
        self.query.query(root).all()
    }

    /// First match, if any.
    #[must_use]
    pub fn first<'doc>(&self, root: &'doc Value) -> Option<&'doc Value> {
        self.query.query(root).first()
    }
}

impl FromStr for JsonPath {
    type Err = JsonPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JsonPath::parse(s)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn rooted(expr: &str) -> String {
    if expr.starts_with('$') {
        expr.to_owned()
    } else if expr.starts_with('[') {
        format!("${}", expr)
    } else {
        format!("$.{}", expr)
    }
}
