use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Closed taxonomy of request failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    Timeout,
    Connection,
    Request,
    WsTimeout,
    WsProtocol,
    /// Protocol-level success that failed a response validation rule.
    ValidationFailed(String),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Timeout => f.write_str("timeout"),
            ErrorKind::Connection => f.write_str("connection_error"),
            ErrorKind::Request => f.write_str("request_error"),
            ErrorKind::WsTimeout => f.write_str("ws_timeout"),
            ErrorKind::WsProtocol => f.write_str("ws_protocol_error"),
            ErrorKind::ValidationFailed(reason) => write!(f, "validation_failed:{}", reason),
        }
    }
}

/// Normalized result of one request attempt. Built by a protocol adapter and
/// never mutated after it is handed to the metrics aggregator.
#[derive(Debug, Clone)]
pub struct OutcomeRecord {
    pub user_id: u64,
    pub url: String,
    pub method: String,
    pub timestamp: DateTime<Utc>,
    pub response_time: Duration,
    pub error: Option<ErrorKind>,
    pub status: Option<u16>,
    pub body: Option<Vec<u8>>,
    pub content_length: u64,
    /// Response headers keyed by lowercase name.
    pub headers: BTreeMap<String, String>,
    /// Cookies set by this response.
    pub cookies: BTreeMap<String, String>,
}

impl OutcomeRecord {
    #[must_use]
    pub fn new(user_id: u64, url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            user_id,
            url: url.into(),
            method: method.into(),
            timestamp: Utc::now(),
            response_time: Duration::ZERO,
            error: None,
            status: None,
            body: None,
            content_length: 0,
            headers: BTreeMap::new(),
            cookies: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_error(mut self, kind: ErrorKind, response_time: Duration) -> Self {
        self.error = Some(kind);
        self.response_time = response_time;
        self
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn body_text(&self) -> Option<Cow<'_, str>> {
        self.body.as_deref().map(String::from_utf8_lossy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_labels_match_report_keys() -> Result<(), String> {
        let cases = [
            (ErrorKind::Timeout, "timeout"),
            (ErrorKind::Connection, "connection_error"),
            (ErrorKind::Request, "request_error"),
            (ErrorKind::WsTimeout, "ws_timeout"),
            (ErrorKind::WsProtocol, "ws_protocol_error"),
            (
                ErrorKind::ValidationFailed("status_code:500!=200".to_owned()),
                "validation_failed:status_code:500!=200",
            ),
        ];
        for (kind, expected) in cases {
            if kind.to_string() != expected {
                return Err(format!("{:?} rendered as {}", kind, kind));
            }
        }
        Ok(())
    }

    #[test]
    fn header_lookup_ignores_case() -> Result<(), String> {
        let mut record = OutcomeRecord::new(1, "http://h/", "GET");
        record
            .headers
            .insert("x-request-id".to_owned(), "abc".to_owned());
        if record.header("X-Request-Id") != Some("abc") {
            return Err("Expected case-insensitive header match".to_owned());
        }
        if record.is_error() {
            return Err("Fresh record should not be an error".to_owned());
        }
        Ok(())
    }
}
