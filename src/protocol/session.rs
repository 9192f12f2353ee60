use std::collections::BTreeMap;

use crate::args::HttpMethod;

/// Per-user transport state. Owned by exactly one virtual user.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub user_id: u64,
    /// Default headers sent with every request of this session.
    pub headers: Vec<(String, String)>,
    /// Cookie jar, merged into each request and updated from each response.
    pub cookies: BTreeMap<String, String>,
    pub(crate) client: Option<reqwest::Client>,
}

impl SessionHandle {
    #[must_use]
    pub const fn new(
        user_id: u64,
        headers: Vec<(String, String)>,
        cookies: BTreeMap<String, String>,
    ) -> Self {
        Self {
            user_id,
            headers,
            cookies,
            client: None,
        }
    }

    #[must_use]
    pub(crate) fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Cookies for one request: the jar overlaid with per-request cookies.
    #[must_use]
    pub fn cookies_for(&self, extra: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut merged = self.cookies.clone();
        merged.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    pub fn merge_cookies(&mut self, delta: &BTreeMap<String, String>) {
        self.cookies
            .extend(delta.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// Per-request overrides handed to an adapter.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Option<HttpMethod>,
    pub headers: Vec<(String, String)>,
    pub cookies: BTreeMap<String, String>,
    pub payload: Option<String>,
    pub content_type: Option<String>,
    /// Read the response body even when no validation rule needs it.
    pub capture_body: bool,
    pub max_messages: Option<usize>,
}

/// `name=value; name2=value2` for a `Cookie` header.
#[must_use]
pub(crate) fn cookie_header(cookies: &BTreeMap<String, String>) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    Some(
        cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// Extracts `name=value` from a `Set-Cookie` header, ignoring attributes.
#[must_use]
pub(crate) fn parse_set_cookie(raw: &str) -> Option<(String, String)> {
    let pair = raw.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_owned(), value.trim().to_owned()))
}
