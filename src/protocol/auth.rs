use base64::Engine as _;

use crate::config::{Auth, LoadTestSettings};

/// Default headers for a new session: configured headers (already carrying a
/// `User-Agent`), then the authentication header.
pub(crate) fn session_headers(settings: &LoadTestSettings) -> Vec<(String, String)> {
    let mut headers = settings.headers.clone();
    if let Some(auth) = auth_header(&settings.auth) {
        headers.retain(|(name, _)| !name.eq_ignore_ascii_case(&auth.0));
        headers.push(auth);
    }
    headers
}

pub(crate) fn auth_header(auth: &Auth) -> Option<(String, String)> {
    match auth {
        Auth::None => None,
        Auth::Basic { username, password } => {
            let token = format!("{}:{}", username, password);
            let encoded = base64::engine::general_purpose::STANDARD.encode(token.as_bytes());
            Some(("Authorization".to_owned(), format!("Basic {}", encoded)))
        }
        Auth::Bearer { token } => Some(("Authorization".to_owned(), format!("Bearer {}", token))),
        Auth::Custom { name, value } => Some((name.clone(), value.clone())),
    }
}
