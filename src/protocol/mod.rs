//! Transport adapters: one session per virtual user, one normalized
//! [`OutcomeRecord`] per request.
mod auth;
mod http;
mod outcome;
mod session;
mod traits;
mod validation;
mod websocket;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::args::Protocol;
use crate::config::LoadTestSettings;

pub use http::HttpAdapter;
pub use outcome::{ErrorKind, OutcomeRecord};
pub use session::{RequestOptions, SessionHandle};
pub use traits::ProtocolAdapter;
pub use validation::ResponseValidation;
pub use websocket::WebSocketAdapter;

/// Selects the adapter for the configured protocol.
#[must_use]
pub fn build_adapter(settings: &Arc<LoadTestSettings>) -> Arc<dyn ProtocolAdapter> {
    match settings.protocol {
        Protocol::Http => Arc::new(HttpAdapter::new(Arc::clone(settings))),
        Protocol::Websocket => Arc::new(WebSocketAdapter::new(Arc::clone(settings))),
    }
}
