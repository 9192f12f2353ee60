use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::time::{Instant, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::Message;

use crate::args::Protocol;
use crate::config::LoadTestSettings;
use crate::error::ProtocolError;

use super::auth::session_headers;
use super::http::log_sampled;
use super::outcome::{ErrorKind, OutcomeRecord};
use super::session::{RequestOptions, SessionHandle, cookie_header};
use super::traits::ProtocolAdapter;

const WS_METHOD: &str = "WEBSOCKET";

pub struct WebSocketAdapter {
    settings: Arc<LoadTestSettings>,
}

impl WebSocketAdapter {
    #[must_use]
    pub const fn new(settings: Arc<LoadTestSettings>) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl ProtocolAdapter for WebSocketAdapter {
    fn protocol(&self) -> Protocol {
        Protocol::Websocket
    }

    async fn create_session(&self, user_id: u64) -> Result<SessionHandle, ProtocolError> {
        let headers = session_headers(&self.settings);
        let cookies = self.settings.cookies.iter().cloned().collect();
        Ok(SessionHandle::new(user_id, headers, cookies))
    }

    async fn request(
        &self,
        session: &mut SessionHandle,
        url: &str,
        user_id: u64,
        options: &RequestOptions,
    ) -> OutcomeRecord {
        let mut record = OutcomeRecord::new(user_id, url, WS_METHOD);
        let start = Instant::now();
        let request_timeout = self.settings.timeout;

        let Some(handshake) = build_handshake(url, session, options) else {
            return record.with_error(ErrorKind::Request, start.elapsed());
        };

        let (mut stream, response) =
            match timeout(request_timeout, connect_async(handshake)).await {
                Ok(Ok(pair)) => pair,
                Ok(Err(_connect_err)) => {
                    return record.with_error(ErrorKind::Connection, start.elapsed());
                }
                Err(_elapsed) => return record.with_error(ErrorKind::Timeout, start.elapsed()),
            };
        record.status = Some(response.status().as_u16());
        for (name, value) in response.headers() {
            if let Ok(text) = value.to_str() {
                record
                    .headers
                    .insert(name.as_str().to_owned(), text.to_owned());
            }
        }

        let payload = options
            .payload
            .as_deref()
            .or(self.settings.payload.as_deref())
            .filter(|payload| !payload.is_empty());
        if let Some(payload) = payload {
            let content_type = options
                .content_type
                .as_deref()
                .unwrap_or(&self.settings.content_type);
            match timeout(request_timeout, stream.send(encode_message(payload, content_type))).await
            {
                Ok(Ok(())) => {}
                Ok(Err(_send_err)) => record.error = Some(ErrorKind::WsProtocol),
                Err(_elapsed) => record.error = Some(ErrorKind::WsTimeout),
            }
        }

        let max_messages = options
            .max_messages
            .unwrap_or(self.settings.ws_max_messages);
        let mut messages: Vec<Vec<u8>> = Vec::new();
        while record.error.is_none() && messages.len() < max_messages {
            match timeout(request_timeout, stream.next()).await {
                Ok(Some(Ok(Message::Text(text)))) => messages.push(text.into_bytes()),
                Ok(Some(Ok(Message::Binary(data)))) => messages.push(data),
                Ok(Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)))) => {}
                Ok(Some(Ok(Message::Close(_))) | None) => break,
                Ok(Some(Err(_protocol_err))) => record.error = Some(ErrorKind::WsProtocol),
                Err(_elapsed) => record.error = Some(ErrorKind::WsTimeout),
            }
        }

        record.response_time = start.elapsed();
        if !messages.is_empty() {
            let body = messages.join(&b'\n');
            record.content_length = u64::try_from(body.len()).unwrap_or(u64::MAX);
            record.body = Some(body);
        }

        drop(stream.close(None).await);
        if self.settings.verbose {
            log_sampled(&record);
        }
        record
    }
}

fn build_handshake(url: &str, session: &SessionHandle, options: &RequestOptions) -> Option<Request> {
    let mut request = url.into_client_request().ok()?;
    let headers = request.headers_mut();
    for (name, value) in session.headers.iter().chain(options.headers.iter()) {
        let name = HeaderName::from_bytes(name.as_bytes()).ok()?;
        let value = HeaderValue::from_str(value).ok()?;
        headers.append(name, value);
    }
    if let Some(cookies) = cookie_header(&session.cookies_for(&options.cookies)) {
        headers.append("cookie", HeaderValue::from_str(&cookies).ok()?);
    }
    Some(request)
}

fn encode_message(payload: &str, content_type: &str) -> Message {
    match content_type {
        "application/json" => match serde_json::from_str::<Value>(payload) {
            Ok(json) => Message::Text(json.to_string()),
            Err(_not_json) => Message::Text(payload.to_owned()),
        },
        "application/octet-stream" => Message::Binary(payload.as_bytes().to_vec()),
        _ => Message::Text(payload.to_owned()),
    }
}
