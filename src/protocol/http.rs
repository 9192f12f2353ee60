use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{COOKIE, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, SET_COOKIE};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tokio::time::Instant;

use crate::args::Protocol;
use crate::config::LoadTestSettings;
use crate::error::ProtocolError;

use super::auth::session_headers;
use super::outcome::{ErrorKind, OutcomeRecord};
use super::session::{RequestOptions, SessionHandle, cookie_header, parse_set_cookie};
use super::traits::ProtocolAdapter;

const JSON_CONTENT_TYPE: &str = "application/json";

pub struct HttpAdapter {
    settings: Arc<LoadTestSettings>,
}

impl HttpAdapter {
    #[must_use]
    pub const fn new(settings: Arc<LoadTestSettings>) -> Self {
        Self { settings }
    }

    fn build_client(&self, headers: &[(String, String)]) -> Result<Client, ProtocolError> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_invalid| {
                ProtocolError::InvalidHeaderName { name: name.clone() }
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|_invalid| {
                ProtocolError::InvalidHeaderValue { name: name.clone() }
            })?;
            default_headers.append(header_name, header_value);
        }

        let per_user = self
            .settings
            .max_connections
            .checked_div(self.settings.num_users)
            .unwrap_or(self.settings.max_connections)
            .max(1);

        Client::builder()
            .default_headers(default_headers)
            .timeout(self.settings.timeout)
            .pool_max_idle_per_host(self.settings.connections_per_host.min(per_user))
            .build()
            .map_err(|err| ProtocolError::BuildClient { source: err })
    }
}

#[async_trait]
impl ProtocolAdapter for HttpAdapter {
    fn protocol(&self) -> Protocol {
        Protocol::Http
    }

    async fn create_session(&self, user_id: u64) -> Result<SessionHandle, ProtocolError> {
        let headers = session_headers(&self.settings);
        let client = self.build_client(&headers)?;
        let cookies = self.settings.cookies.iter().cloned().collect();
        Ok(SessionHandle::new(user_id, headers, cookies).with_client(client))
    }

    async fn request(
        &self,
        session: &mut SessionHandle,
        url: &str,
        user_id: u64,
        options: &RequestOptions,
    ) -> OutcomeRecord {
        let method = options.method.unwrap_or(self.settings.method);
        let record = OutcomeRecord::new(user_id, url, method.as_str());
        let start = Instant::now();

        let Some(client) = session.client.as_ref() else {
            return record.with_error(ErrorKind::Request, start.elapsed());
        };

        let mut builder = client.request(method.to_reqwest(), url);
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(cookies) = cookie_header(&session.cookies_for(&options.cookies)) {
            builder = builder.header(COOKIE, cookies);
        }

        let payload = options.payload.as_deref().or_else(|| {
            if method.sends_default_payload() {
                self.settings.payload.as_deref()
            } else {
                None
            }
        });
        if let Some(payload) = payload {
            let content_type = options
                .content_type
                .as_deref()
                .unwrap_or(&self.settings.content_type);
            builder = attach_payload(builder, payload, content_type);
        }

        let record = match builder.send().await {
            Ok(response) => {
                let capture = options.capture_body || self.settings.validation.requires_body();
                read_response(record, response, start, capture).await
            }
            Err(err) => record.with_error(classify(&err), start.elapsed()),
        };
        let record = self.apply_validation(record);

        session.merge_cookies(&record.cookies);
        if self.settings.verbose {
            log_sampled(&record);
        }
        record
    }
}

impl HttpAdapter {
    fn apply_validation(&self, mut record: OutcomeRecord) -> OutcomeRecord {
        if record.is_error() {
            return record;
        }
        let Some(status) = record.status else {
            return record;
        };
        let verdict = self
            .settings
            .validation
            .validate(status, record.body_text().as_deref());
        if let Err(reason) = verdict {
            record.error = Some(ErrorKind::ValidationFailed(reason));
        }
        record
    }
}

fn attach_payload(builder: RequestBuilder, payload: &str, content_type: &str) -> RequestBuilder {
    if content_type == JSON_CONTENT_TYPE
        && let Ok(json) = serde_json::from_str::<Value>(payload)
    {
        return builder.json(&json);
    }
    builder
        .header(CONTENT_TYPE, content_type)
        .body(payload.to_owned())
}

async fn read_response(
    mut record: OutcomeRecord,
    response: reqwest::Response,
    start: Instant,
    capture_body: bool,
) -> OutcomeRecord {
    record.response_time = start.elapsed();
    record.status = Some(response.status().as_u16());
    record.content_length = response.content_length().unwrap_or(0);

    for (name, value) in response.headers() {
        if let Ok(text) = value.to_str() {
            record
                .headers
                .entry(name.as_str().to_owned())
                .or_insert_with(|| text.to_owned());
        }
    }
    for value in response.headers().get_all(SET_COOKIE) {
        if let Ok(raw) = value.to_str()
            && let Some((name, cookie)) = parse_set_cookie(raw)
        {
            record.cookies.insert(name, cookie);
        }
    }

    if capture_body {
        match response.bytes().await {
            Ok(bytes) => {
                record.content_length = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
                record.body = Some(bytes.to_vec());
            }
            Err(err) => record.error = Some(classify(&err)),
        }
    }
    record
}

fn classify(err: &reqwest::Error) -> ErrorKind {
    if err.is_timeout() {
        ErrorKind::Timeout
    } else if err.is_connect() {
        ErrorKind::Connection
    } else {
        ErrorKind::Request
    }
}

/// Logs about 5% of successes and 20% of failures.
pub(crate) fn log_sampled(record: &OutcomeRecord) {
    let roll: f64 = rand::random();
    match &record.error {
        None if roll < 0.05 => tracing::debug!(
            "User {} - {} {} - {} - {:.3}s",
            record.user_id,
            record.method,
            record.url,
            record.status.unwrap_or_default(),
            record.response_time.as_secs_f64()
        ),
        Some(kind) if roll < 0.2 => tracing::warn!(
            "User {} - {} {} - ERROR: {}",
            record.user_id,
            record.method,
            record.url,
            kind
        ),
        None | Some(_) => {}
    }
}
