use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message};

use crate::args::SurgeArgs;
use crate::config::LoadTestSettings;
use crate::error::{AppError, AppResult};

use super::{ErrorKind, HttpAdapter, ProtocolAdapter, RequestOptions, WebSocketAdapter};

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::validation(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

fn settings(argv: &[&str]) -> AppResult<Arc<LoadTestSettings>> {
    let mut full = vec!["surge"];
    full.extend_from_slice(argv);
    let args = SurgeArgs::try_parse_from(full)?;
    Ok(Arc::new(LoadTestSettings::from_args(&args)?))
}

/// Serves `responses` in order, one per connection, and reports each raw request.
async fn spawn_http_server(
    responses: Vec<&'static str>,
) -> AppResult<(String, JoinHandle<Vec<String>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for response in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            requests.push(read_request(&mut socket).await);
            drop(socket.write_all(response.as_bytes()).await);
            drop(socket.shutdown().await);
        }
        requests
    });
    Ok((format!("http://{}", addr), handle))
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut raw = Vec::new();
    let mut chunk = [0_u8; 4096];
    loop {
        let Ok(read) = socket.read(&mut chunk).await else {
            break;
        };
        if read == 0 {
            break;
        }
        raw.extend_from_slice(chunk.get(..read).unwrap_or_default());
        let text = String::from_utf8_lossy(&raw);
        if let Some((head, body)) = text.split_once("\r\n\r\n") {
            let expected = head
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if body.len() >= expected {
                break;
            }
        }
    }
    String::from_utf8_lossy(&raw).into_owned()
}

const JSON_OK: &str = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nSet-Cookie: sid=abc; Path=/\r\nX-Trace: t1\r\nContent-Length: 27\r\nConnection: close\r\n\r\n{\"token\":\"xyz\",\"count\":42}\n";

#[test]
fn http_request_records_status_headers_and_cookies() -> AppResult<()> {
    run_async_test(async {
        let (base, server) = spawn_http_server(vec![JSON_OK, JSON_OK]).await?;
        let settings = settings(&[
            base.as_str(),
            "--auth-type",
            "bearer",
            "--auth-token",
            "secret",
            "--cookie",
            "seed=1",
        ])?;
        let adapter = HttpAdapter::new(settings);
        let mut session = adapter.create_session(7).await?;

        let options = RequestOptions {
            capture_body: true,
            ..RequestOptions::default()
        };
        let first = adapter.request(&mut session, &base, 7, &options).await;
        let second = adapter.request(&mut session, &base, 7, &options).await;
        let requests = server.await?;

        let body = first.body_text().map(|text| text.into_owned());
        let checks = [
            (first.status == Some(200), "status"),
            (!first.is_error(), "no error"),
            (first.header("x-trace") == Some("t1"), "header"),
            (first.cookies.get("sid").map(String::as_str) == Some("abc"), "cookie delta"),
            (body.as_deref().is_some_and(|b| b.contains("xyz")), "body"),
            (first.user_id == 7 && first.method == "GET", "identity"),
            (!second.is_error(), "second request"),
            (session.cookies.get("sid").map(String::as_str) == Some("abc"), "jar merged"),
        ];
        for (ok, msg) in checks {
            if !ok {
                return Err(AppError::validation(format!("Check failed: {}", msg)));
            }
        }

        let first_request = requests.first().cloned().unwrap_or_default().to_ascii_lowercase();
        let second_request = requests.get(1).cloned().unwrap_or_default().to_ascii_lowercase();
        if !first_request.contains("authorization: bearer secret") {
            return Err(AppError::validation("Expected bearer header"));
        }
        if !first_request.contains("user-agent: surge/") {
            return Err(AppError::validation("Expected default user agent"));
        }
        if !second_request.contains("sid=abc") || !second_request.contains("seed=1") {
            return Err(AppError::validation(format!(
                "Expected cookies on second request: {}",
                second_request
            )));
        }
        Ok(())
    })
}

#[test]
fn http_validation_failure_is_request_error() -> AppResult<()> {
    run_async_test(async {
        let (base, server) = spawn_http_server(vec![JSON_OK]).await?;
        let settings = settings(&[base.as_str(), "--validate-json-path", "$.count", "--validate-json-value", "41"])?;
        let adapter = HttpAdapter::new(settings);
        let mut session = adapter.create_session(1).await?;
        let record = adapter
            .request(&mut session, &base, 1, &RequestOptions::default())
            .await;
        drop(server.await?);
        if record.error != Some(ErrorKind::ValidationFailed("json_value_mismatch".to_owned())) {
            return Err(AppError::validation(format!(
                "Unexpected error: {:?}",
                record.error
            )));
        }
        Ok(())
    })
}

#[test]
fn http_posts_default_payload_as_json() -> AppResult<()> {
    run_async_test(async {
        let (base, server) = spawn_http_server(vec![JSON_OK]).await?;
        let settings = settings(&[base.as_str(), "-X", "post", "--payload", "{\"name\": \"surge\"}"])?;
        let adapter = HttpAdapter::new(settings);
        let mut session = adapter.create_session(1).await?;
        let record = adapter
            .request(&mut session, &base, 1, &RequestOptions::default())
            .await;
        let requests = server.await?;
        let raw = requests.first().cloned().unwrap_or_default();
        if record.method != "POST" || !raw.starts_with("POST ") {
            return Err(AppError::validation(format!("Expected POST: {}", raw)));
        }
        if !raw.to_ascii_lowercase().contains("content-type: application/json")
            || !raw.contains("{\"name\":\"surge\"}")
        {
            return Err(AppError::validation(format!("Expected JSON body: {}", raw)));
        }
        Ok(())
    })
}

#[test]
fn http_connection_refused_is_connection_error() -> AppResult<()> {
    run_async_test(async {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);
        let url = format!("http://{}/", addr);
        let adapter = HttpAdapter::new(settings(&[url.as_str(), "--timeout", "2"])?);
        let mut session = adapter.create_session(1).await?;
        let record = adapter
            .request(&mut session, &url, 1, &RequestOptions::default())
            .await;
        if record.error != Some(ErrorKind::Connection) {
            return Err(AppError::validation(format!(
                "Unexpected error: {:?}",
                record.error
            )));
        }
        Ok(())
    })
}

async fn spawn_ws_server(replies: usize) -> AppResult<(String, JoinHandle<Option<Message>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.ok()?;
        let mut ws = accept_async(socket).await.ok()?;
        let received = ws.next().await?.ok()?;
        for index in 0..replies {
            ws.send(Message::Text(format!("reply-{}", index))).await.ok()?;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(ws.close(None).await);
        Some(received)
    });
    Ok((format!("ws://{}/socket", addr), handle))
}

#[test]
fn websocket_collects_up_to_max_messages() -> AppResult<()> {
    run_async_test(async {
        let (url, server) = spawn_ws_server(3).await?;
        let settings = settings(&[
            url.as_str(),
            "--protocol",
            "websocket",
            "--payload",
            "{\"op\": \"ping\"}",
            "--ws-max-messages",
            "2",
            "--timeout",
            "2",
        ])?;
        let adapter = WebSocketAdapter::new(settings);
        let mut session = adapter.create_session(3).await?;
        let record = adapter
            .request(&mut session, &url, 3, &RequestOptions::default())
            .await;
        let received = server.await?;

        if record.is_error() || record.status != Some(101) || record.method != "WEBSOCKET" {
            return Err(AppError::validation(format!("Unexpected record: {:?}", record)));
        }
        let body = record.body_text().map(|text| text.into_owned());
        if body.as_deref() != Some("reply-0\nreply-1") {
            return Err(AppError::validation(format!("Unexpected body: {:?}", body)));
        }
        if received != Some(Message::Text("{\"op\":\"ping\"}".to_owned())) {
            return Err(AppError::validation(format!("Unexpected sent frame: {:?}", received)));
        }
        Ok(())
    })
}

#[test]
fn websocket_silence_is_ws_timeout() -> AppResult<()> {
    run_async_test(async {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            if let Ok((socket, _)) = listener.accept().await
                && let Ok(mut ws) = accept_async(socket).await
            {
                drop(ws.next().await);
                tokio::time::sleep(Duration::from_millis(1500)).await;
            }
        });
        let url = format!("ws://{}/", addr);
        let adapter = WebSocketAdapter::new(settings(&[
            url.as_str(),
            "--protocol",
            "websocket",
            "--payload",
            "hi",
            "--timeout",
            "1",
        ])?);
        let mut session = adapter.create_session(1).await?;
        let record = adapter
            .request(&mut session, &url, 1, &RequestOptions::default())
            .await;
        server.abort();
        if record.error != Some(ErrorKind::WsTimeout) {
            return Err(AppError::validation(format!(
                "Unexpected error: {:?}",
                record.error
            )));
        }
        Ok(())
    })
}
