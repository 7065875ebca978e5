//! One-shot HTTP server for exercising [`regionscout_data::HttpBackend`].

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use regionscout_data::{HttpBackend, HttpBackendConfig};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Response the server sends back.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl CannedResponse {
    /// JSON response with `status`.
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string().into_bytes(),
        }
    }

    /// Binary response with status 200.
    pub fn bytes(content_type: &'static str, body: &[u8]) -> Self {
        Self {
            status: 200,
            content_type,
            body: body.to_vec(),
        }
    }
}

/// Request the server received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// Request body decoded as JSON.
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body)
            .unwrap_or_else(|err| panic!("request body is not JSON: {err}"))
    }
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|index| index + 4)
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

async fn read_request(stream: &mut TcpStream) -> RecordedRequest {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 4096];
    let header_end = loop {
        if let Some(end) = find_header_end(&buffer) {
            break end;
        }
        let read = stream
            .read(&mut chunk)
            .await
            .unwrap_or_else(|err| panic!("failed to read request: {err}"));
        assert!(read > 0, "client closed before sending headers");
        buffer.extend_from_slice(&chunk[..read]);
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).into_owned();
    let length = content_length(&head);
    while buffer.len() < header_end + length {
        let read = stream
            .read(&mut chunk)
            .await
            .unwrap_or_else(|err| panic!("failed to read body: {err}"));
        assert!(read > 0, "client closed before sending the body");
        buffer.extend_from_slice(&chunk[..read]);
    }

    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    RecordedRequest {
        method: request_line.next().unwrap_or_default().to_owned(),
        path: request_line.next().unwrap_or_default().to_owned(),
        body: buffer[header_end..header_end + length].to_vec(),
    }
}

async fn write_response(stream: &mut TcpStream, response: &CannedResponse) {
    let head = format!(
        "HTTP/1.1 {} Canned\r\ncontent-type: {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
        response.status,
        response.content_type,
        response.body.len()
    );
    stream
        .write_all(head.as_bytes())
        .await
        .unwrap_or_else(|err| panic!("failed to write head: {err}"));
    stream
        .write_all(&response.body)
        .await
        .unwrap_or_else(|err| panic!("failed to write body: {err}"));
    stream
        .shutdown()
        .await
        .unwrap_or_else(|err| panic!("failed to close stream: {err}"));
}

/// Accept one connection, record its request and answer with `response`.
pub async fn serve_once(listener: TcpListener, response: CannedResponse) -> RecordedRequest {
    let (mut stream, _) = listener
        .accept()
        .await
        .unwrap_or_else(|err| panic!("failed to accept: {err}"));
    let request = read_request(&mut stream).await;
    write_response(&mut stream, &response).await;
    request
}

/// Accept one connection and never answer.
pub async fn serve_silently(listener: TcpListener) {
    let (_stream, _) = listener
        .accept()
        .await
        .unwrap_or_else(|err| panic!("failed to accept: {err}"));
    tokio::time::sleep(Duration::from_secs(30)).await;
}

/// Backend talking to `addr` directly.
pub fn backend_for(addr: SocketAddr, timeout: Option<Duration>) -> HttpBackend {
    let mut config = HttpBackendConfig::new(format!("http://{addr}")).without_system_proxy();
    if let Some(timeout) = timeout {
        config = config.with_timeout(timeout);
    }
    HttpBackend::with_config(config).unwrap_or_else(|err| panic!("backend should build: {err}"))
}

/// Bind a listener on an ephemeral local port.
pub async fn local_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap_or_else(|err| panic!("failed to bind: {err}"));
    let addr = listener
        .local_addr()
        .unwrap_or_else(|err| panic!("no local address: {err}"));
    (listener, addr)
}

/// Run `call` against a server answering `response` once.
pub async fn exchange<F, T>(response: CannedResponse, call: F) -> (T, RecordedRequest)
where
    F: AsyncFnOnce(HttpBackend) -> T,
{
    let (listener, addr) = local_listener().await;
    let server = tokio::spawn(serve_once(listener, response));
    let outcome = call(backend_for(addr, None)).await;
    let request = server
        .await
        .unwrap_or_else(|err| panic!("server task failed: {err}"));
    (outcome, request)
}

/// Run `future` to completion on a fresh current-thread runtime.
pub fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|err| panic!("test runtime should build: {err}"))
        .block_on(future)
}
