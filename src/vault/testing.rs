//! Local HTTP responder for exercising the REST client without Obsidian.
//!
//! Every accepted connection serves exactly one request and is then closed.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::config::ServerConfig;

/// A request as seen by the responder.
#[derive(Debug, Clone)]
pub(crate) struct Captured {
    pub method: String,
    /// Path including the query string.
    pub path: String,
    /// Header names are lowercased.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A canned response.
#[derive(Debug, Clone)]
pub(crate) struct Canned {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl Canned {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".into()),
            body: body.to_string(),
        }
    }

    pub fn text(status: u16, content_type: &str, body: &str) -> Self {
        Self {
            status,
            content_type: Some(content_type.into()),
            body: body.into(),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            content_type: None,
            body: String::new(),
        }
    }
}

/// Start a responder on an ephemeral port.
///
/// Returns an HTTP config pointing at it and a channel yielding every request
/// it receives.
pub(crate) async fn serve<F>(respond: F) -> (ServerConfig, mpsc::UnboundedReceiver<Captured>)
where
    F: Fn(&Captured) -> Canned + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::unbounded_channel();
    let respond = Arc::new(respond);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let tx = tx.clone();
            let respond = respond.clone();
            tokio::spawn(async move {
                let mut stream = stream;
                handle_connection(&mut stream, &*respond, &tx).await;
            });
        }
    });

    let mut config = ServerConfig::new("test-key");
    config.use_http = true;
    config.port = Some(port);
    (config, rx)
}

/// Requests are published before the response is written so the channel
/// preserves request order.
async fn handle_connection<F>(
    stream: &mut TcpStream,
    respond: &F,
    tx: &mpsc::UnboundedSender<Captured>,
) -> Option<()>
where
    F: Fn(&Captured) -> Canned,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_subsequence(&buf, b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    let captured = Captured {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    };

    let canned = respond(&captured);
    let _ = tx.send(captured);
    let mut response = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        canned.status,
        reason(canned.status),
        canned.body.len()
    );
    if let Some(ct) = &canned.content_type {
        response.push_str(&format!("Content-Type: {}\r\n", ct));
    }
    response.push_str("\r\n");
    response.push_str(&canned.body);

    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
    Some(())
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
