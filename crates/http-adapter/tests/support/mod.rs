//! A throwaway HTTP/1.1 server for adapter tests.
//!
//! Every accepted connection gets the same canned response after an optional
//! delay. The raw request head of each connection is forwarded on a channel
//! so tests can assert on what was actually sent.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use dispatch::{decode_json, DecodeError, Method, Request, ResponseMetadata};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

pub struct CannedResponse {
    pub status_line: &'static str,
    pub body: &'static str,
    pub delay: Duration,
}

impl CannedResponse {
    pub fn ok(body: &'static str) -> Self {
        Self {
            status_line: "200 OK",
            body,
            delay: Duration::ZERO,
        }
    }

    pub fn with_status(mut self, status_line: &'static str) -> Self {
        self.status_line = status_line;
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

pub struct FakeServer {
    pub addr: SocketAddr,
    pub requests: mpsc::UnboundedReceiver<String>,
}

impl FakeServer {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

pub async fn spawn_server(canned: CannedResponse) -> FakeServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (tx, requests) = mpsc::unbounded_channel();
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        canned.status_line,
        canned.body.len(),
        canned.body
    );
    let delay = canned.delay;

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            let response = response.clone();
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = tx.send(String::from_utf8_lossy(&head).into_owned());
                tokio::time::sleep(delay).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    FakeServer { addr, requests }
}

/// Returns an address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    listener.local_addr().expect("local addr")
}

/// `GET {base_url}{path}` decoding a flat JSON object of strings.
pub struct JsonGet {
    pub base_url: String,
    pub path: &'static str,
    pub headers: Vec<(String, String)>,
}

impl JsonGet {
    pub fn new(server: &FakeServer, path: &'static str) -> Self {
        Self {
            base_url: server.base_url(),
            path,
            headers: Vec::new(),
        }
    }
}

impl Request for JsonGet {
    type Response = HashMap<String, String>;

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn method(&self) -> Method {
        Method::Get
    }

    fn path(&self) -> &str {
        self.path
    }

    fn header_fields(&self) -> Vec<(String, String)> {
        self.headers.clone()
    }

    fn decode(
        &self,
        body: &[u8],
        _metadata: &ResponseMetadata,
    ) -> Result<Self::Response, DecodeError> {
        decode_json(body)
    }
}
