//! Shared utilities for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use std::future::Future;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpListener;

use svc_supervisor::app::{AppError, Application};
use svc_supervisor::connections::{Cache, CacheError, Database, DatabaseError};
use svc_supervisor::lifecycle::Resources;
use svc_supervisor::observability::{Telemetry, TelemetryError};

/// Start a programmable HTTP backend; returns its address.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let mut socket = BufStream::new(socket);
                let mut request_line = String::new();
                if socket.read_line(&mut request_line).await.is_err() {
                    return;
                }
                loop {
                    let mut header = String::new();
                    match socket.read_line(&mut header).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) if header == "\r\n" => break,
                        Ok(_) => {}
                    }
                }

                let (status, body) = f(request_line.trim().to_string()).await;
                let status_text = match status {
                    200 => "200 OK",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.flush().await;
                let _ = socket.get_mut().shutdown().await;
            });
        }
    });

    addr
}

/// Start a Redis-compatible server. The first `PING` on each connection gets
/// `PONG` so the handshake succeeds; later ones get `token`. `QUIT` gets `OK`.
/// Returns its `redis://` URL.
pub async fn start_mock_redis(token: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut socket = BufStream::new(socket);
                let mut pings = 0;
                loop {
                    let mut header = String::new();
                    match socket.read_line(&mut header).await {
                        Ok(0) | Err(_) => return,
                        Ok(_) => {}
                    }
                    let count: usize = header.trim().trim_start_matches('*').parse().unwrap_or(0);
                    let mut args = Vec::new();
                    for i in 0..count * 2 {
                        let mut line = String::new();
                        if socket.read_line(&mut line).await.unwrap_or(0) == 0 {
                            return;
                        }
                        if i % 2 == 1 {
                            args.push(line.trim().to_ascii_uppercase());
                        }
                    }
                    let reply = match args.first().map(String::as_str) {
                        Some("PING") => {
                            pings += 1;
                            if pings == 1 {
                                "+PONG\r\n".to_string()
                            } else {
                                format!("+{}\r\n", token)
                            }
                        }
                        Some("QUIT") => "+OK\r\n".to_string(),
                        _ => "-ERR unknown command\r\n".to_string(),
                    };
                    let _ = socket.write_all(reply.as_bytes()).await;
                    let _ = socket.flush().await;
                }
            });
        }
    });

    format!("redis://{}", addr)
}

/// Ordered record of lifecycle calls made on the mocks.
#[derive(Clone, Default)]
pub struct Events(Arc<Mutex<Vec<String>>>);

impl Events {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == event).count()
    }
}

/// How a mock behaves when torn down.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    Hang,
}

async fn act(behavior: Behavior, what: &str) -> Result<(), std::io::Error> {
    match behavior {
        Behavior::Succeed => Ok(()),
        Behavior::Fail => Err(std::io::Error::other(format!("{} failed", what))),
        Behavior::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }
}

pub struct MockApp {
    pub events: Events,
    pub teardown: Behavior,
    /// How long `dispatch` takes before answering.
    pub dispatch_delay: Duration,
}

#[async_trait]
impl Application for MockApp {
    async fn dispatch(&self, request: Request<Body>) -> Response {
        tokio::time::sleep(self.dispatch_delay).await;
        self.events.push(format!("dispatch {} {}", request.method(), request.uri()));
        (StatusCode::ACCEPTED, "delegated").into_response()
    }

    async fn teardown(&self) -> Result<(), AppError> {
        self.events.push("app.teardown");
        act(self.teardown, "app")
            .await
            .map_err(|e| AppError::Teardown(e.to_string()))
    }
}

pub struct MockTelemetry {
    pub events: Events,
    pub flush: Behavior,
}

#[async_trait]
impl Telemetry for MockTelemetry {
    async fn flush(&self) -> Result<(), TelemetryError> {
        self.events.push("telemetry.flush");
        act(self.flush, "telemetry")
            .await
            .map_err(|e| TelemetryError::Exporter(e.to_string()))
    }
}

pub struct MockCache {
    pub events: Events,
    pub close: Behavior,
}

#[async_trait]
impl Cache for MockCache {
    async fn ping(&self) -> Result<String, CacheError> {
        Ok("PONG".to_string())
    }

    async fn close(&self) -> Result<(), CacheError> {
        self.events.push("cache.close");
        act(self.close, "cache").await.map_err(CacheError::Io)
    }
}

pub struct MockDatabase {
    pub events: Events,
    pub close: Behavior,
}

#[async_trait]
impl Database for MockDatabase {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        self.events.push("database.close");
        act(self.close, "database")
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))
    }
}

/// Mocked resources with one behavior per teardown step, in teardown order.
pub fn mock_resources(events: &Events, behaviors: [Behavior; 4]) -> Resources {
    let [app, telemetry, cache, database] = behaviors;
    Resources {
        app: Arc::new(MockApp {
            events: events.clone(),
            teardown: app,
            dispatch_delay: Duration::ZERO,
        }),
        telemetry: Arc::new(MockTelemetry { events: events.clone(), flush: telemetry }),
        cache: Some(Arc::new(MockCache { events: events.clone(), close: cache })),
        database: Some(Arc::new(MockDatabase { events: events.clone(), close: database })),
    }
}

/// In-memory sink for formatted log output.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Install a thread-local subscriber writing into the returned capture.
pub fn capture_logs() -> (LogCapture, tracing::subscriber::DefaultGuard) {
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}
