//! Cache client speaking the Redis serialization protocol (RESP).
//!
//! Only the handful of commands the supervisor needs are supported:
//! `AUTH`, `SELECT`, `PING` and `QUIT`.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use url::Url;

use crate::config::CacheConfig;

/// Liveness token returned by `PING`.
pub const PONG: &str = "PONG";

const DEFAULT_PORT: u16 = 6379;

/// Largest bulk reply accepted, matching the server's own limit.
const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Invalid cache URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Cache connection is closed")]
    Closed,
}

/// Cache capability used by the `/redis` probe and shutdown.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Issue a liveness probe, returning the server's reply token.
    async fn ping(&self) -> Result<String, CacheError>;

    /// Close the connection. Only the first call does any work.
    async fn close(&self) -> Result<(), CacheError>;
}

/// A decoded RESP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Simple(String),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
}

impl Reply {
    fn into_text(self) -> String {
        match self {
            Reply::Simple(s) => s,
            Reply::Integer(n) => n.to_string(),
            Reply::Bulk(Some(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            Reply::Bulk(None) => String::new(),
        }
    }
}

/// Connection target parsed from a `redis://` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub address: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub db: Option<u32>,
}

impl Target {
    pub fn parse(raw: &str) -> Result<Self, CacheError> {
        let url = Url::parse(raw).map_err(|e| CacheError::InvalidUrl(e.to_string()))?;
        if url.scheme() != "redis" {
            return Err(CacheError::InvalidUrl(format!("unsupported scheme '{}'", url.scheme())));
        }
        let host = url
            .host_str()
            .ok_or_else(|| CacheError::InvalidUrl("missing host".to_string()))?;
        let port = url.port().unwrap_or(DEFAULT_PORT);

        let username = Some(url.username()).filter(|u| !u.is_empty()).map(str::to_string);
        let password = url.password().map(str::to_string);
        let db = match url.path().trim_start_matches('/') {
            "" => None,
            n => Some(
                n.parse()
                    .map_err(|_| CacheError::InvalidUrl(format!("invalid database index '{}'", n)))?,
            ),
        };

        Ok(Self {
            address: format!("{}:{}", host, port),
            username,
            password,
            db,
        })
    }
}

enum Slot {
    Connected(BufStream<TcpStream>),
    /// Dropped after a failed or abandoned exchange; reopened on next use.
    Disconnected,
    Closed,
}

/// Single connection to a Redis-compatible server.
///
/// A connection whose exchange timed out, failed on the socket, or was
/// cancelled mid-flight may still receive the late reply, so it is never
/// reused. The next `ping` opens a fresh one.
pub struct RedisCache {
    target: Target,
    timeout: Duration,
    slot: Mutex<Slot>,
}

impl RedisCache {
    /// Connect, authenticate, select the database and verify with `PING`.
    pub async fn connect(config: &CacheConfig) -> Result<Self, CacheError> {
        let target = Target::parse(&config.url)?;
        let timeout = Duration::from_millis(config.timeout_ms);
        let stream = open(&target, timeout).await?;

        tracing::info!(address = %target.address, db = ?target.db, "Cache connected");
        Ok(Self {
            target,
            timeout,
            slot: Mutex::new(Slot::Connected(stream)),
        })
    }
}

async fn open(target: &Target, timeout: Duration) -> Result<BufStream<TcpStream>, CacheError> {
    let stream = tokio::time::timeout(timeout, TcpStream::connect(&target.address))
        .await
        .map_err(|_| CacheError::Timeout(timeout))??;
    let mut stream = BufStream::new(stream);

    if let Some(password) = &target.password {
        let reply = match &target.username {
            Some(user) => exchange(&mut stream, &["AUTH", user, password], timeout).await?,
            None => exchange(&mut stream, &["AUTH", password], timeout).await?,
        };
        expect_ok(reply)?;
    }

    if let Some(db) = target.db {
        let index = db.to_string();
        expect_ok(exchange(&mut stream, &["SELECT", &index], timeout).await?)?;
    }

    let token = exchange(&mut stream, &["PING"], timeout).await?.into_text();
    if token != PONG {
        return Err(CacheError::Protocol(format!("unexpected PING reply '{}'", token)));
    }
    Ok(stream)
}

#[async_trait]
impl Cache for RedisCache {
    async fn ping(&self) -> Result<String, CacheError> {
        let mut slot = self.slot.lock().await;
        // Leave the slot empty while the exchange runs so a cancelled
        // caller drops the socket with it.
        let mut stream = match std::mem::replace(&mut *slot, Slot::Disconnected) {
            Slot::Connected(stream) => stream,
            Slot::Disconnected => {
                tracing::info!(address = %self.target.address, "Reconnecting to cache");
                open(&self.target, self.timeout).await?
            }
            Slot::Closed => {
                *slot = Slot::Closed;
                return Err(CacheError::Closed);
            }
        };

        match exchange(&mut stream, &["PING"], self.timeout).await {
            Ok(reply) => {
                *slot = Slot::Connected(stream);
                Ok(reply.into_text())
            }
            // A complete error reply leaves the stream in sync.
            Err(CacheError::Server(message)) => {
                *slot = Slot::Connected(stream);
                Err(CacheError::Server(message))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dropping cache connection");
                Err(e)
            }
        }
    }

    async fn close(&self) -> Result<(), CacheError> {
        let previous = std::mem::replace(&mut *self.slot.lock().await, Slot::Closed);
        let Slot::Connected(mut stream) = previous else {
            return Ok(());
        };
        let quit = exchange(&mut stream, &["QUIT"], self.timeout).await;
        // The socket is released even when QUIT fails.
        let _ = stream.get_mut().shutdown().await;
        expect_ok(quit?)
    }
}

async fn exchange(
    stream: &mut BufStream<TcpStream>,
    args: &[&str],
    timeout: Duration,
) -> Result<Reply, CacheError> {
    tokio::time::timeout(timeout, async {
        stream.write_all(&encode_command(args)).await?;
        stream.flush().await?;
        read_reply(stream).await
    })
    .await
    .map_err(|_| CacheError::Timeout(timeout))?
}

fn expect_ok(reply: Reply) -> Result<(), CacheError> {
    match reply {
        Reply::Simple(s) if s == "OK" => Ok(()),
        other => Err(CacheError::Protocol(format!("expected OK, got {:?}", other))),
    }
}

/// Encode a command as a RESP array of bulk strings.
pub fn encode_command(args: &[&str]) -> Vec<u8> {
    let mut buf = format!("*{}\r\n", args.len()).into_bytes();
    for arg in args {
        buf.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        buf.extend_from_slice(arg.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    buf
}

/// Read one non-aggregate RESP reply.
pub async fn read_reply<R>(reader: &mut R) -> Result<Reply, CacheError>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(CacheError::Io(std::io::ErrorKind::UnexpectedEof.into()));
    }
    let line = line.trim_end_matches(['\r', '\n']);
    let mut chars = line.chars();
    let kind = chars.next();
    let rest = chars.as_str();

    match kind {
        Some('+') => Ok(Reply::Simple(rest.to_string())),
        Some('-') => Err(CacheError::Server(rest.to_string())),
        Some(':') => rest
            .parse()
            .map(Reply::Integer)
            .map_err(|_| CacheError::Protocol(format!("bad integer '{}'", rest))),
        Some('$') => {
            let len: i64 = rest
                .parse()
                .map_err(|_| CacheError::Protocol(format!("bad bulk length '{}'", rest)))?;
            if len < 0 {
                return Ok(Reply::Bulk(None));
            }
            if len > MAX_BULK_LEN {
                return Err(CacheError::Protocol(format!("bulk length {} exceeds limit", len)));
            }
            let mut data = vec![0u8; len as usize + 2];
            reader.read_exact(&mut data).await?;
            data.truncate(len as usize);
            Ok(Reply::Bulk(Some(data)))
        }
        _ => Err(CacheError::Protocol(format!("unsupported reply '{}'", line))),
    }
}
