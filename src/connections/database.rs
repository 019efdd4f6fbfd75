//! Relational database client.
//!
//! Diesel SQLite connections behind an r2d2 pool. Diesel is blocking, so every
//! query runs on the blocking thread pool.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::SqliteConnection;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::DatabaseConfig;

/// Type alias for a SQLite connection pool.
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Database connection is closed")]
    Closed,

    #[error("Blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Database capability used by the `/db` probe and shutdown.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run a trivial query.
    async fn ping(&self) -> Result<(), DatabaseError>;

    /// Close the connection. Only the first call does any work.
    async fn close(&self) -> Result<(), DatabaseError>;
}

/// SQLite database reached through a connection pool.
pub struct SqliteDatabase {
    pool: Arc<RwLock<Option<DbPool>>>,
}

impl SqliteDatabase {
    /// Open the pool and verify connectivity.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let path = database_path(&config.url).to_string();
        let pool_size = config.pool_size;
        let timeout = Duration::from_millis(config.connect_timeout_ms);

        let pool = tokio::task::spawn_blocking(move || -> Result<DbPool, DatabaseError> {
            let manager = ConnectionManager::<SqliteConnection>::new(path);
            let pool = Pool::builder()
                .max_size(pool_size)
                .connection_timeout(timeout)
                .build(manager)
                .map_err(|e| DatabaseError::Connection(e.to_string()))?;
            select_one(&pool)?;
            Ok(pool)
        })
        .await??;

        tracing::info!(pool_size, "Database connected");
        Ok(Self {
            pool: Arc::new(RwLock::new(Some(pool))),
        })
    }

    /// Run `query` on the blocking pool.
    ///
    /// The read guard moves into the blocking task, so `close` waits for the
    /// query even when the caller stops waiting for it.
    async fn with_pool<F, T>(&self, query: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&DbPool) -> Result<T, DatabaseError> + Send + 'static,
        T: Send + 'static,
    {
        let guard = Arc::clone(&self.pool).read_owned().await;
        if guard.is_none() {
            return Err(DatabaseError::Closed);
        }
        tokio::task::spawn_blocking(move || match guard.as_ref() {
            Some(pool) => query(pool),
            None => Err(DatabaseError::Closed),
        })
        .await?
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn ping(&self) -> Result<(), DatabaseError> {
        self.with_pool(select_one).await
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        let Some(pool) = self.pool.write().await.take() else {
            return Ok(());
        };
        let idle = pool.state().idle_connections;
        drop(pool);
        tracing::debug!(idle_connections = idle, "Database pool closed");
        Ok(())
    }
}

fn select_one(pool: &DbPool) -> Result<(), DatabaseError> {
    let mut conn = pool
        .get()
        .map_err(|e| DatabaseError::Connection(e.to_string()))?;
    diesel::sql_query("SELECT 1").execute(&mut conn)?;
    Ok(())
}

/// Strip an optional `sqlite://` or `sqlite:` scheme from a connection string.
pub fn database_path(url: &str) -> &str {
    url.strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url)
}
