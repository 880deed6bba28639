//! # SQLite Connection Manager
//!
//! Provides a managed connection pool for SQLite using the `sqlx` crate.
//! Supports connection pooling, bootstrap of the ledger tables and health checks.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::errors::TapResult;

/// Idempotent bootstrap schema; safe to apply on every start.
const SCHEMA: &str = include_str!("schema.sql");

/// A wrapper around the SQLite connection pool.
#[derive(Clone, Debug)]
pub struct Database {
    /// The underlying sqlx connection pool.
    pub pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database at `database_url` and applies the schema.
    ///
    /// # Arguments
    /// * `database_url` - An sqlx SQLite URL (e.g., "sqlite://kegtap.db").
    /// * `max_connections` - Maximum number of concurrent connections in the pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> TapResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            // Writers queue on the database lock instead of failing fast.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.bootstrap().await?;
        info!(database_url, max_connections, "Ledger store ready");
        Ok(db)
    }

    /// A private in-memory database. Holds a single connection that is never
    /// recycled, since each SQLite memory connection is its own database.
    pub async fn in_memory() -> TapResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.bootstrap().await?;
        Ok(db)
    }

    async fn bootstrap(&self) -> TapResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        debug!("Schema applied");
        Ok(())
    }

    /// Checks the health of the database connection by running a simple query.
    pub async fn ping(&self) -> TapResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
