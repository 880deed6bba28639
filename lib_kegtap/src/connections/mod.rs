//! # Connections Module
//!
//! This module handles the persistent store behind the pour ledger: an SQLite
//! database accessed through an `sqlx` connection pool.

/// Pool management, bootstrap schema and health checks.
pub mod db_sqlite;

/// Beer catalogue queries.
pub mod beers;

/// Tap queries and the atomic volume ledger.
pub mod taps;

pub use db_sqlite::Database;
