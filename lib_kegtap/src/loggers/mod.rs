//! # Loggers Module
//!
//! Structured logging setup shared by the server and the device binaries.

/// `tracing` subscriber with console output and daily rotated JSON files.
pub mod tracing_setup;

pub use tracing_setup::setup_logging;
