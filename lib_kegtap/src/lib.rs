//! # lib_kegtap
//!
//! Shared building blocks for the keg tap volume tracking system: the device-side
//! flow detection engine, the server-side pour ledger, and the plumbing both sides
//! need to talk to each other.
//!
//! ## Module Map:
//! - **`core`**: Pulse counter, flow state machine, ledger arithmetic and keg level
//!   computations. Always compiled; no I/O.
//! - **`models`**: Beer, tap and pour wire types shared by the server and devices.
//! - **`errors`**: The `TapError` taxonomy used across every crate in the workspace.
//! - **`connections`** *(feature `connections`)*: SQLite ledger store built on `sqlx`.
//! - **`retrieve`** *(feature `retrieve`)*: Retrying HTTP client and the typed tap API client.
//! - **`loggers`** *(feature `loggers`)*: `tracing` subscriber setup with rotating JSON files.

#![doc(html_logo_url = "https://example.com/logo.png")] // Placeholder
#![forbid(unsafe_code)]

pub mod core;
pub mod errors;
pub mod models;

#[cfg(feature = "connections")]
pub mod connections;
#[cfg(feature = "loggers")]
pub mod loggers;
#[cfg(feature = "retrieve")]
pub mod retrieve;

pub use errors::{TapError, TapResult};
