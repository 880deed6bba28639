//! # Keg Tap Servers
//!
//! Library half of the `servers` crate, so the HTTP surface can be mounted by the
//! `server_taps` binary and by integration tests alike.

pub mod taps_logic;
