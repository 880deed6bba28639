//! # Keg Tap Device
//!
//! Library half of the `device` crate: the runtime a tap monitor runs, split out
//! so the binary and the integration tests share it.

pub mod monitor_logic;
