//! # Core Engine Module
//!
//! The I/O-free heart of the keg tap system. Everything in here is deterministic:
//! time is passed in by the caller, and persistence and networking live elsewhere.
//!
//! ## Core Components:
//!
//! - **`pulse_counter`**: The lock-free tally an interrupt handler increments. It
//!   decides, exactly once per idle period, when the pulse count has crossed the
//!   flow detection threshold.
//!
//! - **`flow_machine`**: The `Idle`/`Active` state machine that turns threshold
//!   crossings and periodic window checks into pour start and stop events.
//!
//! - **`ledger`**: Volume arithmetic for pour reports (`poured = duration * flow_rate`,
//!   clamped at zero) and input validation shared by the store and the HTTP layer.
//!
//! - **`keg_level`**: Remaining percentage and LED level bar computations for the
//!   device display.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Lock-free pulse tally with exactly-once threshold detection.
pub mod pulse_counter;
/// The `Idle`/`Active` pour detection state machine.
pub mod flow_machine;
/// Pour volume arithmetic and input validation.
pub mod ledger;
/// Remaining percentage and LED bar computations.
pub mod keg_level;

// --- Public API Re-exports ---
pub use pulse_counter::{PulseCounter, FLOW_DETECTION_THRESHOLD};
pub use flow_machine::{FlowEvent, FlowState, FlowStateMachine, FLOW_TIMEOUT};
pub use ledger::PourOutcome;
pub use keg_level::{LedColor, StatusColor};
