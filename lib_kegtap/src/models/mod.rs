//! # Wire & Domain Models
//!
//! Types exchanged between the ledger store, the REST server and tap devices.
//!
//! - **`beer`**: Beer metadata and the admin input used to create or edit it.
//! - **`tap`**: Tap rows, the joined `TapInfo` answer devices poll for, and admin inputs.
//! - **`pour`**: Pour event requests and acknowledgements, parsed leniently from JSON
//!   so that missing fields produce precise 400 messages instead of generic rejections.

/// Beer metadata.
pub mod beer;
/// Pour event requests and acknowledgements.
pub mod pour;
/// Tap state and query answers.
pub mod tap;

pub use beer::{Beer, BeerInput};
pub use pour::{PourEvent, PourEventAck, PourReceipt, VolumeAck};
pub use tap::{NewTap, Tap, TapInfo, TapUpdate};
