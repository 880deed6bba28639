//! # Data Retrieval Module
//!
//! HTTP plumbing for devices talking to the tap server.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: A generic HTTP `ApiClient` built on `reqwest` and
//!   `reqwest-middleware`, featuring automatic retries with exponential
//!   backoff and standardized JSON response handling.
//! - **`tap_api`**: The typed client for the tap REST surface (`fetch_tap_info`,
//!   `report_pour_event`), mapping transport failures onto `TapError`.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Generic HTTP API client with retry middleware for resilient network requests.
pub mod ky_http;
/// Typed client for the tap server.
pub mod tap_api;

pub use ky_http::{ApiClient, ApiResponse, ClientOptions};
pub use tap_api::TapApi;
