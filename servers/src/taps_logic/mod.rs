//! # Tap Server Logic
//!
//! The HTTP face of the volume ledger and the tap query service.
//!
//! ## Core Responsibilities:
//! - **Device API**: tap lookups, pour start/stop reports and direct volume updates
//!   under `/api/tap/{tap_id}`.
//! - **Admin API**: JSON CRUD for beers (`/api/beers`) and taps (`/api/taps`).
//! - **Health**: `/health` answers once the store does.
//! - **Configuration**: defaults, JSON config file, then environment and CLI flags.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use state::AppState;

/// Builds the full router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/tap/{tap_id}", get(routes::get_tap))
        .route("/api/tap/{tap_id}/pour_event", post(routes::pour_event))
        .route("/api/tap/{tap_id}/update_volume", post(routes::update_volume))
        .route("/api/tap/{tap_id}/set_volume", post(routes::set_volume))
        .route("/api/tap/{tap_id}/image", get(routes::tap_image))
        .route("/api/beers", get(routes::list_beers).post(routes::add_beer))
        .route("/api/beers/{id}", put(routes::edit_beer))
        .route("/api/taps", get(routes::list_taps).post(routes::add_tap))
        .route("/api/taps/{tap_id}", put(routes::edit_tap))
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
