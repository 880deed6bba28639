use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lib_kegtap::TapError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// # Application Error
///
/// Everything a handler can fail with. Converts into a JSON body of the form
/// `{"error": "<message>"}` with a status matching the error class.
#[derive(Debug, Error)]
pub enum AppError {
    /// A ledger, store or validation error.
    #[error(transparent)]
    Tap(#[from] TapError),
    /// The body of an admin request could not be decoded.
    #[error("{}", .0.body_text())]
    Body(#[from] JsonRejection),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Tap(TapError::NotFound(msg)) => (StatusCode::NOT_FOUND, msg),
            AppError::Tap(TapError::InvalidRequest(msg)) => (StatusCode::BAD_REQUEST, msg),
            AppError::Tap(TapError::TransientNetwork(msg)) => {
                warn!("Upstream failure: {}", msg);
                (StatusCode::BAD_GATEWAY, "Upstream service unavailable".to_string())
            }
            AppError::Tap(TapError::Persistence(msg)) => {
                // Store details stay in the log.
                error!("Persistence failure: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Body(rejection) => (StatusCode::BAD_REQUEST, rejection.body_text()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
