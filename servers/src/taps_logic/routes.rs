//! # Tap API Handlers
//!
//! Device-facing endpoints (`/api/tap/{tap_id}` and its pour/volume actions) and the
//! admin JSON surface for beers and taps.
//!
//! Device endpoints read the body as raw bytes and parse it themselves, so a missing
//! or malformed field is answered with the exact 400 message clients rely on rather
//! than a generic extractor rejection.

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use lib_kegtap::{
    TapError,
    models::{
        Beer, BeerInput, NewTap, PourEvent, PourEventAck, Tap, TapInfo, TapUpdate, VolumeAck,
        pour::{parse_pour_time, parse_volume},
    },
};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::error::AppError;
use super::state::AppState;

type Shared = State<Arc<AppState>>;

/// Decodes a device request body; anything that is not JSON counts as empty.
fn json_body(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

/// `GET /api/tap/{tap_id}`
pub async fn get_tap(
    State(state): Shared,
    Path(tap_id): Path<String>,
) -> Result<Json<TapInfo>, AppError> {
    Ok(Json(state.db.get_tap(&tap_id).await?))
}

/// `POST /api/tap/{tap_id}/pour_event`
pub async fn pour_event(
    State(state): Shared,
    Path(tap_id): Path<String>,
    body: Bytes,
) -> Result<Json<PourEventAck>, AppError> {
    let event = PourEvent::from_json(&json_body(&body))?;
    debug!(tap_id = %tap_id, event = event.kind(), "Pour event received");

    let ack = match event {
        PourEvent::Start => {
            state.db.report_pour_start(&tap_id).await?;
            PourEventAck::started()
        }
        PourEvent::Stop {
            duration_secs,
            report_id,
        } => {
            let receipt = state
                .db
                .report_pour(&tap_id, duration_secs, report_id.as_deref())
                .await?;
            PourEventAck::stopped(receipt)
        }
    };
    Ok(Json(ack))
}

/// `POST /api/tap/{tap_id}/update_volume`
pub async fn update_volume(
    State(state): Shared,
    Path(tap_id): Path<String>,
    body: Bytes,
) -> Result<Json<VolumeAck>, AppError> {
    let pour_time = parse_pour_time(&json_body(&body))?;
    let outcome = state.db.update_volume(&tap_id, pour_time).await?;
    Ok(Json(VolumeAck {
        success: true,
        new_volume: outcome.new_volume,
    }))
}

/// `POST /api/tap/{tap_id}/set_volume`
pub async fn set_volume(
    State(state): Shared,
    Path(tap_id): Path<String>,
    body: Bytes,
) -> Result<Json<VolumeAck>, AppError> {
    let volume = parse_volume(&json_body(&body))?;
    let new_volume = state.db.set_volume_absolute(&tap_id, volume).await?;
    Ok(Json(VolumeAck {
        success: true,
        new_volume,
    }))
}

/// `GET /api/tap/{tap_id}/image`
///
/// Streams the stored image of the tap's beer, or `default.jpg` when it has none.
/// `width`/`height` query parameters are accepted and ignored: images are served as
/// stored.
pub async fn tap_image(
    State(state): Shared,
    Path(tap_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let info = state.db.get_tap(&tap_id).await?;
    let stored = info.image_path.as_deref().unwrap_or("default.jpg");

    // Only the file name is honoured; stored paths never escape the image directory.
    let Some(file_name) = FsPath::new(stored).file_name() else {
        return Err(TapError::NotFound("Image not found".into()).into());
    };
    let path = state.image_dir.join(file_name);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(tap_id = %tap_id, path = %path.display(), error = %e, "Image unavailable");
            return Err(TapError::NotFound("Image not found".into()).into());
        }
    };

    let content_type = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("png") => "image/png",
        _ => "image/jpeg",
    };
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}

/// `GET /api/beers`
pub async fn list_beers(State(state): Shared) -> Result<Json<Vec<Beer>>, AppError> {
    Ok(Json(state.db.list_beers().await?))
}

/// `POST /api/beers`
pub async fn add_beer(
    State(state): Shared,
    payload: Result<Json<BeerInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Beer>), AppError> {
    let Json(input) = payload?;
    let beer = state.db.add_beer(input).await?;
    Ok((StatusCode::CREATED, Json(beer)))
}

/// `PUT /api/beers/{id}`
pub async fn edit_beer(
    State(state): Shared,
    Path(id): Path<i64>,
    payload: Result<Json<BeerInput>, JsonRejection>,
) -> Result<Json<Beer>, AppError> {
    let Json(input) = payload?;
    Ok(Json(state.db.edit_beer(id, input).await?))
}

/// `GET /api/taps`
pub async fn list_taps(State(state): Shared) -> Result<Json<Vec<Tap>>, AppError> {
    Ok(Json(state.db.list_taps().await?))
}

/// `POST /api/taps`
pub async fn add_tap(
    State(state): Shared,
    payload: Result<Json<NewTap>, JsonRejection>,
) -> Result<(StatusCode, Json<Tap>), AppError> {
    let Json(new_tap) = payload?;
    let tap = state.db.add_tap(new_tap).await?;
    Ok((StatusCode::CREATED, Json(tap)))
}

/// `PUT /api/taps/{tap_id}`
pub async fn edit_tap(
    State(state): Shared,
    Path(tap_id): Path<String>,
    payload: Result<Json<TapUpdate>, JsonRejection>,
) -> Result<Json<Tap>, AppError> {
    let Json(update) = payload?;
    Ok(Json(state.db.edit_tap(&tap_id, update).await?))
}

/// `GET /health`
pub async fn health(State(state): Shared) -> impl IntoResponse {
    match state.db.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}
