//! HTTP endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/log` | Ingest one GPS ping (`lat`, `lon`, `acc`, `time`) |
//! | `GET` | `/health` | Liveness plus catalog size |
//! | `GET` | `/api/places` | Current place catalog snapshot |
//! | `GET` | `/api/intervals` | Most recent intervals (`?limit=N`) |
//! | `GET` | `/api/intervals/latest` | The interval with the latest start |

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use presence_types::{Coordinate, Observation};

use crate::error::ApiError;
use crate::state::AppState;

/// Default number of intervals returned by `GET /api/intervals`.
pub const DEFAULT_INTERVAL_LIMIT: u32 = 50;

/// Upper bound on `limit` for `GET /api/intervals`.
pub const MAX_INTERVAL_LIMIT: u32 = 500;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Raw query parameters for `POST /log`.
///
/// Kept as strings so each field can be validated individually and a bad
/// value always maps to a bodyless `400`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct LogQuery {
    /// Latitude in degrees.
    pub lat: Option<String>,
    /// Longitude in degrees.
    pub lon: Option<String>,
    /// Horizontal accuracy in meters.
    pub acc: Option<String>,
    /// RFC 3339 timestamp of the fix.
    pub time: Option<String>,
}

impl LogQuery {
    /// Validate and convert the raw parameters into an [`Observation`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidParameter`] naming the first parameter
    /// that is missing, not a finite number, out of range, or (for
    /// `time`) not RFC 3339.
    pub fn into_observation(self) -> Result<Observation, ApiError> {
        let lat = parse_number("lat", self.lat.as_deref())?;
        let lon = parse_number("lon", self.lon.as_deref())?;
        let accuracy = parse_number("acc", self.acc.as_deref())?;

        if !(-90.0..=90.0).contains(&lat) {
            return Err(ApiError::InvalidParameter(format!("lat out of range: {lat}")));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(ApiError::InvalidParameter(format!("lon out of range: {lon}")));
        }
        if accuracy < 0.0 {
            return Err(ApiError::InvalidParameter(format!(
                "acc must not be negative: {accuracy}"
            )));
        }

        let raw_time = self
            .time
            .ok_or_else(|| ApiError::InvalidParameter(String::from("missing time")))?;
        let timestamp = DateTime::parse_from_rfc3339(raw_time.trim())
            .map_err(|e| ApiError::InvalidParameter(format!("badly formatted time: {e}")))?
            .with_timezone(&Utc);

        Ok(Observation {
            position: Coordinate::new(lat, lon),
            accuracy,
            timestamp,
        })
    }
}

fn parse_number(name: &str, raw: Option<&str>) -> Result<f64, ApiError> {
    let raw = raw.ok_or_else(|| ApiError::InvalidParameter(format!("missing {name}")))?;
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|e| ApiError::InvalidParameter(format!("badly formatted {name}: {e}")))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ApiError::InvalidParameter(format!("{name} is not finite")))
    }
}

/// Query parameters for `GET /api/intervals`.
#[derive(Debug, serde::Deserialize)]
pub struct IntervalsQuery {
    /// Maximum number of intervals to return.
    pub limit: Option<u32>,
}

// ---------------------------------------------------------------------------
// POST /log -- ingest one observation
// ---------------------------------------------------------------------------

/// Ingest one GPS ping.
///
/// Responds `200` with an empty body on success, including when the ping
/// is dropped for low accuracy or discarded as stale. A query string that
/// does not even decode (e.g. a repeated `lat`) is a bodyless `400` too.
pub async fn log_position(
    State(state): State<Arc<AppState>>,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) =
        query.map_err(|e| ApiError::InvalidParameter(format!("malformed query: {e}")))?;
    let observation = query.into_observation()?;
    let outcome = state.recorder.record(&observation).await?;

    tracing::debug!(
        outcome = outcome.label(),
        accuracy = observation.accuracy,
        timestamp = %observation.timestamp,
        "Observation ingested"
    );

    Ok(StatusCode::OK)
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Report liveness and the number of places in the catalog.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let places = state.recorder.catalog().len().await;
    Json(serde_json::json!({
        "status": "ok",
        "places": places,
        "timeline_backend": state.recorder.intervals().name(),
    }))
}

// ---------------------------------------------------------------------------
// GET /api/places
// ---------------------------------------------------------------------------

/// Return the current place catalog, in catalog (matching) order.
pub async fn list_places(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let places = state.recorder.catalog().snapshot().await;
    Ok(Json(serde_json::to_value(&*places)?))
}

// ---------------------------------------------------------------------------
// GET /api/intervals
// ---------------------------------------------------------------------------

/// Return the most recent intervals, newest first.
///
/// # Query Parameters
///
/// - `limit`: 1 to 500 (default 50); larger values are clamped
pub async fn list_intervals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IntervalsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_INTERVAL_LIMIT)
        .clamp(1, MAX_INTERVAL_LIMIT);
    let intervals = state.recorder.intervals().recent(limit).await?;
    Ok(Json(serde_json::to_value(intervals)?))
}

// ---------------------------------------------------------------------------
// GET /api/intervals/latest
// ---------------------------------------------------------------------------

/// Return the interval with the greatest start time.
pub async fn latest_interval(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let latest = state
        .recorder
        .intervals()
        .latest()
        .await?
        .ok_or_else(|| ApiError::NotFound(String::from("timeline is empty")))?;
    Ok(Json(serde_json::to_value(latest)?))
}
