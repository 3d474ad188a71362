//! Core value types: coordinates, places, observations, and intervals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::IntervalId;

/// Location name recorded when an observation matches no known place.
pub const WORLD: &str = "World";

// ---------------------------------------------------------------------------
// Coordinate
// ---------------------------------------------------------------------------

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Coordinate {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lon: f64,
}

impl Coordinate {
    /// Create a coordinate from latitude and longitude in degrees.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

// ---------------------------------------------------------------------------
// Place
// ---------------------------------------------------------------------------

/// A named circular region in the place catalog.
///
/// Places are immutable once loaded. The catalog replaces the whole set
/// on refresh rather than editing individual entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Place {
    /// Display name, recorded verbatim as the interval location.
    pub name: String,
    /// Center of the circle.
    pub center: Coordinate,
    /// Circle radius in meters.
    pub radius: f64,
}

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// A single location ping as received from the device.
///
/// Observations are transient: they are classified and folded into the
/// timeline, never stored as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Reported position.
    pub position: Coordinate,
    /// Reported horizontal accuracy in meters (radius of uncertainty).
    pub accuracy: f64,
    /// Instant the fix was taken, as reported by the device.
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Interval
// ---------------------------------------------------------------------------

/// A contiguous stretch of time spent at one location.
///
/// `duration_ms` always equals `end_time - start_time` in milliseconds.
/// A freshly inserted interval has `start_time == end_time` and a zero
/// duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Interval {
    /// Unique interval identifier.
    pub id: IntervalId,
    /// Place name, or [`WORLD`] when no place matched.
    pub location: String,
    /// Timestamp of the first observation in the interval.
    pub start_time: DateTime<Utc>,
    /// Timestamp of the most recent observation folded into the interval.
    pub end_time: DateTime<Utc>,
    /// Span between `start_time` and `end_time` in milliseconds.
    pub duration_ms: i64,
    /// Wall-clock time the interval row was created.
    pub fetched_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn place_decodes_from_catalog_shape() {
        let json = r#"{"name":"Home","center":{"lat":10.0,"lon":10.0},"radius":50}"#;
        let place: Place = serde_json::from_str(json).unwrap();
        assert_eq!(place.name, "Home");
        assert!((place.center.lat - 10.0).abs() < f64::EPSILON);
        assert!((place.radius - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn place_without_radius_is_rejected() {
        let json = r#"{"name":"Home","center":{"lat":10.0,"lon":10.0}}"#;
        assert!(serde_json::from_str::<Place>(json).is_err());
    }

    #[test]
    fn interval_serializes_with_snake_case_fields() {
        let now = Utc::now();
        let interval = Interval {
            id: IntervalId::new(),
            location: String::from(WORLD),
            start_time: now,
            end_time: now,
            duration_ms: 0,
            fetched_at: now,
        };
        let value = serde_json::to_value(&interval).unwrap();
        assert_eq!(value["location"], "World");
        assert_eq!(value["duration_ms"], 0);
        assert!(value.get("start_time").is_some());
    }
}
