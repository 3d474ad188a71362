//! The interval identifier.
//!
//! Intervals use UUID v7 (time-ordered) identifiers generated on the
//! application side, so an insert never needs a round-trip to learn the
//! new row's key and the primary-key index stays append-friendly.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Unique identifier for a stored presence interval.
///
/// A newtype struct, so it serializes as the bare UUID string, matching
/// the `presence_intervals.id` column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct IntervalId(pub Uuid);

impl IntervalId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value, e.g. for binding to a query.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for IntervalId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for IntervalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for IntervalId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_time_ordered() {
        let first = IntervalId::new();
        let second = IntervalId::new();
        assert!(first < second);
    }

    #[test]
    fn id_serializes_as_bare_uuid() {
        let id = IntervalId::new();
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{id}\""));
    }
}
