//! The presence-interval compaction rule.
//!
//! Each classified observation is folded into the timeline using only the
//! single most recent interval as state. [`decide`] is a pure function: it
//! reads the latest interval and returns the one mutation to apply, leaving
//! the actual write to the caller.
//!
//! # Rules
//!
//! 1. If the latest interval ends after the observation, the observation
//!    is stale (reordered or late delivery) and is discarded. An
//!    observation at exactly the latest end is not stale: at the same
//!    place it extends to the same instant, which changes nothing.
//! 2. If there is no latest interval, the location changed, or the silence
//!    since the latest interval's end exceeds the policy's maximum gap, a
//!    new zero-length interval is inserted.
//! 3. Otherwise the latest interval is extended to the observation time and
//!    its duration recomputed from its original start.
//!
//! Intervals are never split or merged after the fact.

use chrono::{DateTime, TimeDelta, Utc};
use presence_types::{Interval, IntervalId};

/// Default silence (3 hours, in seconds) after which a return to the same
/// place starts a new visit.
pub const DEFAULT_MAX_GAP_SECS: i64 = 10_800;

/// Tunable parameters of the compaction rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionPolicy {
    /// Longest silence at the same place that still extends the interval.
    pub max_gap: TimeDelta,
}

impl CompactionPolicy {
    /// Create a policy with the given maximum gap.
    pub const fn new(max_gap: TimeDelta) -> Self {
        Self { max_gap }
    }
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self::new(TimeDelta::seconds(DEFAULT_MAX_GAP_SECS))
    }
}

/// Why an observation was dropped without touching the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// The observation is earlier than the latest interval's end.
    OutOfOrder,
}

/// Why a new interval is started instead of extending the latest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertReason {
    /// The timeline is empty.
    FirstInterval,
    /// The observation was classified at a different location.
    LocationChanged,
    /// Same location, but the silence exceeded the maximum gap.
    GapExceeded,
}

impl InsertReason {
    /// Short label for structured logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstInterval => "first_interval",
            Self::LocationChanged => "location_changed",
            Self::GapExceeded => "gap_exceeded",
        }
    }
}

/// The single timeline mutation chosen for one observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Leave the timeline untouched.
    Discard(DiscardReason),
    /// Append a new zero-length interval starting at `start_time`.
    Insert {
        /// Location of the new interval.
        location: String,
        /// Start (and end) of the new interval.
        start_time: DateTime<Utc>,
        /// Which rule triggered the insert.
        reason: InsertReason,
    },
    /// Stretch an existing interval forward.
    Extend {
        /// The interval to update.
        id: IntervalId,
        /// New end of the interval.
        end_time: DateTime<Utc>,
        /// Milliseconds from the interval's original start to `end_time`.
        duration_ms: i64,
    },
}

/// Choose the mutation for an observation at `location` taken at
/// `record_time`, given the current latest interval.
pub fn decide(
    location: &str,
    record_time: DateTime<Utc>,
    latest: Option<&Interval>,
    policy: &CompactionPolicy,
) -> Decision {
    let Some(latest) = latest else {
        return insert(location, record_time, InsertReason::FirstInterval);
    };

    if record_time < latest.end_time {
        return Decision::Discard(DiscardReason::OutOfOrder);
    }

    if latest.location != location {
        return insert(location, record_time, InsertReason::LocationChanged);
    }

    if record_time.signed_duration_since(latest.end_time) > policy.max_gap {
        return insert(location, record_time, InsertReason::GapExceeded);
    }

    Decision::Extend {
        id: latest.id,
        end_time: record_time,
        duration_ms: record_time
            .signed_duration_since(latest.start_time)
            .num_milliseconds(),
    }
}

fn insert(location: &str, start_time: DateTime<Utc>, reason: InsertReason) -> Decision {
    Decision::Insert {
        location: location.to_owned(),
        start_time,
        reason,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn interval(location: &str, start: &str, end: &str) -> Interval {
        let start_time = at(start);
        let end_time = at(end);
        Interval {
            id: IntervalId::new(),
            location: location.to_owned(),
            start_time,
            end_time,
            duration_ms: end_time.signed_duration_since(start_time).num_milliseconds(),
            fetched_at: start_time,
        }
    }

    #[test]
    fn empty_timeline_inserts() {
        let t = at("2024-05-01T08:00:00Z");
        let decision = decide("Home", t, None, &CompactionPolicy::default());
        assert_eq!(
            decision,
            Decision::Insert {
                location: String::from("Home"),
                start_time: t,
                reason: InsertReason::FirstInterval,
            }
        );
    }

    #[test]
    fn same_place_within_gap_extends_from_original_start() {
        let latest = interval("Home", "2024-05-01T08:00:00Z", "2024-05-01T09:00:00Z");
        let t2 = at("2024-05-01T11:30:00Z");
        let decision = decide("Home", t2, Some(&latest), &CompactionPolicy::default());
        assert_eq!(
            decision,
            Decision::Extend {
                id: latest.id,
                end_time: t2,
                duration_ms: 3 * 3_600_000 + 30 * 60_000,
            }
        );
    }

    #[test]
    fn gap_of_exactly_max_still_extends() {
        let latest = interval("Home", "2024-05-01T08:00:00Z", "2024-05-01T09:00:00Z");
        let t2 = at("2024-05-01T12:00:00Z");
        let decision = decide("Home", t2, Some(&latest), &CompactionPolicy::default());
        assert!(matches!(decision, Decision::Extend { .. }));
    }

    #[test]
    fn gap_over_max_inserts_new_visit() {
        let latest = interval("Home", "2024-05-01T08:00:00Z", "2024-05-01T09:00:00Z");
        let t2 = at("2024-05-01T12:00:01Z");
        let decision = decide("Home", t2, Some(&latest), &CompactionPolicy::default());
        assert_eq!(
            decision,
            Decision::Insert {
                location: String::from("Home"),
                start_time: t2,
                reason: InsertReason::GapExceeded,
            }
        );
    }

    #[test]
    fn place_change_inserts() {
        let latest = interval("Home", "2024-05-01T08:00:00Z", "2024-05-01T09:00:00Z");
        let t2 = at("2024-05-01T09:05:00Z");
        let decision = decide("Office", t2, Some(&latest), &CompactionPolicy::default());
        assert_eq!(
            decision,
            Decision::Insert {
                location: String::from("Office"),
                start_time: t2,
                reason: InsertReason::LocationChanged,
            }
        );
    }

    #[test]
    fn older_observation_is_discarded() {
        let latest = interval("Home", "2024-05-01T08:00:00Z", "2024-05-01T09:00:00Z");
        let t = at("2024-05-01T08:30:00Z");
        assert_eq!(
            decide("Office", t, Some(&latest), &CompactionPolicy::default()),
            Decision::Discard(DiscardReason::OutOfOrder)
        );
    }

    #[test]
    fn duplicate_timestamp_extends_without_change() {
        let latest = interval("Home", "2024-05-01T08:00:00Z", "2024-05-01T09:00:00Z");
        let t = at("2024-05-01T09:00:00Z");
        assert_eq!(
            decide("Home", t, Some(&latest), &CompactionPolicy::default()),
            Decision::Extend {
                id: latest.id,
                end_time: latest.end_time,
                duration_ms: latest.duration_ms,
            }
        );
    }

    #[test]
    fn place_change_at_same_instant_inserts() {
        let latest = interval("Home", "2024-05-01T08:00:00Z", "2024-05-01T09:00:00Z");
        let t = at("2024-05-01T09:00:00Z");
        assert_eq!(
            decide("Office", t, Some(&latest), &CompactionPolicy::default()),
            Decision::Insert {
                location: String::from("Office"),
                start_time: t,
                reason: InsertReason::LocationChanged,
            }
        );
    }

    #[test]
    fn discard_takes_precedence_over_place_change() {
        let latest = interval("Home", "2024-05-01T08:00:00Z", "2024-05-01T09:00:00Z");
        let t = at("2024-05-01T07:00:00Z");
        assert!(matches!(
            decide("Office", t, Some(&latest), &CompactionPolicy::default()),
            Decision::Discard(_)
        ));
    }

    #[test]
    fn custom_policy_gap() {
        let policy = CompactionPolicy::new(TimeDelta::minutes(10));
        let latest = interval("Home", "2024-05-01T08:00:00Z", "2024-05-01T08:00:00Z");
        let near = at("2024-05-01T08:09:00Z");
        let far = at("2024-05-01T08:11:00Z");
        assert!(matches!(
            decide("Home", near, Some(&latest), &policy),
            Decision::Extend { .. }
        ));
        assert!(matches!(
            decide("Home", far, Some(&latest), &policy),
            Decision::Insert {
                reason: InsertReason::GapExceeded,
                ..
            }
        ));
    }
}
