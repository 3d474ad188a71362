//! The ingestion pipeline: one GPS ping in, at most one timeline write out.
//!
//! [`Recorder::record`] drops low-accuracy pings, classifies the rest
//! against the current catalog snapshot, and then runs the
//! read-decide-write sequence on the timeline. That sequence is serialized
//! by a single lock: the service stores exactly one timeline, so two
//! concurrent pings must never both read the same latest interval and
//! both act on it.

use chrono::{DateTime, Utc};
use presence_core::{CompactionPolicy, Decision, PlaceCatalog, decide, match_location};
use presence_db::{ConfigBackend, DbError, IntervalBackend};
use presence_types::{Interval, IntervalId, Observation};
use tokio::sync::Mutex;

/// Default accuracy (meters) above which a ping is not worth recording.
pub const DEFAULT_MAX_ACCURACY_M: f64 = 70.0;

/// What happened to an ingested observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Reported accuracy was too coarse; the timeline was not read.
    DroppedLowAccuracy,
    /// Earlier than the latest interval's end; nothing written.
    Discarded {
        /// Location the observation was classified at.
        location: String,
    },
    /// A new interval was started.
    Inserted(Interval),
    /// The latest interval was stretched forward.
    Extended {
        /// The extended interval.
        id: IntervalId,
        /// Location of the extended interval.
        location: String,
        /// New end time.
        end_time: DateTime<Utc>,
        /// New duration from the interval's original start.
        duration_ms: i64,
    },
}

impl IngestOutcome {
    /// Short label for structured logging.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::DroppedLowAccuracy => "dropped_low_accuracy",
            Self::Discarded { .. } => "discarded",
            Self::Inserted(_) => "inserted",
            Self::Extended { .. } => "extended",
        }
    }
}

/// Folds observations into the stored presence timeline.
pub struct Recorder {
    catalog: PlaceCatalog,
    intervals: IntervalBackend,
    config: ConfigBackend,
    policy: CompactionPolicy,
    max_accuracy_m: f64,
    timeline_lock: Mutex<()>,
}

impl Recorder {
    /// Create a recorder with the default compaction policy and accuracy
    /// threshold.
    pub fn new(catalog: PlaceCatalog, intervals: IntervalBackend, config: ConfigBackend) -> Self {
        Self {
            catalog,
            intervals,
            config,
            policy: CompactionPolicy::default(),
            max_accuracy_m: DEFAULT_MAX_ACCURACY_M,
            timeline_lock: Mutex::new(()),
        }
    }

    /// Use the given compaction policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: CompactionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use the given accuracy threshold in meters.
    #[must_use]
    pub const fn with_max_accuracy(mut self, max_accuracy_m: f64) -> Self {
        self.max_accuracy_m = max_accuracy_m;
        self
    }

    /// The place catalog handle this recorder classifies against.
    pub const fn catalog(&self) -> &PlaceCatalog {
        &self.catalog
    }

    /// The timeline store.
    pub const fn intervals(&self) -> &IntervalBackend {
        &self.intervals
    }

    /// Ingest one observation.
    ///
    /// Low-accuracy and stale observations are not errors: they return
    /// `Ok` with the corresponding [`IngestOutcome`]. Every successful
    /// call also refreshes the `lastFetched` bookkeeping timestamp; a
    /// failure of that bookkeeping write is logged but does not fail the
    /// call.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if reading or writing the timeline fails or
    /// times out. The timeline is left untouched in that case beyond the
    /// single atomic write that may already have completed.
    pub async fn record(&self, observation: &Observation) -> Result<IngestOutcome, DbError> {
        let outcome = if self.is_too_coarse(observation.accuracy) {
            tracing::debug!(
                accuracy = observation.accuracy,
                max_accuracy = self.max_accuracy_m,
                "Dropping low-accuracy observation"
            );
            IngestOutcome::DroppedLowAccuracy
        } else {
            let places = self.catalog.snapshot().await;
            let location = match_location(observation, &places);
            self.fold(location, observation.timestamp).await?
        };

        self.touch_last_fetched().await;

        Ok(outcome)
    }

    fn is_too_coarse(&self, accuracy: f64) -> bool {
        accuracy.is_nan() || accuracy > self.max_accuracy_m
    }

    /// Read the latest interval, decide, and apply the decision, all under
    /// the timeline lock.
    async fn fold(
        &self,
        location: &str,
        record_time: DateTime<Utc>,
    ) -> Result<IngestOutcome, DbError> {
        let _guard = self.timeline_lock.lock().await;

        let latest = self.intervals.latest().await?;

        match decide(location, record_time, latest.as_ref(), &self.policy) {
            Decision::Discard(reason) => {
                tracing::debug!(
                    location,
                    %record_time,
                    ?reason,
                    "Discarding stale observation"
                );
                Ok(IngestOutcome::Discarded {
                    location: location.to_owned(),
                })
            }
            Decision::Insert {
                location,
                start_time,
                reason,
            } => {
                let interval = self.intervals.insert(&location, start_time).await?;
                tracing::info!(
                    interval_id = %interval.id,
                    location = interval.location,
                    %start_time,
                    reason = reason.as_str(),
                    "Started new presence interval"
                );
                Ok(IngestOutcome::Inserted(interval))
            }
            Decision::Extend {
                id,
                end_time,
                duration_ms,
            } => {
                self.intervals.extend(id, end_time, duration_ms).await?;
                tracing::debug!(
                    interval_id = %id,
                    location,
                    %end_time,
                    duration_ms,
                    "Extended presence interval"
                );
                Ok(IngestOutcome::Extended {
                    id,
                    location: location.to_owned(),
                    end_time,
                    duration_ms,
                })
            }
        }
    }

    async fn touch_last_fetched(&self) {
        if let Err(e) = self.config.record_last_fetched(Utc::now()).await {
            tracing::warn!(error = %e, "Failed to record lastFetched bookkeeping");
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeDelta;
    use presence_db::{MemoryConfigStore, MemoryIntervalStore};
    use presence_types::{Coordinate, Place, WORLD};

    use super::*;

    const HOME: Coordinate = Coordinate::new(10.0, 10.0);
    const OFFICE: Coordinate = Coordinate::new(10.1, 10.0);

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn observe(position: Coordinate, accuracy: f64, timestamp: DateTime<Utc>) -> Observation {
        Observation {
            position,
            accuracy,
            timestamp,
        }
    }

    struct Fixture {
        recorder: Recorder,
        intervals: MemoryIntervalStore,
        config: MemoryConfigStore,
    }

    fn fixture() -> Fixture {
        let places = vec![
            Place {
                name: String::from("Home"),
                center: HOME,
                radius: 50.0,
            },
            Place {
                name: String::from("Office"),
                center: OFFICE,
                radius: 100.0,
            },
        ];
        let intervals = MemoryIntervalStore::new();
        let config = MemoryConfigStore::with_places(places.clone());
        let recorder = Recorder::new(
            PlaceCatalog::new(places),
            IntervalBackend::from(intervals.clone()),
            ConfigBackend::from(config.clone()),
        );
        Fixture {
            recorder,
            intervals,
            config,
        }
    }

    #[tokio::test]
    async fn first_observation_inserts() {
        let f = fixture();
        let t = at("2024-05-01T08:00:00Z");
        let outcome = f.recorder.record(&observe(HOME, 10.0, t)).await.unwrap();

        let IngestOutcome::Inserted(interval) = outcome else {
            panic!("expected insert, got {outcome:?}");
        };
        assert_eq!(interval.location, "Home");
        assert_eq!(interval.start_time, t);
        assert_eq!(interval.duration_ms, 0);
        assert_eq!(f.intervals.all().await.len(), 1);
    }

    #[tokio::test]
    async fn low_accuracy_is_dropped_without_touching_timeline() {
        let f = fixture();
        let outcome = f
            .recorder
            .record(&observe(HOME, 70.5, at("2024-05-01T08:00:00Z")))
            .await
            .unwrap();
        assert_eq!(outcome, IngestOutcome::DroppedLowAccuracy);
        assert!(f.intervals.all().await.is_empty());
        // Still counts as a successful request for bookkeeping.
        assert!(f.config.last_fetched().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn accuracy_at_threshold_is_kept() {
        let f = fixture();
        let outcome = f
            .recorder
            .record(&observe(HOME, 70.0, at("2024-05-01T08:00:00Z")))
            .await
            .unwrap();
        assert!(matches!(outcome, IngestOutcome::Inserted(_)));
    }

    #[tokio::test]
    async fn steady_state_extends_from_original_start() {
        let f = fixture();
        let t0 = at("2024-05-01T08:00:00Z");
        let t1 = t0 + TimeDelta::minutes(10);
        let t2 = t1 + TimeDelta::hours(2);

        f.recorder.record(&observe(HOME, 5.0, t0)).await.unwrap();
        f.recorder.record(&observe(HOME, 5.0, t1)).await.unwrap();
        let outcome = f.recorder.record(&observe(HOME, 5.0, t2)).await.unwrap();

        assert!(matches!(outcome, IngestOutcome::Extended { .. }));
        let all = f.intervals.all().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].start_time, t0);
        assert_eq!(all[0].end_time, t2);
        assert_eq!(
            all[0].duration_ms,
            t2.signed_duration_since(t0).num_milliseconds()
        );
    }

    #[tokio::test]
    async fn duplicate_leaves_interval_unchanged() {
        let f = fixture();
        let t0 = at("2024-05-01T08:00:00Z");
        let t1 = at("2024-05-01T08:20:00Z");
        f.recorder.record(&observe(HOME, 5.0, t0)).await.unwrap();
        f.recorder.record(&observe(HOME, 5.0, t1)).await.unwrap();
        let before = f.intervals.all().await;

        let outcome = f.recorder.record(&observe(HOME, 5.0, t1)).await.unwrap();

        assert!(matches!(outcome, IngestOutcome::Extended { end_time, .. } if end_time == t1));
        let after = f.intervals.all().await;
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].end_time, before[0].end_time);
        assert_eq!(after[0].duration_ms, before[0].duration_ms);
    }

    #[tokio::test]
    async fn earlier_ping_is_discarded() {
        let f = fixture();
        f.recorder
            .record(&observe(HOME, 5.0, at("2024-05-01T08:20:00Z")))
            .await
            .unwrap();
        let outcome = f
            .recorder
            .record(&observe(OFFICE, 5.0, at("2024-05-01T08:19:59Z")))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            IngestOutcome::Discarded {
                location: String::from("Office")
            }
        );
        assert_eq!(f.intervals.all().await.len(), 1);
    }

    #[tokio::test]
    async fn place_change_at_same_instant_starts_interval() {
        let f = fixture();
        let t = at("2024-05-01T08:00:00Z");
        f.recorder.record(&observe(HOME, 5.0, t)).await.unwrap();
        let outcome = f.recorder.record(&observe(OFFICE, 5.0, t)).await.unwrap();

        assert!(matches!(outcome, IngestOutcome::Inserted(ref i) if i.location == "Office"));
        let all = f.intervals.all().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].end_time, t);
        assert_eq!(all[1].start_time, t);
    }

    #[tokio::test]
    async fn gap_and_place_change_start_new_intervals() {
        let f = fixture();
        let t0 = at("2024-05-01T08:00:00Z");
        let after_gap = t0 + TimeDelta::hours(3) + TimeDelta::seconds(1);
        let at_office = after_gap + TimeDelta::minutes(30);

        f.recorder.record(&observe(HOME, 5.0, t0)).await.unwrap();
        f.recorder
            .record(&observe(HOME, 5.0, after_gap))
            .await
            .unwrap();
        f.recorder
            .record(&observe(OFFICE, 5.0, at_office))
            .await
            .unwrap();

        let all = f.intervals.all().await;
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].location, "Home");
        assert_eq!(all[0].end_time, t0);
        assert_eq!(all[1].location, "Home");
        assert_eq!(all[1].start_time, after_gap);
        assert_eq!(all[2].location, "Office");
    }

    #[tokio::test]
    async fn unknown_position_is_world() {
        let f = fixture();
        let outcome = f
            .recorder
            .record(&observe(
                Coordinate::new(-45.0, 120.0),
                5.0,
                at("2024-05-01T08:00:00Z"),
            ))
            .await
            .unwrap();
        let IngestOutcome::Inserted(interval) = outcome else {
            panic!("expected insert, got {outcome:?}");
        };
        assert_eq!(interval.location, WORLD);
    }

    #[tokio::test]
    async fn catalog_refresh_changes_classification() {
        let f = fixture();
        f.recorder.catalog().replace(Vec::new()).await;
        let outcome = f
            .recorder
            .record(&observe(HOME, 5.0, at("2024-05-01T08:00:00Z")))
            .await
            .unwrap();
        let IngestOutcome::Inserted(interval) = outcome else {
            panic!("expected insert, got {outcome:?}");
        };
        assert_eq!(interval.location, WORLD);
    }

    #[tokio::test]
    async fn concurrent_pings_keep_a_single_interval() {
        let f = fixture();
        let recorder = Arc::new(f.recorder);
        let t0 = at("2024-05-01T08:00:00Z");

        let mut handles = Vec::new();
        for minute in 0..20 {
            let recorder = Arc::clone(&recorder);
            let t = t0 + TimeDelta::minutes(minute);
            handles.push(tokio::spawn(async move {
                recorder.record(&observe(HOME, 5.0, t)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Whatever the arrival order, only one Home interval exists and no
        // later ping was lost to a racing insert.
        let all = f.intervals.all().await;
        assert_eq!(all.len(), 1);
        assert!(all[0].start_time <= all[0].end_time);
    }
}
