//! In-memory stores with the same contracts as the `PostgreSQL` ones.
//!
//! Used by tests and by local runs without a database. State lives behind
//! [`Arc`] so clones share it, matching the behavior of a pooled handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use presence_types::{Interval, IntervalId, Place};
use tokio::sync::{Mutex, RwLock};

use crate::error::DbError;

/// In-memory interval table.
#[derive(Debug, Clone, Default)]
pub struct MemoryIntervalStore {
    intervals: Arc<Mutex<Vec<Interval>>>,
    fail_next: Arc<AtomicBool>,
}

impl MemoryIntervalStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next timeline read fail with a [`DbError::Timeout`], the
    /// way a stalled database would. Later calls succeed again.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Interval with the greatest `start_time`, ties broken by greatest id.
    pub async fn latest(&self) -> Result<Option<Interval>, DbError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(DbError::Timeout {
                operation: "latest_interval",
                timeout: Duration::ZERO,
            });
        }
        let intervals = self.intervals.lock().await;
        Ok(intervals
            .iter()
            .max_by_key(|interval| (interval.start_time, interval.id))
            .cloned())
    }

    /// Append a zero-length interval at `start_time`.
    pub async fn insert(
        &self,
        location: &str,
        start_time: DateTime<Utc>,
    ) -> Result<Interval, DbError> {
        let interval = Interval {
            id: IntervalId::new(),
            location: location.to_owned(),
            start_time,
            end_time: start_time,
            duration_ms: 0,
            fetched_at: Utc::now(),
        };
        self.intervals.lock().await.push(interval.clone());
        Ok(interval)
    }

    /// Update an interval's end and duration in place.
    pub async fn extend(
        &self,
        id: IntervalId,
        end_time: DateTime<Utc>,
        duration_ms: i64,
    ) -> Result<(), DbError> {
        let mut intervals = self.intervals.lock().await;
        let interval = intervals
            .iter_mut()
            .find(|interval| interval.id == id)
            .ok_or_else(|| DbError::NotFound(format!("interval {id}")))?;
        interval.end_time = end_time;
        interval.duration_ms = duration_ms;
        Ok(())
    }

    /// Up to `limit` intervals, most recent `start_time` first.
    pub async fn recent(&self, limit: u32) -> Result<Vec<Interval>, DbError> {
        let mut all = self.intervals.lock().await.clone();
        all.sort_by(|a, b| (b.start_time, b.id).cmp(&(a.start_time, a.id)));
        all.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(all)
    }

    /// Every stored interval, in insertion order.
    pub async fn all(&self) -> Vec<Interval> {
        self.intervals.lock().await.clone()
    }
}

/// In-memory config document.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    places: Arc<RwLock<Option<Vec<Place>>>>,
    last_fetched: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl MemoryConfigStore {
    /// Create a store whose document holds the given places.
    pub fn with_places(places: Vec<Place>) -> Self {
        Self {
            places: Arc::new(RwLock::new(Some(places))),
            last_fetched: Arc::new(RwLock::new(None)),
        }
    }

    /// Create a store with no document, so every load fails.
    pub fn missing() -> Self {
        Self::default()
    }

    /// Load the place catalog.
    pub async fn load_places(&self) -> Result<Vec<Place>, DbError> {
        self.places
            .read()
            .await
            .clone()
            .ok_or_else(|| DbError::NotFound(String::from("service_config document")))
    }

    /// Replace the place catalog.
    pub async fn save_places(&self, places: &[Place]) -> Result<(), DbError> {
        *self.places.write().await = Some(places.to_vec());
        Ok(())
    }

    /// Remove the document, so later loads fail.
    pub async fn clear(&self) {
        *self.places.write().await = None;
    }

    /// Record the time of the latest successful ingestion.
    pub async fn record_last_fetched(&self, at: DateTime<Utc>) -> Result<(), DbError> {
        *self.last_fetched.write().await = Some(at);
        Ok(())
    }

    /// Read back the recorded "last fetched" timestamp.
    pub async fn last_fetched(&self) -> Result<Option<DateTime<Utc>>, DbError> {
        Ok(*self.last_fetched.read().await)
    }
}
