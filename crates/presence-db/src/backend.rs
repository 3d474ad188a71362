//! Enum dispatch over the `PostgreSQL` and in-memory stores.
//!
//! Async methods are not dyn-compatible, so the ingestion pipeline holds
//! one of these enums instead of a trait object. Each method forwards to
//! the concrete store.

use chrono::{DateTime, Utc};
use presence_types::{Interval, IntervalId, Place};

use crate::config_store::PgConfigStore;
use crate::error::DbError;
use crate::interval_store::PgIntervalStore;
use crate::memory::{MemoryConfigStore, MemoryIntervalStore};

// ---------------------------------------------------------------------------
// Interval store
// ---------------------------------------------------------------------------

/// Where the presence timeline is stored.
#[derive(Debug, Clone)]
pub enum IntervalBackend {
    /// `PostgreSQL` table.
    Postgres(PgIntervalStore),
    /// Process memory.
    Memory(MemoryIntervalStore),
}

impl IntervalBackend {
    /// Fetch the interval with the greatest `start_time`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on storage failure or timeout.
    pub async fn latest(&self) -> Result<Option<Interval>, DbError> {
        match self {
            Self::Postgres(store) => store.latest().await,
            Self::Memory(store) => store.latest().await,
        }
    }

    /// Insert a new zero-length interval.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on storage failure or timeout.
    pub async fn insert(
        &self,
        location: &str,
        start_time: DateTime<Utc>,
    ) -> Result<Interval, DbError> {
        match self {
            Self::Postgres(store) => store.insert(location, start_time).await,
            Self::Memory(store) => store.insert(location, start_time).await,
        }
    }

    /// Move an interval's end forward.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] for an unknown id, or another
    /// [`DbError`] on storage failure or timeout.
    pub async fn extend(
        &self,
        id: IntervalId,
        end_time: DateTime<Utc>,
        duration_ms: i64,
    ) -> Result<(), DbError> {
        match self {
            Self::Postgres(store) => store.extend(id, end_time, duration_ms).await,
            Self::Memory(store) => store.extend(id, end_time, duration_ms).await,
        }
    }

    /// Fetch up to `limit` intervals, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on storage failure or timeout.
    pub async fn recent(&self, limit: u32) -> Result<Vec<Interval>, DbError> {
        match self {
            Self::Postgres(store) => store.recent(limit).await,
            Self::Memory(store) => store.recent(limit).await,
        }
    }

    /// Human-readable backend name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }
}

impl From<PgIntervalStore> for IntervalBackend {
    fn from(store: PgIntervalStore) -> Self {
        Self::Postgres(store)
    }
}

impl From<MemoryIntervalStore> for IntervalBackend {
    fn from(store: MemoryIntervalStore) -> Self {
        Self::Memory(store)
    }
}

// ---------------------------------------------------------------------------
// Config document store
// ---------------------------------------------------------------------------

/// Where the config document (place catalog + bookkeeping) is stored.
#[derive(Debug, Clone)]
pub enum ConfigBackend {
    /// `PostgreSQL` row.
    Postgres(PgConfigStore),
    /// Process memory.
    Memory(MemoryConfigStore),
}

impl ConfigBackend {
    /// Load the place catalog.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the document is missing, malformed, or
    /// cannot be read.
    pub async fn load_places(&self) -> Result<Vec<Place>, DbError> {
        match self {
            Self::Postgres(store) => store.load_places().await,
            Self::Memory(store) => store.load_places().await,
        }
    }

    /// Record the time of the latest successful ingestion.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on storage failure or timeout.
    pub async fn record_last_fetched(&self, at: DateTime<Utc>) -> Result<(), DbError> {
        match self {
            Self::Postgres(store) => store.record_last_fetched(at).await,
            Self::Memory(store) => store.record_last_fetched(at).await,
        }
    }

    /// Human-readable backend name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }
}

impl From<PgConfigStore> for ConfigBackend {
    fn from(store: PgConfigStore) -> Self {
        Self::Postgres(store)
    }
}

impl From<MemoryConfigStore> for ConfigBackend {
    fn from(store: MemoryConfigStore) -> Self {
        Self::Memory(store)
    }
}
