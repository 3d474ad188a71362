//! Persistence for presence intervals.
//!
//! The timeline is read through a single query, "the interval with the
//! greatest start time", and written through exactly one single-row
//! statement per observation (insert or extend). No multi-statement
//! transaction is ever needed.

use std::time::Duration;

use chrono::{DateTime, Utc};
use presence_types::{Interval, IntervalId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;
use crate::postgres::bounded;

/// Operations on the `presence_intervals` table.
#[derive(Debug, Clone)]
pub struct PgIntervalStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgIntervalStore {
    /// Create a new interval store bound to a connection pool.
    pub const fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Fetch the interval with the greatest `start_time`.
    ///
    /// An empty table is `Ok(None)`, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails or
    /// [`DbError::Timeout`] if it exceeds the operation bound.
    pub async fn latest(&self) -> Result<Option<Interval>, DbError> {
        bounded("interval.latest", self.timeout, async {
            let row = sqlx::query_as::<_, IntervalRow>(
                r"SELECT id, location, start_time, end_time, duration_ms, fetched_at
                  FROM presence_intervals
                  ORDER BY start_time DESC, id DESC
                  LIMIT 1",
            )
            .fetch_optional(&self.pool)
            .await?;

            Ok(row.map(Interval::from))
        })
        .await
    }

    /// Insert a new zero-length interval starting (and ending) at
    /// `start_time`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails or
    /// [`DbError::Timeout`] if it exceeds the operation bound.
    pub async fn insert(
        &self,
        location: &str,
        start_time: DateTime<Utc>,
    ) -> Result<Interval, DbError> {
        let id = IntervalId::new();
        let fetched_at = Utc::now();

        let row = bounded("interval.insert", self.timeout, async {
            let row = sqlx::query_as::<_, IntervalRow>(
                r"INSERT INTO presence_intervals (id, location, start_time, end_time, duration_ms, fetched_at)
                  VALUES ($1, $2, $3, $3, 0, $4)
                  RETURNING id, location, start_time, end_time, duration_ms, fetched_at",
            )
            .bind(id.into_inner())
            .bind(location)
            .bind(start_time)
            .bind(fetched_at)
            .fetch_one(&self.pool)
            .await?;
            Ok(row)
        })
        .await?;

        tracing::debug!(interval_id = %id, location, %start_time, "Inserted interval");

        Ok(Interval::from(row))
    }

    /// Move an interval's end forward and store its recomputed duration.
    ///
    /// `location` and `start_time` are never changed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no interval has the given id,
    /// [`DbError::Postgres`] if the update fails, or [`DbError::Timeout`]
    /// if it exceeds the operation bound.
    pub async fn extend(
        &self,
        id: IntervalId,
        end_time: DateTime<Utc>,
        duration_ms: i64,
    ) -> Result<(), DbError> {
        let result = bounded("interval.extend", self.timeout, async {
            let result = sqlx::query(
                r"UPDATE presence_intervals
                  SET end_time = $2, duration_ms = $3
                  WHERE id = $1",
            )
            .bind(id.into_inner())
            .bind(end_time)
            .bind(duration_ms)
            .execute(&self.pool)
            .await?;
            Ok(result)
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("interval {id}")));
        }

        tracing::debug!(interval_id = %id, %end_time, duration_ms, "Extended interval");

        Ok(())
    }

    /// Fetch up to `limit` intervals, most recent `start_time` first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails or
    /// [`DbError::Timeout`] if it exceeds the operation bound.
    pub async fn recent(&self, limit: u32) -> Result<Vec<Interval>, DbError> {
        bounded("interval.recent", self.timeout, async {
            let rows = sqlx::query_as::<_, IntervalRow>(
                r"SELECT id, location, start_time, end_time, duration_ms, fetched_at
                  FROM presence_intervals
                  ORDER BY start_time DESC, id DESC
                  LIMIT $1",
            )
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

            Ok(rows.into_iter().map(Interval::from).collect())
        })
        .await
    }
}

/// A row from the `presence_intervals` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IntervalRow {
    /// Interval identifier (UUID v7).
    pub id: Uuid,
    /// Place name or `World`.
    pub location: String,
    /// Start of the interval.
    pub start_time: DateTime<Utc>,
    /// End of the interval.
    pub end_time: DateTime<Utc>,
    /// Stored duration in milliseconds.
    pub duration_ms: i64,
    /// Row creation time.
    pub fetched_at: DateTime<Utc>,
}

impl From<IntervalRow> for Interval {
    fn from(row: IntervalRow) -> Self {
        Self {
            id: IntervalId::from(row.id),
            location: row.location,
            start_time: row.start_time,
            end_time: row.end_time,
            duration_ms: row.duration_ms,
            fetched_at: row.fetched_at,
        }
    }
}
