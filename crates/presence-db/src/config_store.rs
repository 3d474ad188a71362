//! The service configuration document: place catalog and bookkeeping.
//!
//! A single `service_config` row holds a nested JSON document. The place
//! catalog lives at `collections.location.internal.places`; ingestion
//! records its "last fetched" timestamp at `collections.location.lastFetched`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use presence_types::Place;
use serde::Deserialize;
use sqlx::PgPool;

use crate::error::DbError;
use crate::postgres::bounded;

/// Operations on the `service_config` document.
#[derive(Debug, Clone)]
pub struct PgConfigStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgConfigStore {
    /// Create a new config store bound to a connection pool.
    pub const fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Load the place catalog, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the document row is missing,
    /// [`DbError::Decode`] if the document does not contain a well-formed
    /// place list, [`DbError::Postgres`] if the query fails, or
    /// [`DbError::Timeout`] if it exceeds the operation bound.
    pub async fn load_places(&self) -> Result<Vec<Place>, DbError> {
        let document = bounded("config.load_places", self.timeout, async {
            let row: Option<(serde_json::Value,)> =
                sqlx::query_as(r"SELECT document FROM service_config WHERE id = 1")
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row)
        })
        .await?;

        let Some((document,)) = document else {
            return Err(DbError::NotFound(String::from("service_config document")));
        };

        decode_catalog(document)
    }

    /// Replace the place catalog, creating the document if needed.
    ///
    /// Other keys already in the document (including `lastFetched`) are
    /// preserved. Missing or non-object levels on the way down to `places`
    /// are rebuilt, so the result always decodes with [`decode_catalog`].
    /// The read-modify-write runs in one transaction holding the row lock.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if the places cannot be encoded,
    /// [`DbError::Postgres`] if a statement fails, or [`DbError::Timeout`]
    /// if it exceeds the operation bound.
    pub async fn save_places(&self, places: &[Place]) -> Result<(), DbError> {
        let places_json = serde_json::to_value(places)?;

        bounded("config.save_places", self.timeout, async {
            let mut tx = self.pool.begin().await?;

            let existing: Option<(serde_json::Value,)> = sqlx::query_as(
                r"SELECT document FROM service_config WHERE id = 1 FOR UPDATE",
            )
            .fetch_optional(&mut *tx)
            .await?;

            let document = with_places(
                existing.map_or(serde_json::Value::Null, |(document,)| document),
                places_json,
            );

            sqlx::query(
                r"INSERT INTO service_config (id, document)
                  VALUES (1, $1)
                  ON CONFLICT (id) DO UPDATE SET document = EXCLUDED.document",
            )
            .bind(&document)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(())
        })
        .await?;

        tracing::info!(places = places.len(), "Saved place catalog");
        Ok(())
    }

    /// Record the time of the latest successful ingestion.
    ///
    /// Purely observational: nothing in the ingestion path reads it back.
    /// Postgres `jsonb_set` only creates the last key, so this is a no-op
    /// on a document without `collections.location`; such a document has
    /// no catalog either and is rejected at startup.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails or
    /// [`DbError::Timeout`] if it exceeds the operation bound.
    pub async fn record_last_fetched(&self, at: DateTime<Utc>) -> Result<(), DbError> {
        bounded("config.record_last_fetched", self.timeout, async {
            sqlx::query(
                r"UPDATE service_config
                  SET document = jsonb_set(
                    document,
                    '{collections,location,lastFetched}',
                    to_jsonb($1::timestamptz),
                    true
                  )
                  WHERE id = 1",
            )
            .bind(at)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }

    /// Read back the recorded "last fetched" timestamp, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails or
    /// [`DbError::Timeout`] if it exceeds the operation bound.
    pub async fn last_fetched(&self) -> Result<Option<DateTime<Utc>>, DbError> {
        bounded("config.last_fetched", self.timeout, async {
            let row: Option<(Option<DateTime<Utc>>,)> = sqlx::query_as(
                r"SELECT (document #>> '{collections,location,lastFetched}')::timestamptz
                  FROM service_config
                  WHERE id = 1",
            )
            .fetch_optional(&self.pool)
            .await?;
            Ok(row.and_then(|(at,)| at))
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Document shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ConfigDocument {
    collections: Collections,
}

#[derive(Debug, Deserialize)]
struct Collections {
    location: LocationCollection,
}

#[derive(Debug, Deserialize)]
struct LocationCollection {
    internal: InternalSection,
}

#[derive(Debug, Deserialize)]
struct InternalSection {
    places: Vec<Place>,
}

/// Decode the nested config document down to its place list.
///
/// Unknown keys anywhere in the document are ignored.
///
/// # Errors
///
/// Returns [`DbError::Decode`] if any level of the path is missing or a
/// place entry is malformed.
pub fn decode_catalog(document: serde_json::Value) -> Result<Vec<Place>, DbError> {
    let parsed: ConfigDocument = serde_json::from_value(document)
        .map_err(|e| DbError::Decode(format!("place catalog document: {e}")))?;
    Ok(parsed.collections.location.internal.places)
}

/// Put `places` at `collections.location.internal.places` in `document`.
///
/// Sibling keys at every level are kept. A level that is missing or is not
/// a JSON object is replaced by an object.
pub fn with_places(document: serde_json::Value, places: serde_json::Value) -> serde_json::Value {
    let mut document = document;
    let mut node = &mut document;
    for key in ["collections", "location", "internal"] {
        node = object_entry(node, key);
    }
    if !node.is_object() {
        *node = serde_json::Value::Object(serde_json::Map::new());
    }
    if let serde_json::Value::Object(map) = node {
        map.insert(String::from("places"), places);
    }
    document
}

/// The child object under `key`, creating objects as needed.
fn object_entry<'a>(node: &'a mut serde_json::Value, key: &str) -> &'a mut serde_json::Value {
    if !node.is_object() {
        *node = serde_json::Value::Object(serde_json::Map::new());
    }
    match node {
        serde_json::Value::Object(map) => map
            .entry(key)
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new())),
        // Replaced by an object just above.
        other => other,
    }
}

/// Build a fresh config document holding the given places.
///
/// # Errors
///
/// Returns [`DbError::Serialization`] if a place cannot be encoded.
pub fn catalog_document(places: &[Place]) -> Result<serde_json::Value, DbError> {
    Ok(with_places(
        serde_json::Value::Null,
        serde_json::to_value(places)?,
    ))
}
