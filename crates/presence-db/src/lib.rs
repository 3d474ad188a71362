//! Data layer for the presence timeline service.
//!
//! `PostgreSQL` holds two things: the `presence_intervals` table (the
//! compacted timeline) and the single-row `service_config` document that
//! carries the place catalog and ingestion bookkeeping.
//!
//! # Architecture
//!
//! ```text
//! Recorder (presence-api)
//!     |
//!     +-- IntervalBackend --> PgIntervalStore | MemoryIntervalStore
//!     |
//!     +-- ConfigBackend ----> PgConfigStore   | MemoryConfigStore
//! ```
//!
//! Every `PostgreSQL` operation runs under a fixed time bound; exceeding it
//! surfaces as [`DbError::Timeout`] rather than a hang. The in-memory stores
//! honor the same contracts and back tests and database-less local runs.
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`interval_store`] -- Latest / insert / extend on the interval table
//! - [`config_store`] -- Catalog document decoding and bookkeeping writes
//! - [`memory`] -- In-memory implementations of both stores
//! - [`backend`] -- Enum dispatch over the `PostgreSQL` and memory variants
//! - [`error`] -- Shared error types

pub mod backend;
pub mod config_store;
pub mod error;
pub mod interval_store;
pub mod memory;
pub mod postgres;

// Re-export primary types for convenience.
pub use backend::{ConfigBackend, IntervalBackend};
pub use config_store::{PgConfigStore, catalog_document, decode_catalog, with_places};
pub use error::DbError;
pub use interval_store::{IntervalRow, PgIntervalStore};
pub use memory::{MemoryConfigStore, MemoryIntervalStore};
pub use postgres::{PostgresConfig, PostgresPool};
