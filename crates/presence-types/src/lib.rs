//! Shared type definitions for the presence timeline service.
//!
//! This crate is the single source of truth for the values that flow
//! between the ingestion endpoint, the matching and compaction logic, and
//! the persistence layer. Types that are stored or served over the API are
//! also exported to `TypeScript` via `ts-rs` for the timeline dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- The UUID v7 interval identifier
//! - [`structs`] -- Coordinates, places, observations, and intervals

pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use ids::IntervalId;
pub use structs::{Coordinate, Interval, Observation, Place, WORLD};
