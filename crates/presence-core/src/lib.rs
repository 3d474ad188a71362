//! Place matching, interval compaction, and catalog state for the presence
//! timeline service.
//!
//! This crate holds the pure decision logic of the service. It performs no
//! database or network I/O; persistence lives in `presence-db` and the HTTP
//! surface in `presence-api`.
//!
//! # Pipeline
//!
//! ```text
//! Observation --> matcher (PlaceCatalog snapshot) --> location name
//!                                                        |
//!          latest Interval (from store) --> compactor::decide --> Decision
//! ```
//!
//! # Modules
//!
//! - [`catalog`] -- Atomically swappable snapshot of the known places.
//! - [`compactor`] -- The discard / insert / extend decision rule.
//! - [`config`] -- Configuration loading from `presence-config.yaml`.
//! - [`geo`] -- Haversine great-circle distance.
//! - [`matcher`] -- Classification of an observation against the catalog.

pub mod catalog;
pub mod compactor;
pub mod config;
pub mod geo;
pub mod matcher;

pub use catalog::PlaceCatalog;
pub use compactor::{CompactionPolicy, Decision, DiscardReason, InsertReason, decide};
pub use config::{ConfigError, ServiceConfig};
pub use geo::distance_m;
pub use matcher::match_location;
