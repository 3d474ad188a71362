//! Ingestion and timeline API server for the presence timeline service.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Ingestion endpoint** (`POST /log`) accepting one GPS ping per
//!   request and folding it into the stored timeline
//! - **Read-only REST endpoints** for the place catalog and the most
//!   recent intervals
//! - **Health check** (`GET /health`)
//!
//! # Architecture
//!
//! Every ingested ping goes through the [`Recorder`]: accuracy filter,
//! classification against a [`PlaceCatalog`] snapshot, then the
//! read-decide-write sequence on the timeline under a single write lock.
//! Storage failures are reported to the caller as a `500` and never take
//! the process down.
//!
//! [`Recorder`]: ingest::Recorder
//! [`PlaceCatalog`]: presence_core::PlaceCatalog

pub mod error;
pub mod handlers;
pub mod ingest;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use ingest::{IngestOutcome, Recorder};
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
