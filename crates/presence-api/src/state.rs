//! Shared application state for the API server.

use std::sync::Arc;

use crate::ingest::Recorder;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// The ingestion pipeline, which also owns the catalog and stores.
    pub recorder: Arc<Recorder>,
}

impl AppState {
    /// Create application state around a recorder.
    pub fn new(recorder: Recorder) -> Self {
        Self {
            recorder: Arc::new(recorder),
        }
    }
}
