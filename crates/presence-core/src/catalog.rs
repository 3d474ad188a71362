//! Shared, atomically swappable snapshot of the known places.
//!
//! The catalog is read on every ingested observation and replaced wholesale
//! by the periodic refresh task. Readers take a cheap [`Arc`] clone of the
//! current set and release the lock before matching, so a refresh never
//! waits on in-flight requests and a request never sees a half-updated
//! list.

use std::fmt::Display;
use std::sync::Arc;

use presence_types::Place;
use tokio::sync::RwLock;

/// Handle to the current place set. Cheap to clone; all clones share state.
#[derive(Debug, Clone)]
pub struct PlaceCatalog {
    current: Arc<RwLock<Arc<[Place]>>>,
}

impl PlaceCatalog {
    /// Create a catalog holding the given places, in catalog order.
    pub fn new(places: Vec<Place>) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::from(places))),
        }
    }

    /// Create a catalog with no places. Every observation matches `World`.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Return the current place set.
    ///
    /// The returned slice is immutable and stays valid even if the catalog
    /// is replaced while the caller is still using it.
    pub async fn snapshot(&self) -> Arc<[Place]> {
        Arc::clone(&*self.current.read().await)
    }

    /// Replace the whole place set.
    pub async fn replace(&self, places: Vec<Place>) {
        let next: Arc<[Place]> = Arc::from(places);
        *self.current.write().await = next;
    }

    /// Apply the outcome of a periodic reload.
    ///
    /// A successful load replaces the set. A failed load is logged and the
    /// last-known-good set is kept, so a transient storage problem or a bad
    /// edit to the catalog document never takes a running service down.
    ///
    /// Returns `true` if the catalog was replaced.
    pub async fn apply_refresh<E: Display>(&self, loaded: Result<Vec<Place>, E>) -> bool {
        match loaded {
            Ok(places) => {
                let count = places.len();
                self.replace(places).await;
                tracing::info!(places = count, "Place catalog refreshed");
                true
            }
            Err(e) => {
                let retained = self.len().await;
                tracing::warn!(
                    error = %e,
                    retained,
                    "Place catalog refresh failed, keeping last-known-good set"
                );
                false
            }
        }
    }

    /// Number of places in the current set.
    pub async fn len(&self) -> usize {
        self.current.read().await.len()
    }

    /// Whether the current set is empty.
    pub async fn is_empty(&self) -> bool {
        self.current.read().await.is_empty()
    }
}

impl Default for PlaceCatalog {
    fn default() -> Self {
        Self::empty()
    }
}
