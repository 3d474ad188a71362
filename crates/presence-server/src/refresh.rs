//! Periodic place catalog reload.
//!
//! The catalog is read once at startup and then on a fixed interval. A
//! failed reload keeps serving the last set that loaded successfully.

use std::time::Duration;

use presence_core::PlaceCatalog;
use presence_db::ConfigBackend;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spawn the background task that reloads the catalog every `period`.
///
/// The first tick of a tokio interval fires immediately; it is consumed
/// up front because the catalog was already loaded during startup. A zero
/// period disables reloading; validated configs never produce one.
pub fn spawn_catalog_refresh(
    catalog: PlaceCatalog,
    source: ConfigBackend,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if period.is_zero() {
            tracing::warn!("Catalog refresh period is zero, reloading disabled");
            return;
        }

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            tracing::debug!(backend = source.name(), "Reloading place catalog");
            let loaded = source.load_places().await;
            catalog.apply_refresh(loaded).await;
        }
    })
}
