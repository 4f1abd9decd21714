//! Shared application state for the gateway.
//!
//! [`AppState`] wires the record store, the responder feed with its
//! fan-out broadcast, the geolocation source, the advisory service and
//! surface, and the session gate. One `Arc<AppState>` is shared by all
//! handlers.

use std::sync::Arc;

use lifesync_advisor::{AdvisoryService, AdvisorySurface};
use lifesync_core::{FeedGuard, FeedSnapshot, GeoLocator, ResponderFeed, SessionStore};
use lifesync_store::RecordStore;
use tokio::sync::{broadcast, Mutex};
use tracing::info;

/// Capacity of the feed snapshot broadcast channel.
///
/// A `WebSocket` client that falls behind by more than this many
/// snapshots skips ahead to the newest one, which is lossless because
/// every snapshot is a full rebuild.
const FEED_CAPACITY: usize = 64;

/// Shared state behind every gateway handler.
pub struct AppState {
    /// The incident record store.
    pub store: RecordStore,
    /// Responder view over the store.
    pub feed: ResponderFeed,
    /// Position source for the SOS trigger.
    pub locator: GeoLocator,
    /// Advisory fetcher (fire-and-forget from the trigger).
    pub advisor: Arc<AdvisoryService>,
    /// Last-write-wins advisory display surface.
    pub surface: AdvisorySurface,
    /// Persisted role gate.
    pub session: SessionStore,
    feed_tx: broadcast::Sender<FeedSnapshot>,
    feed_guard: Mutex<Option<FeedGuard>>,
}

impl AppState {
    /// Assemble the gateway state.
    pub fn new(
        store: RecordStore,
        locator: GeoLocator,
        advisor: AdvisoryService,
        session: SessionStore,
    ) -> Self {
        let (feed_tx, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            feed: ResponderFeed::new(store.clone()),
            store,
            locator,
            advisor: Arc::new(advisor),
            surface: AdvisorySurface::new(),
            session,
            feed_tx,
            feed_guard: Mutex::new(None),
        }
    }

    /// Subscribe to feed snapshot fan-out.
    pub fn subscribe_feed(&self) -> broadcast::Receiver<FeedSnapshot> {
        self.feed_tx.subscribe()
    }

    /// Start the responder feed fan-out task if it is not already
    /// running (responder login).
    pub async fn start_feed(&self) {
        let mut guard = self.feed_guard.lock().await;
        if guard.is_none() {
            *guard = Some(self.feed.stream(self.feed_tx.clone()));
            info!("responder feed started");
        }
    }

    /// Stop the feed task and release its store subscription (logout,
    /// shutdown). A stopped feed is a no-op.
    pub async fn stop_feed(&self) {
        let mut guard = self.feed_guard.lock().await;
        if guard.take().is_some() {
            info!("responder feed stopped");
        }
    }

    /// Whether the feed fan-out task is currently running.
    pub async fn feed_running(&self) -> bool {
        self.feed_guard.lock().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use lifesync_types::Coordinate;

    use super::*;

    fn make_state() -> AppState {
        let mut path = std::env::temp_dir();
        path.push(format!("lifesync-state-test-{}.json", uuid::Uuid::new_v4()));
        AppState::new(
            RecordStore::memory(),
            GeoLocator::Fixed(Coordinate { lat: 1.30, lng: 103.80 }),
            AdvisoryService::offline(),
            SessionStore::new(path),
        )
    }

    #[tokio::test]
    async fn feed_lifecycle_is_idempotent() {
        let state = make_state();
        assert!(!state.feed_running().await);

        state.start_feed().await;
        state.start_feed().await;
        assert!(state.feed_running().await);

        state.stop_feed().await;
        state.stop_feed().await;
        assert!(!state.feed_running().await);
    }
}
