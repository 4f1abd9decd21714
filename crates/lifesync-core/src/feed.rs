//! Responder-side live view of the incident collection.
//!
//! Every connected responder derives the same snapshot from the record
//! store: all known incidents, most-recently-created first. Accepted
//! incidents stay in the list (dimmed by the UI, never removed) so
//! responders keep situational awareness of resolved cases.

use chrono::{DateTime, Utc};
use lifesync_store::{RecordStore, StoreError};
use lifesync_types::{Incident, IncidentId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Errors surfaced by the claim operation.
#[derive(Debug, thiserror::Error)]
pub enum AcceptError {
    /// Another responder already committed to this incident. A normal
    /// race outcome, not a fault.
    #[error("incident {0} was already accepted by another responder")]
    AlreadyAccepted(IncidentId),

    /// No incident exists under this id.
    #[error("incident not found: {0}")]
    NotFound(IncidentId),

    /// The store operation itself failed.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AcceptError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyAccepted(id) => Self::AlreadyAccepted(id),
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

/// One rebuilt view of the incident collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSnapshot {
    /// All known incidents, newest first.
    pub incidents: Vec<Incident>,
    /// When this snapshot was rebuilt.
    pub generated_at: DateTime<Utc>,
}

impl FeedSnapshot {
    fn build(incidents: Vec<Incident>) -> Self {
        Self {
            incidents: order_newest_first(incidents),
            generated_at: Utc::now(),
        }
    }
}

/// Order incidents most-recently-created first.
///
/// Ties on `created_at` are broken by the time-ordered id, so the order is
/// total and stable across clients.
fn order_newest_first(mut incidents: Vec<Incident>) -> Vec<Incident> {
    incidents.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
    incidents
}

/// Live responder view over the record store.
#[derive(Clone)]
pub struct ResponderFeed {
    store: RecordStore,
}

impl ResponderFeed {
    /// Create a feed over the given store.
    pub const fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Rebuild the current snapshot from the store.
    ///
    /// An empty collection yields an empty snapshot; malformed records
    /// were already skipped by the store's list operation, so one bad
    /// entry never fails the whole view.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store read fails.
    pub async fn snapshot(&self) -> Result<FeedSnapshot, StoreError> {
        Ok(FeedSnapshot::build(self.store.list().await?))
    }

    /// Claim an incident for this responder.
    ///
    /// Delegates to the store's atomic conditional write: exactly one of
    /// any number of concurrent claims succeeds.
    ///
    /// # Errors
    ///
    /// [`AcceptError::AlreadyAccepted`] when another responder won,
    /// [`AcceptError::NotFound`] for an unknown id.
    pub async fn accept(&self, id: IncidentId) -> Result<Incident, AcceptError> {
        Ok(self.store.accept_if_pending(id).await?)
    }

    /// Start the fan-out task: on every collection change, rebuild the
    /// snapshot and broadcast it to all subscribers.
    ///
    /// The returned guard owns the task; dropping it (logout, shutdown)
    /// aborts the task and releases the store subscription.
    pub fn stream(&self, tx: broadcast::Sender<FeedSnapshot>) -> FeedGuard {
        let store = self.store.clone();
        let feed = Self::new(store);

        let handle = tokio::spawn(async move {
            let mut watch = feed.store.watch_all();
            loop {
                if let Err(e) = watch.changed().await {
                    debug!(error = %e, "collection watch ended, stopping feed");
                    return;
                }
                match feed.snapshot().await {
                    Ok(snapshot) => {
                        let _ = tx.send(snapshot);
                    }
                    Err(e) => {
                        warn!(error = %e, "snapshot rebuild failed, keeping previous view");
                    }
                }
            }
        });

        FeedGuard { handle }
    }
}

/// Owner of the running feed fan-out task. Aborts it on drop.
pub struct FeedGuard {
    handle: JoinHandle<()>,
}

impl Drop for FeedGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
