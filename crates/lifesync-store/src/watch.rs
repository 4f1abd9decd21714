//! Subscription handles for incident change notifications.
//!
//! A watch is a scoped resource: dropping it releases the underlying
//! broadcast receiver, so teardown on logout or navigation cannot be
//! forgotten. Both watch types seed their first delivery with the current
//! state so a late subscriber is never left waiting for the next write.

use lifesync_types::{Incident, IncidentId};
use tokio::sync::broadcast;
use tracing::debug;

use crate::backend::RecordStore;
use crate::error::StoreError;
use crate::event::ChangeEvent;

// ---------------------------------------------------------------------------
// IncidentWatch
// ---------------------------------------------------------------------------

/// Live subscription to a single incident.
///
/// The first [`changed`](Self::changed) call yields the current value (if
/// the incident exists); every later call yields the next committed change
/// of that incident, in commit order. A subscriber that observes the seed
/// and then the event for the same commit sees a duplicate; consumers are
/// required to be idempotent, so duplicates are safe.
pub struct IncidentWatch {
    id: IncidentId,
    store: RecordStore,
    seed: Option<Incident>,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl IncidentWatch {
    pub(crate) const fn new(
        id: IncidentId,
        store: RecordStore,
        seed: Option<Incident>,
        rx: broadcast::Receiver<ChangeEvent>,
    ) -> Self {
        Self { id, store, seed, rx }
    }

    /// Id of the incident this watch follows.
    pub const fn id(&self) -> IncidentId {
        self.id
    }

    /// Wait for the next value of the watched incident.
    ///
    /// If this receiver lagged behind the broadcast channel, the missed
    /// events are replaced by a fresh read of the current value, so the
    /// terminal `accepted` state can never be lost to backpressure.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Closed`] once the store shuts down and no
    /// further notifications can arrive.
    pub async fn changed(&mut self) -> Result<Incident, StoreError> {
        if let Some(seed) = self.seed.take() {
            return Ok(seed);
        }

        loop {
            match self.rx.recv().await {
                Ok(event) if event.id() == self.id => return Ok(event.incident),
                Ok(_) => {
                    // Change for a different incident; not ours to report.
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(
                        incident_id = %self.id,
                        skipped = skipped,
                        "incident watch lagged, re-reading current value"
                    );
                    if let Ok(current) = self.store.get(self.id).await {
                        return Ok(current);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(StoreError::Closed);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CollectionWatch
// ---------------------------------------------------------------------------

/// Live subscription to the whole incident collection.
///
/// Yields a unit notification per change; consumers rebuild their snapshot
/// from [`RecordStore::list`]. The first call notifies immediately so the
/// subscriber renders the initial state without waiting for a write. A
/// lagged receiver collapses the missed events into one notification,
/// which is lossless because the snapshot is rebuilt from the store.
pub struct CollectionWatch {
    seeded: bool,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl CollectionWatch {
    pub(crate) const fn new(rx: broadcast::Receiver<ChangeEvent>) -> Self {
        Self { seeded: false, rx }
    }

    /// Wait until the collection has (possibly) changed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Closed`] once the store shuts down.
    pub async fn changed(&mut self) -> Result<(), StoreError> {
        if !self.seeded {
            self.seeded = true;
            return Ok(());
        }

        match self.rx.recv().await {
            Ok(_) => Ok(()),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped = skipped, "collection watch lagged, coalescing");
                Ok(())
            }
            Err(broadcast::error::RecvError::Closed) => Err(StoreError::Closed),
        }
    }
}
