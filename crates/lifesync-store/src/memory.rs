//! In-process record store backend.
//!
//! Holds the incident collection in memory behind a [`RwLock`] and fans
//! out change events over a [`broadcast`] channel. This backend serves the
//! single-node deployment and every test; the `Dragonfly` backend provides
//! the same contract across processes.
//!
//! Events are published while the write lock is held, so the broadcast
//! order equals the commit order for every incident.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use lifesync_types::{Incident, IncidentId, IncidentPatch, IncidentStatus, NewIncident};
use tokio::sync::{broadcast, RwLock};

use crate::backend::assign_record;
use crate::error::StoreError;
use crate::event::ChangeEvent;

/// Capacity of the change-event broadcast channel.
///
/// A subscriber that falls behind by more than this many events receives
/// a `Lagged` error and resynchronizes from the current state.
pub(crate) const BROADCAST_CAPACITY: usize = 256;

/// Incident collection state: records by id plus insertion order.
#[derive(Default)]
struct Collection {
    order: Vec<IncidentId>,
    records: HashMap<IncidentId, Incident>,
}

/// In-memory record store backend.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    collection: RwLock<Collection>,
    events: broadcast::Sender<ChangeEvent>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                collection: RwLock::new(Collection::default()),
                events,
            }),
        }
    }

    /// Persist a new incident with `status = pending` and a store-assigned
    /// id and creation timestamp.
    pub async fn create(&self, new: NewIncident) -> Result<Incident, StoreError> {
        let incident = assign_record(new);

        let mut collection = self.inner.collection.write().await;
        collection.order.push(incident.id);
        collection.records.insert(incident.id, incident.clone());
        self.publish(&incident);

        tracing::info!(incident_id = %incident.id, "incident created");
        Ok(incident)
    }

    /// Merge-write the given patch into an existing incident.
    ///
    /// This is the baseline unconditional write: it overwrites the targeted
    /// fields regardless of current state. Claims go through
    /// [`accept_if_pending`](Self::accept_if_pending) instead.
    pub async fn update(
        &self,
        id: IncidentId,
        patch: IncidentPatch,
    ) -> Result<Incident, StoreError> {
        let mut collection = self.inner.collection.write().await;
        let incident = collection
            .records
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;
        patch.apply(incident);
        let updated = incident.clone();
        self.publish(&updated);
        Ok(updated)
    }

    /// Atomically commit pending to accepted, with a store-assigned
    /// acceptance timestamp.
    ///
    /// The check and the write happen under one write lock, so exactly one
    /// of any number of concurrent claims succeeds; the rest observe
    /// [`StoreError::AlreadyAccepted`].
    pub async fn accept_if_pending(&self, id: IncidentId) -> Result<Incident, StoreError> {
        let mut collection = self.inner.collection.write().await;
        let incident = collection
            .records
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;

        if incident.status != IncidentStatus::Pending {
            return Err(StoreError::AlreadyAccepted(id));
        }

        IncidentPatch::accepted(Utc::now()).apply(incident);
        let accepted = incident.clone();
        self.publish(&accepted);

        tracing::info!(incident_id = %id, "incident accepted");
        Ok(accepted)
    }

    /// Read a single incident.
    pub async fn get(&self, id: IncidentId) -> Result<Incident, StoreError> {
        let collection = self.inner.collection.read().await;
        collection
            .records
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    /// Read all incidents in insertion order (oldest first).
    pub async fn list(&self) -> Result<Vec<Incident>, StoreError> {
        let collection = self.inner.collection.read().await;
        Ok(collection
            .order
            .iter()
            .filter_map(|id| collection.records.get(id).cloned())
            .collect())
    }

    /// Subscribe to the raw change-event stream.
    pub(crate) fn subscribe_events(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.events.subscribe()
    }

    /// Number of live change-event subscriptions.
    pub(crate) fn watcher_count(&self) -> usize {
        self.inner.events.receiver_count()
    }

    /// Publish a change event. A send error only means there are no
    /// subscribers right now, which is fine.
    fn publish(&self, incident: &Incident) {
        let _ = self.inner.events.send(ChangeEvent {
            incident: incident.clone(),
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
