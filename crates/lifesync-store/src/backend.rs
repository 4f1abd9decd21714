//! Backend dispatch for the record store.
//!
//! Uses enum dispatch instead of trait objects because async methods are
//! not dyn-compatible in Rust. Both backends honor the same contract:
//! store-assigned ids and timestamps, merge-write updates, an atomic
//! conditional claim, and change notification in per-incident commit
//! order.

use chrono::Utc;
use lifesync_types::{Incident, IncidentId, IncidentPatch, IncidentStatus, NewIncident};
use tokio::sync::broadcast;

use crate::dragonfly::DragonflyStore;
use crate::error::StoreError;
use crate::event::ChangeEvent;
use crate::memory::MemoryStore;
use crate::watch::{CollectionWatch, IncidentWatch};

/// Seal a creation payload into a full record.
///
/// This is the store-side admission point: the id (UUID v7, time-ordered)
/// and `created_at` are assigned here, exactly once, and `status` starts
/// at `pending`. Both backends go through this function.
pub(crate) fn assign_record(new: NewIncident) -> Incident {
    Incident {
        id: IncidentId::new(),
        patient_name: new.patient_name,
        blood_type: new.blood_type,
        location: new.location,
        status: IncidentStatus::Pending,
        created_at: Utc::now(),
        accepted_at: None,
    }
}

/// A record store client, backed by either the in-process collection or a
/// `Dragonfly` instance.
#[derive(Clone)]
pub enum RecordStore {
    /// In-process backend (single-node deployment, tests).
    Memory(MemoryStore),
    /// `Dragonfly`/Redis backend (multi-node deployment).
    Dragonfly(DragonflyStore),
}

impl RecordStore {
    /// Create an in-process store.
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    /// Connect to a `Dragonfly` instance at the given Redis URL.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] or [`StoreError::Dragonfly`] if the
    /// connection cannot be established.
    pub async fn connect_dragonfly(url: &str) -> Result<Self, StoreError> {
        Ok(Self::Dragonfly(DragonflyStore::connect(url).await?))
    }

    /// Human-readable backend name for logging.
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Dragonfly(_) => "dragonfly",
        }
    }

    /// Persist a new incident; the store assigns id, creation timestamp,
    /// and `status = pending`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails. The caller treats this
    /// as a retryable creation failure.
    pub async fn create(&self, new: NewIncident) -> Result<Incident, StoreError> {
        match self {
            Self::Memory(store) => store.create(new).await,
            Self::Dragonfly(store) => store.create(new).await,
        }
    }

    /// Merge-write a partial update. Unspecified fields keep their value.
    ///
    /// This write is unconditional: it overwrites the targeted fields
    /// regardless of current state. Claims must go through
    /// [`accept_if_pending`](Self::accept_if_pending), which is why the
    /// responder feed never calls `update` for acceptance.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    pub async fn update(
        &self,
        id: IncidentId,
        patch: IncidentPatch,
    ) -> Result<Incident, StoreError> {
        match self {
            Self::Memory(store) => store.update(id, patch).await,
            Self::Dragonfly(store) => store.update(id, patch).await,
        }
    }

    /// Atomic conditional claim: commit pending to accepted only if the
    /// incident is still pending, assigning `accepted_at` on the store
    /// side.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyAccepted`] when another responder won
    /// the claim, [`StoreError::NotFound`] for an unknown id.
    pub async fn accept_if_pending(&self, id: IncidentId) -> Result<Incident, StoreError> {
        match self {
            Self::Memory(store) => store.accept_if_pending(id).await,
            Self::Dragonfly(store) => store.accept_if_pending(id).await,
        }
    }

    /// Read a single incident.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    pub async fn get(&self, id: IncidentId) -> Result<Incident, StoreError> {
        match self {
            Self::Memory(store) => store.get(id).await,
            Self::Dragonfly(store) => store.get(id).await,
        }
    }

    /// Read all incidents in insertion order (oldest first).
    pub async fn list(&self) -> Result<Vec<Incident>, StoreError> {
        match self {
            Self::Memory(store) => store.list().await,
            Self::Dragonfly(store) => store.list().await,
        }
    }

    /// Subscribe to change notifications for one incident.
    ///
    /// The watch seeds itself with the current value (if the incident
    /// exists) before delivering subsequent changes. Subscribing happens
    /// before the seed read, so no commit between the two is lost; the
    /// same commit may be delivered twice instead, which consumers must
    /// tolerate.
    pub async fn watch_incident(&self, id: IncidentId) -> IncidentWatch {
        let rx = self.subscribe_events();
        let seed = self.get(id).await.ok();
        IncidentWatch::new(id, self.clone(), seed, rx)
    }

    /// Subscribe to change notifications for the whole collection.
    ///
    /// The first notification fires immediately so the subscriber renders
    /// the initial state.
    pub fn watch_all(&self) -> CollectionWatch {
        CollectionWatch::new(self.subscribe_events())
    }

    /// Number of live change-event subscriptions on this store.
    ///
    /// Each [`IncidentWatch`] and [`CollectionWatch`] holds one for its
    /// lifetime; plain reads and writes hold none.
    pub fn watcher_count(&self) -> usize {
        match self {
            Self::Memory(store) => store.watcher_count(),
            Self::Dragonfly(store) => store.watcher_count(),
        }
    }

    /// Subscribe to the raw change-event stream of the active backend.
    fn subscribe_events(&self) -> broadcast::Receiver<ChangeEvent> {
        match self {
            Self::Memory(store) => store.subscribe_events(),
            Self::Dragonfly(store) => store.subscribe_events(),
        }
    }
}

#[cfg(test)]
mod tests {
    use lifesync_types::Coordinate;

    use super::*;

    fn payload() -> NewIncident {
        NewIncident {
            patient_name: String::from("Jane Doe"),
            blood_type: String::from("AB-"),
            location: Coordinate { lat: 1.35, lng: 103.99 },
        }
    }

    #[test]
    fn assigned_records_start_pending() {
        let incident = assign_record(payload());
        assert_eq!(incident.status, IncidentStatus::Pending);
        assert!(incident.accepted_at.is_none());
        assert_eq!(incident.blood_type, "AB-");
    }

    #[tokio::test]
    async fn watch_incident_seeds_with_current_value() {
        let store = RecordStore::memory();
        let id = match store.create(payload()).await {
            Ok(incident) => incident.id,
            Err(e) => return assert!(false, "create failed: {e}"),
        };

        // Subscribe after creation: the seed must still deliver the
        // current value without waiting for another write.
        let mut watch = store.watch_incident(id).await;
        let seeded = watch.changed().await.ok();
        assert_eq!(seeded.map(|i| i.id), Some(id));
    }

    #[tokio::test]
    async fn watch_incident_delivers_acceptance() {
        let store = RecordStore::memory();
        let id = match store.create(payload()).await {
            Ok(incident) => incident.id,
            Err(e) => return assert!(false, "create failed: {e}"),
        };

        let mut watch = store.watch_incident(id).await;
        let _ = watch.changed().await; // seed (pending)

        let _ = store.accept_if_pending(id).await;
        let next = watch.changed().await.ok().map(|i| i.status);
        assert_eq!(next, Some(IncidentStatus::Accepted));
    }

    #[tokio::test]
    async fn watch_incident_ignores_other_incidents() {
        let store = RecordStore::memory();
        let (first, second) = tokio::join!(store.create(payload()), store.create(payload()));
        let (Ok(first), Ok(second)) = (first, second) else {
            return assert!(false, "create failed");
        };

        let mut watch = store.watch_incident(first.id).await;
        let _ = watch.changed().await; // seed

        // Accepting the other incident must not surface on this watch.
        let _ = store.accept_if_pending(second.id).await;
        let _ = store.accept_if_pending(first.id).await;

        let next = watch.changed().await.ok();
        assert_eq!(next.map(|i| i.id), Some(first.id));
    }

    #[tokio::test]
    async fn collection_watch_notifies_initially_and_per_change() {
        let store = RecordStore::memory();
        let mut watch = store.watch_all();

        // Initial notification with an empty collection.
        assert!(watch.changed().await.is_ok());
        assert!(store.list().await.unwrap_or_default().is_empty());

        let _ = store.create(payload()).await;
        assert!(watch.changed().await.is_ok());
        assert_eq!(store.list().await.unwrap_or_default().len(), 1);
    }
}
