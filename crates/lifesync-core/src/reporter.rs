//! Reporter-side incident lifecycle coordinator.
//!
//! Drives one incident from the SOS trigger to resolution from the
//! reporting client's perspective:
//!
//! ```text
//! Idle -> Submitting -> Pending -> Accepted
//!           |
//!           +-> Idle (location or creation failure, retryable)
//! ```
//!
//! There is no transition out of `Accepted`.

use lifesync_store::{RecordStore, StoreError};
use lifesync_types::{Incident, IncidentId, IncidentStatus, PatientInfo};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::geo::{GeoError, GeoLocator};

/// Errors surfaced to the reporter. Both are retryable conditions, not
/// crashes: the reporter stays in a degraded local state and may trigger
/// again.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// No coordinate could be acquired; an incident without a location is
    /// forbidden, so nothing was created.
    #[error("cannot report without a location fix: {0}")]
    LocationUnavailable(#[from] GeoError),

    /// The store write failed; no incident exists, the reporter should
    /// retry.
    #[error("incident creation failed: {0}")]
    CreationFailed(#[from] StoreError),
}

/// Reporter-view lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterState {
    /// No active emergency.
    Idle,
    /// Acquiring the fix and writing the record.
    Submitting,
    /// Incident created, waiting for a responder.
    Pending(IncidentId),
    /// A responder committed to the incident. Terminal.
    Accepted(IncidentId),
}

impl ReporterState {
    /// Short name for logging.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Pending(_) => "pending",
            Self::Accepted(_) => "accepted",
        }
    }
}

/// Coordinates one incident for the reporting client.
pub struct IncidentReporter {
    locator: GeoLocator,
    store: RecordStore,
    state: ReporterState,
}

impl IncidentReporter {
    /// Create an idle reporter.
    pub const fn new(locator: GeoLocator, store: RecordStore) -> Self {
        Self {
            locator,
            store,
            state: ReporterState::Idle,
        }
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> ReporterState {
        self.state
    }

    /// Trigger the emergency flow: acquire a fix, create the incident.
    ///
    /// On success the reporter is `Pending` and the assigned id is
    /// returned. On failure the reporter falls back to `Idle` with no
    /// network effect, so the caller can retry.
    ///
    /// # Errors
    ///
    /// [`ReportError::LocationUnavailable`] if no coordinate could be
    /// acquired, [`ReportError::CreationFailed`] if the store write
    /// failed.
    pub async fn report_emergency(
        &mut self,
        patient: PatientInfo,
    ) -> Result<IncidentId, ReportError> {
        self.state = ReporterState::Submitting;

        let location = match self.locator.acquire().await {
            Ok(location) => location,
            Err(e) => {
                warn!(error = %e, "SOS trigger without a usable fix");
                self.state = ReporterState::Idle;
                return Err(e.into());
            }
        };

        let incident = match self.store.create(patient.at(location)).await {
            Ok(incident) => incident,
            Err(e) => {
                warn!(error = %e, "incident creation failed, reporter back to idle");
                self.state = ReporterState::Idle;
                return Err(e.into());
            }
        };

        info!(
            incident_id = %incident.id,
            lat = location.lat,
            lng = location.lng,
            "emergency reported"
        );
        self.state = ReporterState::Pending(incident.id);
        Ok(incident.id)
    }

    /// Subscribe to acceptance of the given incident.
    ///
    /// The returned watch resolves at most once per subscription, even if
    /// the store reports `accepted` repeatedly; repeated notifications
    /// have no further observable effect. Dropping the watch cancels the
    /// subscription.
    pub fn watch_status(&self, id: IncidentId) -> AcceptanceWatch {
        AcceptanceWatch::spawn(self.store.clone(), id)
    }

    /// Record the acceptance observed by a watch.
    ///
    /// Ignored unless the reporter is `Pending` on the same incident, so
    /// stale or duplicate notifications cannot move the state backward.
    pub fn mark_accepted(&mut self, id: IncidentId) {
        if self.state == ReporterState::Pending(id) {
            self.state = ReporterState::Accepted(id);
            info!(incident_id = %id, "help is on the way");
        }
    }
}

/// A live subscription waiting for one incident to become accepted.
///
/// Owns the background task; dropping the watch aborts it, releasing the
/// underlying store subscription (mandatory teardown on logout or
/// navigation away).
pub struct AcceptanceWatch {
    rx: Option<oneshot::Receiver<Incident>>,
    handle: JoinHandle<()>,
}

impl AcceptanceWatch {
    fn spawn(store: RecordStore, id: IncidentId) -> Self {
        let (tx, rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let mut watch = store.watch_incident(id).await;
            loop {
                match watch.changed().await {
                    Ok(incident) if incident.status == IncidentStatus::Accepted => {
                        // First observation wins; the loop ends here, so
                        // later duplicate notifications are never seen.
                        let _ = tx.send(incident);
                        return;
                    }
                    Ok(incident) => {
                        debug!(
                            incident_id = %id,
                            status = %incident.status,
                            "incident not yet accepted"
                        );
                    }
                    Err(e) => {
                        warn!(incident_id = %id, error = %e, "status watch ended");
                        return;
                    }
                }
            }
        });

        Self { rx: Some(rx), handle }
    }

    /// Wait until the incident is accepted.
    ///
    /// Returns the accepted record, or `None` if the store shut down
    /// before acceptance was observed. Taking `self` consumes the watch:
    /// the notification cannot fire twice.
    pub async fn accepted(mut self) -> Option<Incident> {
        let rx = self.rx.take()?;
        // Once the receiver resolves, the background task has finished its
        // send; the Drop abort that follows is a no-op.
        rx.await.ok()
    }
}

impl Drop for AcceptanceWatch {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use lifesync_types::{Coordinate, IncidentPatch};

    use super::*;

    fn reporter(store: &RecordStore) -> IncidentReporter {
        let locator = GeoLocator::Fixed(Coordinate { lat: 1.30, lng: 103.80 });
        IncidentReporter::new(locator, store.clone())
    }

    fn patient() -> PatientInfo {
        PatientInfo {
            patient_name: String::from("John Doe"),
            blood_type: String::from("O+"),
        }
    }

    #[tokio::test]
    async fn normal_flow_reaches_accepted() {
        let store = RecordStore::memory();
        let mut reporter = reporter(&store);
        assert_eq!(reporter.state(), ReporterState::Idle);

        let id = match reporter.report_emergency(patient()).await {
            Ok(id) => id,
            Err(e) => return assert!(false, "report failed: {e}"),
        };
        assert_eq!(reporter.state(), ReporterState::Pending(id));

        // Incident is visible to responders with a location from creation.
        let visible = store.get(id).await.ok();
        assert!(matches!(visible, Some(ref i) if i.location.is_valid()));

        let watch = reporter.watch_status(id);
        let _ = store.accept_if_pending(id).await;

        let accepted = watch.accepted().await;
        assert!(matches!(
            accepted,
            Some(ref i) if i.status == IncidentStatus::Accepted
        ));

        reporter.mark_accepted(id);
        assert_eq!(reporter.state(), ReporterState::Accepted(id));
    }

    #[tokio::test]
    async fn duplicate_accepted_notifications_have_no_effect() {
        let store = RecordStore::memory();
        let mut reporter = reporter(&store);
        let id = match reporter.report_emergency(patient()).await {
            Ok(id) => id,
            Err(e) => return assert!(false, "report failed: {e}"),
        };

        let watch = reporter.watch_status(id);
        let _ = store.accept_if_pending(id).await;
        // A second "accepted" write reaches any live subscription, but the
        // watch has already resolved and must not fire again.
        let at = chrono::Utc::now();
        let _ = store.update(id, IncidentPatch::accepted(at)).await;

        assert!(watch.accepted().await.is_some());

        reporter.mark_accepted(id);
        reporter.mark_accepted(id);
        assert_eq!(reporter.state(), ReporterState::Accepted(id));
    }

    #[tokio::test]
    async fn stale_acceptance_cannot_move_state_backward() {
        let store = RecordStore::memory();
        let mut reporter = reporter(&store);
        let id = match reporter.report_emergency(patient()).await {
            Ok(id) => id,
            Err(e) => return assert!(false, "report failed: {e}"),
        };

        // Acceptance for some other incident id is ignored.
        reporter.mark_accepted(IncidentId::new());
        assert_eq!(reporter.state(), ReporterState::Pending(id));
    }

    #[tokio::test]
    async fn location_failure_returns_to_idle_without_creating() {
        let store = RecordStore::memory();
        // Unroutable locator: loopback port with an immediate timeout.
        let locator = GeoLocator::Http(crate::geo::HttpLocator::new(
            String::from("http://127.0.0.1:1/position"),
            std::time::Duration::from_millis(50),
        ));
        let mut reporter = IncidentReporter::new(locator, store.clone());

        let result = reporter.report_emergency(patient()).await;
        assert!(matches!(result, Err(ReportError::LocationUnavailable(_))));
        assert_eq!(reporter.state(), ReporterState::Idle);
        // No partial incident was created.
        assert!(store.list().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn dropping_the_watch_cancels_the_subscription() {
        let store = RecordStore::memory();
        let reporter = reporter(&store);
        let watch = reporter.watch_status(IncidentId::new());
        let handle_finished = watch.handle.is_finished();
        drop(watch);
        // The task was alive before the drop and is aborted by it.
        assert!(!handle_finished);
    }
}
