//! Change events fanned out to store subscribers.

use lifesync_types::{Incident, IncidentId};
use serde::{Deserialize, Serialize};

/// A committed change to the incident collection.
///
/// Carries the full value of the incident after the commit, mirroring the
/// store's "push the current value" subscription contract. Events for the
/// same incident are delivered in commit order; no order is guaranteed
/// across different incidents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Full value of the incident after the commit.
    pub incident: Incident,
}

impl ChangeEvent {
    /// Id of the incident this event concerns.
    pub const fn id(&self) -> IncidentId {
        self.incident.id
    }
}
