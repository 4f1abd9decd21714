//! Enumeration types for the incident lifecycle and the session gate.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle state of an incident.
///
/// The transition is monotonic: an incident moves `Pending` to `Accepted`
/// exactly once and never backward. The derived [`Ord`] makes the
/// monotonicity expressible (`Pending < Accepted`), which the store's
/// conditional write and the tests lean on.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    TS,
)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum IncidentStatus {
    /// Broadcast to responders, not yet claimed.
    Pending,
    /// Claimed by exactly one responder. Terminal.
    Accepted,
}

impl IncidentStatus {
    /// Wire representation of the status (matches the serde rename).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
        }
    }
}

impl core::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client role supplied by the session gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Role {
    /// Reporting party: triggers SOS and creates incidents.
    Citizen,
    /// Responding party: watches the feed and claims incidents.
    Responder,
}

impl Role {
    /// Wire representation of the role (matches the serde rename).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Citizen => "citizen",
            Self::Responder => "responder",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
