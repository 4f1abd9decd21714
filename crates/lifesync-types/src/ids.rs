//! Type-safe identifier wrapper around [`Uuid`].
//!
//! Incident identifiers use UUID v7 (time-ordered), so the creation order
//! of incidents is recoverable from the id alone. The responder feed relies
//! on this to break ties when two incidents share a `created_at` timestamp.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Unique identifier for an incident, assigned by the record store at
/// creation and immutable thereafter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct IncidentId(pub Uuid);

impl IncidentId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for IncidentId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for IncidentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for IncidentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<IncidentId> for Uuid {
    fn from(id: IncidentId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_time_ordered() {
        let first = IncidentId::new();
        let second = IncidentId::new();
        // UUID v7 embeds a millisecond timestamp, so later ids never sort
        // before earlier ones.
        assert!(first <= second);
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = IncidentId::new();
        let json = serde_json::to_string(&original).ok();
        assert!(json.is_some());
        let restored: Result<IncidentId, _> =
            serde_json::from_str(json.as_deref().unwrap_or(""));
        assert_eq!(restored.ok(), Some(original));
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = IncidentId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
