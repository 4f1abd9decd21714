//! The incident record, its creation payload, and the merge-write patch.
//!
//! Field names serialize in `camelCase` to match the wire format the web
//! clients and the record store share (`patientName`, `createdAt`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::IncidentStatus;
use crate::ids::IncidentId;

// ---------------------------------------------------------------------------
// Coordinate
// ---------------------------------------------------------------------------

/// A geographic coordinate, set exactly once at incident creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Coordinate {
    /// Latitude in decimal degrees, range -90.0 to 90.0.
    pub lat: f64,
    /// Longitude in decimal degrees, range -180.0 to 180.0.
    pub lng: f64,
}

impl Coordinate {
    /// Whether both components are finite and within geographic range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

// ---------------------------------------------------------------------------
// PatientInfo / NewIncident
// ---------------------------------------------------------------------------

/// Descriptive patient details supplied by the reporter at the SOS trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PatientInfo {
    /// Patient display name.
    pub patient_name: String,
    /// Blood type, e.g. `O+`.
    pub blood_type: String,
}

impl PatientInfo {
    /// Combine with a resolved location fix into a creation payload.
    ///
    /// This is the only constructor for [`NewIncident`], which makes the
    /// "no incident without a coordinate" rule structural.
    pub fn at(self, location: Coordinate) -> NewIncident {
        NewIncident {
            patient_name: self.patient_name,
            blood_type: self.blood_type,
            location,
        }
    }
}

/// Creation payload for an incident.
///
/// The store assigns `id`, `status = pending`, and `created_at`; everything
/// the reporter controls lives here. The location is a non-optional field:
/// a partial incident with a missing fix cannot be expressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct NewIncident {
    /// Patient display name, immutable after creation.
    pub patient_name: String,
    /// Blood type, immutable after creation.
    pub blood_type: String,
    /// Location fix, set exactly once at creation.
    pub location: Coordinate,
}

// ---------------------------------------------------------------------------
// Incident
// ---------------------------------------------------------------------------

/// A single emergency report tracked through the pending/accepted lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Incident {
    /// Store-assigned identifier, immutable.
    pub id: IncidentId,
    /// Patient display name, immutable.
    pub patient_name: String,
    /// Blood type, immutable.
    pub blood_type: String,
    /// Location fix, immutable, always present.
    pub location: Coordinate,
    /// Lifecycle state. Moves pending to accepted at most once.
    pub status: IncidentStatus,
    /// Store-assigned creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Store-assigned acceptance timestamp. Present iff `status` is
    /// `Accepted`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
}

impl Incident {
    /// Whether a responder can still claim this incident.
    pub fn is_claimable(&self) -> bool {
        self.status == IncidentStatus::Pending
    }
}

// ---------------------------------------------------------------------------
// IncidentPatch
// ---------------------------------------------------------------------------

/// Merge-write partial update for an incident.
///
/// Only the fields that are `Some` are written; unspecified fields keep
/// their current value. Identity fields (`id`, `patient_name`,
/// `blood_type`, `location`, `created_at`) are immutable and therefore not
/// representable here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct IncidentPatch {
    /// New lifecycle state, if being changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<IncidentStatus>,
    /// New acceptance timestamp, if being set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
}

impl IncidentPatch {
    /// The patch a successful claim commits: `status = accepted` plus the
    /// server-assigned acceptance timestamp.
    pub const fn accepted(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(IncidentStatus::Accepted),
            accepted_at: Some(at),
        }
    }

    /// Apply this patch to an incident, overwriting only the targeted
    /// fields.
    pub fn apply(self, incident: &mut Incident) {
        if let Some(status) = self.status {
            incident.status = status;
        }
        if let Some(accepted_at) = self.accepted_at {
            incident.accepted_at = Some(accepted_at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Incident {
        Incident {
            id: IncidentId::new(),
            patient_name: String::from("John Doe"),
            blood_type: String::from("O+"),
            location: Coordinate { lat: 1.30, lng: 103.80 },
            status: IncidentStatus::Pending,
            created_at: Utc::now(),
            accepted_at: None,
        }
    }

    #[test]
    fn incident_serializes_camel_case() {
        let json = serde_json::to_value(sample()).unwrap_or_default();
        assert!(json.get("patientName").is_some());
        assert!(json.get("bloodType").is_some());
        assert!(json.get("createdAt").is_some());
        // acceptedAt is omitted while pending.
        assert!(json.get("acceptedAt").is_none());
    }

    #[test]
    fn patch_overwrites_only_targeted_fields() {
        let mut incident = sample();
        let name_before = incident.patient_name.clone();
        let accepted_at = Utc::now();

        IncidentPatch::accepted(accepted_at).apply(&mut incident);

        assert_eq!(incident.status, IncidentStatus::Accepted);
        assert_eq!(incident.accepted_at, Some(accepted_at));
        assert_eq!(incident.patient_name, name_before);
    }

    #[test]
    fn empty_patch_is_a_no_op() {
        let mut incident = sample();
        let before = incident.clone();
        IncidentPatch::default().apply(&mut incident);
        assert_eq!(incident, before);
    }

    #[test]
    fn claimable_only_while_pending() {
        let mut incident = sample();
        assert!(incident.is_claimable());
        IncidentPatch::accepted(Utc::now()).apply(&mut incident);
        assert!(!incident.is_claimable());
    }

    #[test]
    fn coordinate_range_validation() {
        assert!(Coordinate { lat: 1.30, lng: 103.80 }.is_valid());
        assert!(!Coordinate { lat: 91.0, lng: 0.0 }.is_valid());
        assert!(!Coordinate { lat: 0.0, lng: -181.0 }.is_valid());
        assert!(!Coordinate { lat: f64::NAN, lng: 0.0 }.is_valid());
    }
}
