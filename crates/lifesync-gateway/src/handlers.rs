//! REST endpoint handlers for the gateway.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `POST` | `/api/sos` | Trigger the emergency flow |
//! | `GET` | `/api/incidents` | Current feed snapshot, newest first |
//! | `POST` | `/api/incidents/:id/accept` | Claim an incident |
//! | `GET` | `/api/advice` | Latest advisory text |
//! | `POST` | `/api/session` | Login with a role |
//! | `DELETE` | `/api/session` | Logout, tearing down the feed |

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::Json;
use lifesync_core::IncidentReporter;
use lifesync_types::{Coordinate, Incident, IncidentId, PatientInfo, Role};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::GatewayError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response payloads
// ---------------------------------------------------------------------------

/// Payload for `POST /api/sos`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SosRequest {
    /// Patient display name.
    #[validate(length(min = 1, max = 120, message = "patientName must be 1-120 characters"))]
    pub patient_name: String,
    /// Blood type, e.g. `O+`.
    #[validate(length(min = 1, max = 8, message = "bloodType must be 1-8 characters"))]
    pub blood_type: String,
    /// Optional free-text situation note, forwarded to the advisory
    /// service only.
    #[serde(default)]
    pub details: Option<String>,
}

/// Response for `POST /api/sos`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SosResponse {
    /// Store-assigned incident id.
    pub incident_id: IncidentId,
    /// The acquired location fix.
    pub location: Coordinate,
}

/// Response for `GET /api/advice`.
#[derive(Debug, Serialize)]
pub struct AdviceResponse {
    /// The advisory text currently shown (never empty; the offline
    /// fallback at worst).
    pub advice: String,
}

/// Payload for `POST /api/session`.
#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    /// Role to activate.
    pub role: Role,
}

/// Response for `POST /api/session`.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// The activated role.
    pub role: Role,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing node status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let incident_count = state.store.list().await.map_or(0, |l| l.len());
    let backend = state.store.backend_name();
    let advisor = if state.advisor.is_online() { "online" } else { "offline" };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>LifeSync</title>
</head>
<body>
    <h1>LifeSync</h1>
    <p>store backend: {backend}</p>
    <p>advisory backend: {advisor}</p>
    <p>known incidents: {incident_count}</p>
    <ul>
        <li><a href="/api/incidents">/api/incidents</a></li>
        <li><a href="/api/advice">/api/advice</a></li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// POST /api/sos -- the emergency trigger
// ---------------------------------------------------------------------------

/// Run the emergency trigger.
///
/// Two independent tasks start here: the advisory fetch (spawned
/// fire-and-forget, joined only at the advisory surface) and the
/// incident flow (acquire fix, create record). Nothing on the incident
/// path waits for the advisory call.
pub async fn trigger_sos(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SosRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    request
        .validate()
        .map_err(|e| GatewayError::Validation(e.to_string()))?;

    // Start the advisory fetch immediately, before the location fix, the
    // way the trigger must never be delayed by it.
    spawn_advisory_fetch(&state, request.details.clone());

    let patient = PatientInfo {
        patient_name: request.patient_name,
        blood_type: request.blood_type,
    };

    // Reporters follow the resolution over /ws/incidents/{id}; the
    // handler holds no watch of its own.
    let mut reporter = IncidentReporter::new(state.locator.clone(), state.store.clone());
    let incident_id = reporter.report_emergency(patient).await?;
    let incident = state.store.get(incident_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(SosResponse {
            incident_id,
            location: incident.location,
        }),
    ))
}

/// Spawn the fire-and-forget advisory fetch for one trigger.
fn spawn_advisory_fetch(state: &Arc<AppState>, details: Option<String>) {
    let advisor = Arc::clone(&state.advisor);
    let surface = state.surface.clone();
    let generation = surface.begin();

    tokio::spawn(async move {
        let context = lifesync_advisor::AdviceContext {
            location: None,
            details,
        };
        let text = advisor.fetch_advice(&context).await;
        surface.publish(generation, text);
    });
}

// ---------------------------------------------------------------------------
// Incident feed and claim
// ---------------------------------------------------------------------------

/// `GET /api/incidents` -- the current snapshot, newest first.
pub async fn list_incidents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Incident>>, GatewayError> {
    let snapshot = state.feed.snapshot().await?;
    Ok(Json(snapshot.incidents))
}

/// `POST /api/incidents/{id}/accept` -- claim an incident.
///
/// Exactly one concurrent claim succeeds; the losers get 409.
pub async fn accept_incident(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Incident>, GatewayError> {
    let incident = state.feed.accept(IncidentId::from(id)).await?;
    info!(incident_id = %incident.id, "claim committed");
    Ok(Json(incident))
}

// ---------------------------------------------------------------------------
// Advisory surface
// ---------------------------------------------------------------------------

/// `GET /api/advice` -- the advisory text currently shown.
pub async fn get_advice(State(state): State<Arc<AppState>>) -> Json<AdviceResponse> {
    Json(AdviceResponse {
        advice: state.surface.latest(),
    })
}

// ---------------------------------------------------------------------------
// Session gate
// ---------------------------------------------------------------------------

/// `POST /api/session` -- activate a role.
///
/// A responder login starts the feed fan-out task.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SessionRequest>,
) -> Result<Json<SessionResponse>, GatewayError> {
    state
        .session
        .save(request.role)
        .map_err(|e| GatewayError::Internal(e.to_string()))?;

    if request.role == Role::Responder {
        state.start_feed().await;
    }

    info!(role = %request.role, "session activated");
    Ok(Json(SessionResponse { role: request.role }))
}

/// `DELETE /api/session` -- logout.
///
/// Clears the persisted role and tears down the feed task, releasing its
/// store subscription. Logging out while logged out is a no-op.
pub async fn logout(State(state): State<Arc<AppState>>) -> Result<StatusCode, GatewayError> {
    state
        .session
        .clear()
        .map_err(|e| GatewayError::Internal(e.to_string()))?;
    state.stop_feed().await;

    info!("session cleared");
    Ok(StatusCode::NO_CONTENT)
}
