//! Axum router construction for the gateway.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin client access.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the gateway.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `POST /api/sos` -- emergency trigger
/// - `GET /api/incidents` -- feed snapshot
/// - `POST /api/incidents/{id}/accept` -- claim an incident
/// - `GET /api/advice` -- latest advisory text
/// - `POST /api/session`, `DELETE /api/session` -- role gate
/// - `GET /ws/incidents` -- feed snapshot stream
/// - `GET /ws/incidents/{id}` -- single-incident status stream
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket streams
        .route("/ws/incidents", get(ws::ws_feed))
        .route("/ws/incidents/{id}", get(ws::ws_incident_status))
        // REST API
        .route("/api/sos", post(handlers::trigger_sos))
        .route("/api/incidents", get(handlers::list_incidents))
        .route("/api/incidents/{id}/accept", post(handlers::accept_incident))
        .route("/api/advice", get(handlers::get_advice))
        .route("/api/session", post(handlers::login).delete(handlers::logout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
