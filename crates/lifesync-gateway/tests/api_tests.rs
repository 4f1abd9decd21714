//! Integration tests for the gateway API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. The in-memory store backend and the offline
//! advisory service keep everything self-contained.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use lifesync_advisor::{AdvisoryService, OFFLINE_FALLBACK};
use lifesync_core::{GeoLocator, SessionStore};
use lifesync_gateway::router::build_router;
use lifesync_gateway::state::AppState;
use lifesync_store::RecordStore;
use lifesync_types::Coordinate;
use serde_json::{json, Value};
use tower::ServiceExt;

fn make_test_state() -> Arc<AppState> {
    let mut path = std::env::temp_dir();
    path.push(format!("lifesync-api-test-{}.json", uuid::Uuid::new_v4()));

    let locator = GeoLocator::Fixed(Coordinate {
        lat: 1.3521,
        lng: 103.8198,
    });

    Arc::new(AppState::new(
        RecordStore::memory(),
        locator,
        AdvisoryService::offline(),
        SessionStore::new(path),
    ))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(path: &str, payload: &Value) -> Request<Body> {
    Request::post(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

/// Trigger one SOS and return the created incident id as a string.
async fn trigger_sos(router: &axum::Router, name: &str) -> String {
    let response = router
        .clone()
        .oneshot(post_json(
            "/api/sos",
            &json!({ "patientName": name, "bloodType": "O+" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_json(response.into_body()).await;
    body["incidentId"].as_str().unwrap().to_owned()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/html"));
}

#[tokio::test]
async fn test_sos_creates_pending_incident() {
    let router = build_router(make_test_state());

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/sos",
            &json!({ "patientName": "Alex Pereira", "bloodType": "AB-" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_json(response.into_body()).await;
    assert!(body["incidentId"].is_string());
    assert_eq!(body["location"]["lat"], 1.3521);
    assert_eq!(body["location"]["lng"], 103.8198);

    let response = router
        .oneshot(Request::get("/api/incidents").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let incidents = body_to_json(response.into_body()).await;
    assert_eq!(incidents.as_array().map(Vec::len), Some(1));
    assert_eq!(incidents[0]["patientName"], "Alex Pereira");
    assert_eq!(incidents[0]["bloodType"], "AB-");
    assert_eq!(incidents[0]["status"], "pending");
    assert!(incidents[0].get("acceptedAt").is_none());
}

#[tokio::test]
async fn test_sos_holds_no_store_subscription_after_responding() {
    // Status streaming belongs to /ws/incidents/{id}; the trigger itself
    // must not leave long-lived watch tasks behind, or every SOS would
    // grow the process until acceptance (or forever).
    let state = make_test_state();
    let router = build_router(Arc::clone(&state));

    for caller in ["First Caller", "Second Caller", "Third Caller"] {
        trigger_sos(&router, caller).await;
    }

    assert_eq!(state.store.watcher_count(), 0);
}

#[tokio::test]
async fn test_sos_rejects_empty_patient_name() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(post_json(
            "/api/sos",
            &json!({ "patientName": "", "bloodType": "O+" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_json(response.into_body()).await;
    assert!(body["error"].as_str().unwrap().contains("patientName"));
}

#[tokio::test]
async fn test_accept_commits_once_then_conflicts() {
    let router = build_router(make_test_state());
    let id = trigger_sos(&router, "Mira Chen").await;
    let path = format!("/api/incidents/{id}/accept");

    let response = router
        .clone()
        .oneshot(Request::post(&path).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["status"], "accepted");
    assert!(body["acceptedAt"].is_string());

    // A second claim on the same incident loses.
    let response = router
        .oneshot(Request::post(&path).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_accept_unknown_incident_returns_404() {
    let router = build_router(make_test_state());

    let path = format!("/api/incidents/{}/accept", uuid::Uuid::now_v7());
    let response = router
        .oneshot(Request::post(&path).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_accept_invalid_uuid_returns_400() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(
            Request::post("/api/incidents/not-a-uuid/accept")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_incidents_listed_newest_first() {
    let router = build_router(make_test_state());

    trigger_sos(&router, "First Caller").await;
    trigger_sos(&router, "Second Caller").await;

    let response = router
        .oneshot(Request::get("/api/incidents").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let incidents = body_to_json(response.into_body()).await;
    assert_eq!(incidents.as_array().map(Vec::len), Some(2));
    assert_eq!(incidents[0]["patientName"], "Second Caller");
    assert_eq!(incidents[1]["patientName"], "First Caller");
}

#[tokio::test]
async fn test_advice_defaults_to_offline_fallback() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(Request::get("/api/advice").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["advice"], OFFLINE_FALLBACK);
}

#[tokio::test]
async fn test_responder_login_starts_feed_and_logout_stops_it() {
    let state = make_test_state();
    let router = build_router(Arc::clone(&state));

    let response = router
        .clone()
        .oneshot(post_json("/api/session", &json!({ "role": "responder" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["role"], "responder");
    assert!(state.feed_running().await);

    let response = router
        .oneshot(
            Request::delete("/api/session")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!state.feed_running().await);
}

#[tokio::test]
async fn test_citizen_login_leaves_feed_stopped() {
    let state = make_test_state();
    let router = build_router(Arc::clone(&state));

    let response = router
        .oneshot(post_json("/api/session", &json!({ "role": "citizen" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!state.feed_running().await);
}

#[tokio::test]
async fn test_nonexistent_route_returns_404() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(
            Request::get("/api/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
