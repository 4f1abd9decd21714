//! Error types for the gateway.
//!
//! [`GatewayError`] unifies all failure modes into a single enum that
//! converts into an HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. The
//! retryable emergency-flow failures map to 5xx so a reporting client
//! knows to try again; a lost claim maps to 409, which is an expected
//! outcome rather than a server fault.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lifesync_core::{AcceptError, ReportError};
use lifesync_store::StoreError;
use lifesync_types::IncidentId;

/// Errors that can occur in the gateway layer.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No location fix could be acquired; the incident was not created.
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),

    /// The record store write failed; the reporter should retry.
    #[error("incident creation failed: {0}")]
    CreationFailed(String),

    /// Another responder already claimed the incident.
    #[error("incident already accepted: {0}")]
    AlreadyAccepted(IncidentId),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request payload failed validation.
    #[error("invalid request: {0}")]
    Validation(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ReportError> for GatewayError {
    fn from(e: ReportError) -> Self {
        match e {
            ReportError::LocationUnavailable(geo) => Self::LocationUnavailable(geo.to_string()),
            ReportError::CreationFailed(store) => Self::CreationFailed(store.to_string()),
        }
    }
}

impl From<AcceptError> for GatewayError {
    fn from(e: AcceptError) -> Self {
        match e {
            AcceptError::AlreadyAccepted(id) => Self::AlreadyAccepted(id),
            AcceptError::NotFound(id) => Self::NotFound(id.to_string()),
            AcceptError::Store(store) => Self::Internal(store.to_string()),
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => Self::NotFound(id.to_string()),
            StoreError::AlreadyAccepted(id) => Self::AlreadyAccepted(id),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::LocationUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            Self::CreationFailed(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            Self::AlreadyAccepted(id) => (
                StatusCode::CONFLICT,
                format!("incident {id} was already accepted by another responder"),
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_failures_map_to_5xx() {
        let location = GatewayError::LocationUnavailable(String::from("denied"));
        assert_eq!(
            location.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let creation = GatewayError::CreationFailed(String::from("store down"));
        assert_eq!(creation.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn lost_claim_maps_to_conflict() {
        let lost = GatewayError::AlreadyAccepted(IncidentId::new());
        assert_eq!(lost.into_response().status(), StatusCode::CONFLICT);
    }
}
