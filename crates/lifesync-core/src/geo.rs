//! Single-shot geolocation acquisition.
//!
//! The emergency flow cannot proceed without a coordinate, so every
//! failure mode (endpoint unreachable, timeout, malformed or out-of-range
//! fix) collapses into one error. No retry is performed here; retrying is
//! the reporter's decision.

use std::time::Duration;

use lifesync_types::Coordinate;
use serde::Deserialize;
use tracing::debug;

/// Errors that can occur while acquiring a position fix.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    /// No usable coordinate could be obtained.
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),
}

/// A high-accuracy position source.
///
/// Uses enum dispatch instead of trait objects because async methods are
/// not dyn-compatible in Rust.
#[derive(Debug, Clone)]
pub enum GeoLocator {
    /// Fixed coordinate from configuration (kiosk deployments, tests).
    Fixed(Coordinate),
    /// Single-shot query against an HTTP positioning endpoint.
    Http(HttpLocator),
}

impl GeoLocator {
    /// Build a locator for a configured fixed coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::LocationUnavailable`] if the coordinate is out
    /// of geographic range.
    pub fn fixed(coordinate: Coordinate) -> Result<Self, GeoError> {
        if coordinate.is_valid() {
            Ok(Self::Fixed(coordinate))
        } else {
            Err(GeoError::LocationUnavailable(format!(
                "configured coordinate out of range: {}, {}",
                coordinate.lat, coordinate.lng
            )))
        }
    }

    /// Request one position sample.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::LocationUnavailable`] on any failure. The
    /// caller must not create an incident without the returned coordinate.
    pub async fn acquire(&self) -> Result<Coordinate, GeoError> {
        match self {
            Self::Fixed(coordinate) => Ok(*coordinate),
            Self::Http(locator) => locator.acquire().await,
        }
    }
}

/// Positioning endpoint response body.
#[derive(Debug, Deserialize)]
struct PositionFix {
    lat: f64,
    lng: f64,
}

/// HTTP positioning client, e.g. a local GPS daemon or a Wi-Fi
/// positioning service exposing `{"lat": .., "lng": ..}`.
#[derive(Debug, Clone)]
pub struct HttpLocator {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpLocator {
    /// Create a locator querying the given endpoint with a bounded wait.
    pub fn new(url: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            timeout,
        }
    }

    /// Request one high-accuracy fix from the endpoint.
    async fn acquire(&self) -> Result<Coordinate, GeoError> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| GeoError::LocationUnavailable(format!("position request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::LocationUnavailable(format!(
                "position endpoint returned {status}"
            )));
        }

        let fix: PositionFix = response.json().await.map_err(|e| {
            GeoError::LocationUnavailable(format!("position response parse failed: {e}"))
        })?;

        validate_fix(&fix)
    }
}

/// Range-check a fix before handing it to the incident flow.
fn validate_fix(fix: &PositionFix) -> Result<Coordinate, GeoError> {
    let coordinate = Coordinate { lat: fix.lat, lng: fix.lng };
    if coordinate.is_valid() {
        debug!(lat = coordinate.lat, lng = coordinate.lng, "position fix acquired");
        Ok(coordinate)
    } else {
        Err(GeoError::LocationUnavailable(format!(
            "fix out of range: {}, {}",
            fix.lat, fix.lng
        )))
    }
}
