//! Configuration for the node binary.
//!
//! All configuration is loaded from environment variables. The node
//! needs a bind address, an optional Dragonfly URL (memory store when
//! absent), a position source, and a session file path. The advisory
//! backend is configured separately by `lifesync-advisor`.

use std::path::PathBuf;
use std::time::Duration;

use lifesync_types::Coordinate;

use crate::error::NodeError;

/// Default HTTP bind address.
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Default session file path.
const DEFAULT_SESSION_FILE: &str = "lifesync-session.json";

/// Default geolocation HTTP timeout in milliseconds.
const DEFAULT_GEO_TIMEOUT_MS: u64 = 5_000;

/// Position source selection.
#[derive(Debug, Clone)]
pub enum GeoConfig {
    /// A fixed coordinate from `FIXED_LAT` / `FIXED_LNG`.
    Fixed(Coordinate),
    /// An HTTP position endpoint from `GEOLOCATION_URL`.
    Http {
        /// Endpoint returning a JSON `{lat, lng}` fix.
        url: String,
        /// Per-request deadline.
        timeout: Duration,
    },
}

/// Complete node configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// HTTP listen address (e.g. `0.0.0.0:8080`).
    pub bind_addr: String,
    /// Dragonfly connection URL. `None` selects the in-memory store.
    pub store_url: Option<String>,
    /// Where the session gate persists the active role.
    pub session_file: PathBuf,
    /// Position source for the SOS trigger.
    pub geo: GeoConfig,
}

impl NodeConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional variables:
    /// - `BIND_ADDR` -- listen address (default `0.0.0.0:8080`)
    /// - `STORE_URL` -- Dragonfly URL, e.g. `redis://localhost:6379`
    ///   (default: in-memory store)
    /// - `SESSION_FILE` -- session persistence path (default
    ///   `lifesync-session.json`)
    /// - `GEOLOCATION_URL` -- HTTP position endpoint
    /// - `GEO_TIMEOUT_MS` -- position request deadline (default 5000)
    /// - `FIXED_LAT`, `FIXED_LNG` -- fixed coordinate, used when no
    ///   `GEOLOCATION_URL` is set
    ///
    /// One of `GEOLOCATION_URL` or the `FIXED_LAT`/`FIXED_LNG` pair is
    /// required. When both are present the HTTP endpoint wins.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Config`] if a variable is malformed or no
    /// position source is configured.
    pub fn from_env() -> Result<Self, NodeError> {
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_owned());

        let store_url = std::env::var("STORE_URL").ok();

        let session_file = std::env::var("SESSION_FILE")
            .map_or_else(|_| PathBuf::from(DEFAULT_SESSION_FILE), PathBuf::from);

        let geo = load_geo_config()?;

        Ok(Self {
            bind_addr,
            store_url,
            session_file,
            geo,
        })
    }
}

/// Resolve the position source from the environment.
fn load_geo_config() -> Result<GeoConfig, NodeError> {
    if let Ok(url) = std::env::var("GEOLOCATION_URL") {
        let timeout_ms: u64 = std::env::var("GEO_TIMEOUT_MS")
            .unwrap_or_else(|_| DEFAULT_GEO_TIMEOUT_MS.to_string())
            .parse()
            .map_err(|e| NodeError::Config(format!("invalid GEO_TIMEOUT_MS: {e}")))?;
        return Ok(GeoConfig::Http {
            url,
            timeout: Duration::from_millis(timeout_ms),
        });
    }

    let lat = parse_coord_var("FIXED_LAT")?;
    let lng = parse_coord_var("FIXED_LNG")?;
    match (lat, lng) {
        (Some(lat), Some(lng)) => Ok(GeoConfig::Fixed(Coordinate { lat, lng })),
        (None, None) => Err(NodeError::Config(
            "no position source: set GEOLOCATION_URL or FIXED_LAT/FIXED_LNG".to_owned(),
        )),
        _ => Err(NodeError::Config(
            "FIXED_LAT and FIXED_LNG must be set together".to_owned(),
        )),
    }
}

/// Parse an optional coordinate component variable.
fn parse_coord_var(name: &str) -> Result<Option<f64>, NodeError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| NodeError::Config(format!("invalid {name}: {e}"))),
        Err(_) => Ok(None),
    }
}
