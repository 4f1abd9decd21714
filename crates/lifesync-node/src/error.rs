//! Error types for the node binary.

use lifesync_core::GeoError;
use lifesync_store::StoreError;
use thiserror::Error;

/// Errors that abort node startup or serving.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Environment configuration was missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The record store backend could not be reached.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The configured position source was invalid.
    #[error("geolocation error: {0}")]
    Geo(#[from] GeoError),

    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}
