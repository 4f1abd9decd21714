//! Error types for the record store adapter.
//!
//! All errors are propagated via [`StoreError`], which wraps the underlying
//! [`fred`] errors with additional context about which operation failed.
//! `AlreadyAccepted` is a normal, expected outcome of the conditional claim
//! write rather than a fault; callers match on it.

use lifesync_types::IncidentId;

/// Errors that can occur in the record store adapter.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No incident exists under the given id.
    #[error("incident not found: {0}")]
    NotFound(IncidentId),

    /// The conditional claim write found the incident already accepted.
    ///
    /// Exactly one concurrent `accept` observes success; every other
    /// caller gets this.
    #[error("incident already accepted: {0}")]
    AlreadyAccepted(IncidentId),

    /// The store has shut down and no further notifications will arrive.
    #[error("store closed")]
    Closed,

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Whether the error is the expected lost-claim outcome rather than
    /// a store fault.
    pub const fn is_already_accepted(&self) -> bool {
        matches!(self, Self::AlreadyAccepted(_))
    }
}
