//! Error types for the advisory service.
//!
//! These errors never leave the service boundary: every failure mode is
//! absorbed into the fixed offline fallback before the caller sees a
//! result. The typed variants exist for logging and tests.

/// Errors that can occur while fetching advice.
#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    /// The advisory backend returned an error or was unreachable.
    #[error("advisory backend error: {0}")]
    Backend(String),

    /// Failed to render the prompt template.
    #[error("template render error: {0}")]
    Template(String),

    /// The bounded wait elapsed before the backend answered.
    #[error("timeout: advisory fetch exceeded the bound")]
    Timeout,

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}
