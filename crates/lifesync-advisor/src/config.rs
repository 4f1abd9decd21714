//! Configuration for the advisory service.
//!
//! All configuration is loaded from environment variables. The bearer
//! credential is treated as an opaque secret; a node without one simply
//! runs the advisory path offline, always answering with the fixed
//! fallback.

use std::time::Duration;

use crate::error::AdvisorError;

/// Default bounded wait for the external advisory call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Complete advisory configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    /// Backend endpoint configuration.
    pub backend: BackendConfig,
    /// Bounded wait for the external call; after this the fallback is
    /// shown and any in-flight result is discarded.
    pub timeout: Duration,
}

/// Configuration for the advisory backend endpoint.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// The backend type (openai or anthropic).
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// Bearer credential for authentication.
    pub api_key: String,
    /// Model identifier (e.g. `gpt-4o-mini`).
    pub model: String,
}

/// Supported advisory backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible chat completions API.
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
}

impl AdvisorConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `ADVISOR_BACKEND` -- backend type (`openai` or `anthropic`)
    /// - `ADVISOR_API_URL` -- API base URL
    /// - `ADVISOR_API_KEY` -- bearer credential
    /// - `ADVISOR_MODEL` -- model name
    ///
    /// Optional variables:
    /// - `ADVISOR_TIMEOUT_MS` -- bounded wait in milliseconds (default 10000)
    ///
    /// # Errors
    ///
    /// Returns [`AdvisorError::Config`] when a required variable is
    /// missing or malformed. Callers treat that as "run offline", not as
    /// a startup failure.
    pub fn from_env() -> Result<Self, AdvisorError> {
        let backend_str = env_var("ADVISOR_BACKEND")?;
        let api_url = env_var("ADVISOR_API_URL")?;
        let api_key = env_var("ADVISOR_API_KEY")?;
        let model = env_var("ADVISOR_MODEL")?;

        let backend_type = match backend_str.to_lowercase().as_str() {
            "openai" => BackendType::OpenAi,
            "anthropic" | "claude" => BackendType::Anthropic,
            other => {
                return Err(AdvisorError::Config(format!(
                    "unknown advisory backend type: {other}"
                )))
            }
        };

        let timeout_ms: u64 = std::env::var("ADVISOR_TIMEOUT_MS")
            .unwrap_or_else(|_| "10000".to_owned())
            .parse()
            .map_err(|e| AdvisorError::Config(format!("invalid ADVISOR_TIMEOUT_MS: {e}")))?;

        Ok(Self {
            backend: BackendConfig {
                backend_type,
                api_url,
                api_key,
                model,
            },
            timeout: Duration::from_millis(timeout_ms),
        })
    }
}

/// Read a required environment variable.
fn env_var(name: &str) -> Result<String, AdvisorError> {
    std::env::var(name)
        .map_err(|e| AdvisorError::Config(format!("missing required env var {name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_is_ten_seconds() {
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(10));
        let parsed: u64 = "10000".parse().unwrap_or(0);
        assert_eq!(Duration::from_millis(parsed), DEFAULT_TIMEOUT);
    }

    #[test]
    fn backend_config_direct_construction() {
        // Direct construction tests since from_env requires real env vars.
        let config = BackendConfig {
            backend_type: BackendType::OpenAi,
            api_url: "https://api.openai.com/v1".to_owned(),
            api_key: "test-key".to_owned(),
            model: "gpt-4o-mini".to_owned(),
        };
        assert_eq!(config.backend_type, BackendType::OpenAi);
    }
}
