//! The advisory service: bounded external fetch, fail-closed fallback.
//!
//! The service is invoked fire-and-forget in parallel with incident
//! creation and is never on the emergency flow's critical path. Its one
//! hard guarantee: [`AdvisoryService::fetch_advice`] always returns a
//! usable advisory string -- the external result when the call succeeds
//! within the bound, the fixed offline fallback otherwise. Raw errors
//! never reach the end user.

use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::{AdvisorConfig, DEFAULT_TIMEOUT};
use crate::llm::{create_backend, LlmBackend};
use crate::prompt::{AdviceContext, PromptEngine};

/// Deterministic offline advisory, shown whenever the external call
/// fails or exceeds the bound.
pub const OFFLINE_FALLBACK: &str =
    "Stay calm. Keep the patient comfortable and monitor breathing until help arrives.";

/// Fetches first-aid guidance with a bounded wait and a fail-closed
/// fallback.
pub struct AdvisoryService {
    backend: Option<LlmBackend>,
    prompts: Option<PromptEngine>,
    timeout: Duration,
}

impl AdvisoryService {
    /// Create a service backed by the configured endpoint.
    pub fn new(config: &AdvisorConfig) -> Self {
        Self {
            backend: Some(create_backend(&config.backend)),
            prompts: PromptEngine::new().ok(),
            timeout: config.timeout,
        }
    }

    /// Create a service with no external backend: every fetch answers
    /// with the offline fallback. Used when no credential is configured.
    pub const fn offline() -> Self {
        Self {
            backend: None,
            prompts: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Whether an external backend is configured.
    pub const fn is_online(&self) -> bool {
        self.backend.is_some()
    }

    /// Fetch advice for one SOS trigger.
    ///
    /// Infallible by design: any failure (no backend, template error,
    /// network error, non-2xx, parse failure, empty answer, timeout)
    /// yields [`OFFLINE_FALLBACK`]. If the bound elapses, the in-flight
    /// request's eventual result is discarded.
    pub async fn fetch_advice(&self, context: &AdviceContext) -> String {
        let (Some(backend), Some(prompts)) = (&self.backend, &self.prompts) else {
            debug!("advisory backend not configured, serving offline fallback");
            return OFFLINE_FALLBACK.to_owned();
        };

        let prompt = match prompts.render(context) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "advisory prompt render failed, serving fallback");
                return OFFLINE_FALLBACK.to_owned();
            }
        };

        match timeout(self.timeout, backend.complete(&prompt)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => {
                debug!(backend = backend.name(), "advisory fetched");
                text
            }
            Ok(Ok(_)) => {
                warn!(backend = backend.name(), "empty advisory answer, serving fallback");
                OFFLINE_FALLBACK.to_owned()
            }
            Ok(Err(e)) => {
                warn!(backend = backend.name(), error = %e, "advisory fetch failed, serving fallback");
                OFFLINE_FALLBACK.to_owned()
            }
            Err(_) => {
                warn!(
                    backend = backend.name(),
                    timeout_ms = self.timeout.as_millis(),
                    "advisory fetch exceeded the bound, serving fallback"
                );
                OFFLINE_FALLBACK.to_owned()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{BackendConfig, BackendType};

    use super::*;

    #[tokio::test]
    async fn offline_service_always_serves_the_fixed_fallback() {
        let service = AdvisoryService::offline();
        assert!(!service.is_online());

        let advice = service.fetch_advice(&AdviceContext::default()).await;
        assert_eq!(advice, OFFLINE_FALLBACK);
        assert!(!advice.is_empty());
    }

    #[tokio::test]
    async fn unreachable_backend_fails_closed_within_the_bound() {
        // Loopback port with nothing listening: the connection is refused
        // immediately and the failure must become the fallback, not an
        // error and not an empty string.
        let service = AdvisoryService::new(&AdvisorConfig {
            backend: BackendConfig {
                backend_type: BackendType::OpenAi,
                api_url: "http://127.0.0.1:1".to_owned(),
                api_key: "test".to_owned(),
                model: "gpt-4o-mini".to_owned(),
            },
            timeout: Duration::from_millis(500),
        });

        let advice = service.fetch_advice(&AdviceContext::default()).await;
        assert_eq!(advice, OFFLINE_FALLBACK);
    }

    #[tokio::test]
    async fn hung_backend_falls_back_at_the_timeout_bound() {
        // A listener that accepts the connection and then never answers:
        // the elapsed-timeout branch must fire at roughly the configured
        // bound and serve the fallback.
        let listener = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
            Ok(listener) => listener,
            Err(e) => return assert!(false, "bind failed: {e}"),
        };
        let addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => return assert!(false, "local_addr failed: {e}"),
        };
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                if let Ok((socket, _)) = listener.accept().await {
                    held.push(socket);
                }
            }
        });

        let bound = Duration::from_millis(200);
        let service = AdvisoryService::new(&AdvisorConfig {
            backend: BackendConfig {
                backend_type: BackendType::OpenAi,
                api_url: format!("http://{addr}"),
                api_key: "test".to_owned(),
                model: "gpt-4o-mini".to_owned(),
            },
            timeout: bound,
        });

        let started = tokio::time::Instant::now();
        let advice = service.fetch_advice(&AdviceContext::default()).await;
        let elapsed = started.elapsed();

        assert_eq!(advice, OFFLINE_FALLBACK);
        assert!(elapsed >= bound, "returned before the bound: {elapsed:?}");
        assert!(
            elapsed < Duration::from_secs(2),
            "fallback took far longer than the bound: {elapsed:?}"
        );
        server.abort();
    }

    #[test]
    fn fallback_text_is_the_pinned_string() {
        assert_eq!(
            OFFLINE_FALLBACK,
            "Stay calm. Keep the patient comfortable and monitor breathing until help arrives."
        );
    }
}
