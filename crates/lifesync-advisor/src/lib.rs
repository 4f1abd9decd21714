//! Advisory fallback service for the LifeSync engine.
//!
//! Fetches short first-aid guidance from an external text-generation
//! endpoint with a bounded wait, failing closed to a fixed offline
//! message. The service runs concurrently with, and causally decoupled
//! from, the incident flow: it never blocks or delays the SOS trigger
//! and never surfaces a raw error to the end user.
//!
//! # Modules
//!
//! - [`config`] -- env-driven backend and timeout configuration
//! - [`llm`] -- `OpenAI`-compatible and Anthropic backends over `reqwest`
//! - [`prompt`] -- fixed system instruction plus templated user context
//! - [`service`] -- the bounded fetch with the fail-closed fallback
//! - [`surface`] -- last-write-wins display surface with stale-result
//!   protection

pub mod config;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod service;
pub mod surface;

pub use config::{AdvisorConfig, BackendConfig, BackendType, DEFAULT_TIMEOUT};
pub use error::AdvisorError;
pub use llm::{create_backend, LlmBackend};
pub use prompt::{AdviceContext, PromptEngine, RenderedPrompt, SYSTEM_INSTRUCTION};
pub use service::{AdvisoryService, OFFLINE_FALLBACK};
pub use surface::AdvisorySurface;
