//! HTTP and `WebSocket` surface for the LifeSync incident engine.
//!
//! The gateway exposes the emergency trigger, the responder feed with
//! its claim operation, the advisory surface, and the session gate over
//! Axum. All real-time fan-out rides the same broadcast the feed task
//! publishes to, so every connected responder sees the same snapshots.
//!
//! # Modules
//!
//! - [`state`] -- shared [`state::AppState`] wiring all subsystems
//! - [`router`] -- route table and middleware
//! - [`handlers`] -- REST endpoints
//! - [`ws`] -- feed and single-incident `WebSocket` streams
//! - [`error`] -- [`error::GatewayError`] with HTTP mappings

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod ws;

pub use error::GatewayError;
pub use router::build_router;
pub use state::AppState;
