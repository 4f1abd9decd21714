//! Shared type definitions for the LifeSync incident coordination engine.
//!
//! This crate is the single source of truth for the types that flow between
//! the record store, the lifecycle coordinator, the responder feed, and the
//! gateway. Wire-visible types export `TypeScript` bindings via `ts-rs` for
//! the web clients.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for incident identifiers
//! - [`enums`] -- Incident status and client role enumerations
//! - [`incident`] -- The incident record, creation payload, and merge patch

pub mod enums;
pub mod ids;
pub mod incident;

// Re-export all public types at crate root for convenience.
pub use enums::{IncidentStatus, Role};
pub use ids::IncidentId;
pub use incident::{Coordinate, Incident, IncidentPatch, NewIncident, PatientInfo};
