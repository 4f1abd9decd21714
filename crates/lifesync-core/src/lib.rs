//! Incident lifecycle and real-time synchronization engine for LifeSync.
//!
//! Coordinates a life-safety emergency request between a reporting party
//! and a pool of responders: an incident is created with a location fix,
//! fanned out to all connected responders, and transitions to accepted
//! exactly once when a responder commits to it.
//!
//! # Modules
//!
//! - [`geo`] -- single-shot high-accuracy position acquisition
//! - [`reporter`] -- reporter-side lifecycle coordinator (`Idle` through
//!   `Accepted`)
//! - [`feed`] -- responder-side live view and the atomic claim
//! - [`session`] -- typed, file-backed role gate persistence

pub mod feed;
pub mod geo;
pub mod reporter;
pub mod session;

pub use feed::{AcceptError, FeedGuard, FeedSnapshot, ResponderFeed};
pub use geo::{GeoError, GeoLocator, HttpLocator};
pub use reporter::{AcceptanceWatch, IncidentReporter, ReportError, ReporterState};
pub use session::{SessionError, SessionStore};
