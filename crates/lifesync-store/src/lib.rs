//! Record store client adapter for the LifeSync incident engine.
//!
//! The store is the single shared mutable resource of the system: the
//! lifecycle coordinator creates incidents here, every responder feed
//! derives its view from here, and acceptance commits here. Two backends
//! share one contract behind [`RecordStore`]:
//!
//! - [`MemoryStore`] -- in-process collection with broadcast fan-out
//! - [`DragonflyStore`] -- `Dragonfly`/Redis with pub/sub fan-out
//!
//! The contract guarantees store-assigned ids and timestamps, merge-write
//! partial updates, an atomic conditional claim
//! ([`RecordStore::accept_if_pending`]) so exactly one responder wins a
//! race, and per-incident change notification in commit order.

pub mod backend;
pub mod dragonfly;
pub mod error;
pub mod event;
pub mod memory;
pub mod watch;

pub use backend::RecordStore;
pub use dragonfly::DragonflyStore;
pub use error::StoreError;
pub use event::ChangeEvent;
pub use memory::MemoryStore;
pub use watch::{CollectionWatch, IncidentWatch};
