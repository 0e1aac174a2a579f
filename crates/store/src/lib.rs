//! Storage layer for the capture engine.
//!
//! All durable state lives behind the [`EventStore`] trait: interactions,
//! session recordings, funnel definitions, and the active-recording slot.
//! [`MemoryStore`] is the in-process engine; a database-backed store slots in
//! behind the same trait.

pub mod memory;
pub mod query;
pub mod store;

pub use memory::MemoryStore;
pub use query::*;
pub use store::EventStore;
