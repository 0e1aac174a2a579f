//! Realtime relay: pub/sub rooms for live session mirroring.
//!
//! Instrumented clients and admin viewers share a WebSocket endpoint. The
//! hub fans frames out to rooms; the relay drives the per-connection
//! protocol and keeps the active-recording slot in the shared store.

pub mod classify;
pub mod hub;
pub mod protocol;
pub mod relay;

pub use classify::classify_replay_event;
pub use hub::{ConnectionId, Hub};
pub use protocol::*;
pub use relay::Relay;
