//! Room registry and fan-out.
//!
//! Each connection owns an unbounded mpsc channel; the hub keeps the sender
//! and fans frames out per room or globally. Dead senders are pruned on the
//! next delivery attempt.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::protocol::ServerEnvelope;

/// Opaque connection handle issued by the hub.
pub type ConnectionId = u64;

/// Pub/sub room registry.
#[derive(Default)]
pub struct Hub {
    connections: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerEnvelope>>>,
    rooms: RwLock<HashMap<String, HashSet<ConnectionId>>>,
    next_id: AtomicU64,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Room name for a project's live feed.
    pub fn project_room(project_id: &str) -> String {
        format!("project-{}", project_id)
    }

    /// Room name for an admin viewer mirroring a recording.
    pub fn admin_room(recording_id: &str) -> String {
        format!("recording-admin-{}", recording_id)
    }

    /// Registers a connection and returns its id and frame receiver.
    pub fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEnvelope>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.write().insert(id, tx);
        (id, rx)
    }

    /// Removes the connection from every room and drops its sender.
    pub fn disconnect(&self, id: ConnectionId) {
        self.connections.write().remove(&id);
        let mut rooms = self.rooms.write();
        for members in rooms.values_mut() {
            members.remove(&id);
        }
        rooms.retain(|_, members| !members.is_empty());
    }

    pub fn join(&self, room: &str, id: ConnectionId) {
        self.rooms.write().entry(room.to_string()).or_default().insert(id);
    }

    pub fn leave(&self, room: &str, id: ConnectionId) {
        let mut rooms = self.rooms.write();
        if let Some(members) = rooms.get_mut(room) {
            members.remove(&id);
            if members.is_empty() {
                rooms.remove(room);
            }
        }
    }

    /// Current number of members in a room.
    pub fn room_size(&self, room: &str) -> usize {
        self.rooms.read().get(room).map_or(0, HashSet::len)
    }

    /// Sends a frame to one connection.
    pub fn send_to(&self, id: ConnectionId, envelope: ServerEnvelope) {
        let stale = match self.connections.read().get(&id) {
            Some(tx) => tx.send(envelope).is_err(),
            None => false,
        };
        if stale {
            self.disconnect(id);
        }
    }

    /// Fans a frame out to every member of a room.
    pub fn broadcast_room(&self, room: &str, envelope: &ServerEnvelope) {
        let members: Vec<ConnectionId> = self
            .rooms
            .read()
            .get(room)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default();
        self.fan_out(&members, envelope);
    }

    /// Fans a frame out to every connected client, regardless of room.
    pub fn broadcast_all(&self, envelope: &ServerEnvelope) {
        let members: Vec<ConnectionId> = self.connections.read().keys().copied().collect();
        self.fan_out(&members, envelope);
    }

    fn fan_out(&self, members: &[ConnectionId], envelope: &ServerEnvelope) {
        let mut stale = Vec::new();
        {
            let connections = self.connections.read();
            for id in members {
                if let Some(tx) = connections.get(id) {
                    if tx.send(envelope.clone()).is_err() {
                        stale.push(*id);
                    }
                }
            }
        }
        for id in stale {
            self.disconnect(id);
        }
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }
}
