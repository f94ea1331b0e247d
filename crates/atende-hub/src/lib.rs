// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process pub/sub hub keeping operator clients in sync with backend state.
//!
//! Each connected socket registers a bounded outbox (an mpsc sender of
//! serialized frames) under a client id. Broadcasts serialize the event once
//! and `try_send` it to every member of the target rooms; a full or closed
//! outbox is skipped with a warning and never fails the caller. There is no
//! durable queue -- disconnected clients resynchronize through the REST read
//! APIs.

pub mod events;

use std::collections::HashSet;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub use events::{HubEvent, Room};

/// Bound of one client's outbox. A client that cannot drain 64 frames is
/// considered slow and starts losing events (at-most-once delivery).
pub const OUTBOX_CAPACITY: usize = 64;

struct HubClient {
    sender: mpsc::Sender<String>,
    rooms: HashSet<String>,
}

/// The broadcast hub. Cheap to share behind an `Arc`.
#[derive(Default)]
pub struct Hub {
    clients: DashMap<String, HubClient>,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
        }
    }

    /// Register a connected client.
    ///
    /// The client implicitly joins the global room, plus its department room
    /// when it authenticated as an agent with a department.
    pub fn register(
        &self,
        client_id: &str,
        sender: mpsc::Sender<String>,
        department_id: Option<&str>,
    ) {
        let mut rooms = HashSet::new();
        rooms.insert(Room::global().key().to_string());
        if let Some(dept) = department_id {
            rooms.insert(Room::department(dept).key().to_string());
        }
        self.clients
            .insert(client_id.to_string(), HubClient { sender, rooms });
        debug!(client_id, "hub client registered");
    }

    /// Remove a client and all its memberships.
    pub fn unregister(&self, client_id: &str) {
        self.clients.remove(client_id);
        debug!(client_id, "hub client unregistered");
    }

    /// Join a room. Idempotent; unknown clients are ignored.
    pub fn join(&self, client_id: &str, room: &Room) {
        if let Some(mut client) = self.clients.get_mut(client_id) {
            client.rooms.insert(room.key().to_string());
        }
    }

    /// Leave a room. Idempotent.
    pub fn leave(&self, client_id: &str, room: &Room) {
        if let Some(mut client) = self.clients.get_mut(client_id) {
            client.rooms.remove(room.key());
        }
    }

    /// Whether a client currently belongs to a room.
    pub fn is_member(&self, client_id: &str, room: &Room) -> bool {
        self.clients
            .get(client_id)
            .map(|c| c.rooms.contains(room.key()))
            .unwrap_or(false)
    }

    /// Number of connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Fan an event out to every client that belongs to at least one of
    /// `rooms`. Each client receives the frame at most once even when it sits
    /// in several of the target rooms.
    ///
    /// Fire-and-forget: delivery failures are logged and swallowed.
    pub fn broadcast(&self, rooms: &[Room], event: &HubEvent) {
        let frame = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize hub event");
                return;
            }
        };

        let mut delivered = 0usize;
        for entry in self.clients.iter() {
            let member = rooms.iter().any(|room| entry.rooms.contains(room.key()));
            if !member {
                continue;
            }
            match entry.sender.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(client_id = entry.key().as_str(), "outbox full, dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    // Socket task already went away; unregister happens on its
                    // cleanup path.
                    debug!(client_id = entry.key().as_str(), "outbox closed, skipping");
                }
            }
        }
        debug!(rooms = rooms.len(), delivered, "hub event broadcast");
    }

    /// Broadcast to every connected client.
    pub fn broadcast_global(&self, event: &HubEvent) {
        self.broadcast(&[Room::global()], event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atende_core::ConnectionState;

    fn typing(conversation_id: &str) -> HubEvent {
        HubEvent::UserTyping {
            conversation_id: conversation_id.to_string(),
            user_name: "Maria".to_string(),
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_room_members_only() {
        let hub = Hub::new();
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        hub.register("a", tx_a, None);
        hub.register("b", tx_b, None);
        hub.join("a", &Room::conversation("cv-1"));
        hub.join("b", &Room::conversation("cv-2"));

        hub.broadcast(&[Room::conversation("cv-1")], &typing("cv-1"));

        let frame = rx_a.try_recv().unwrap();
        assert!(frame.contains("user_typing"));
        // Client b is joined to a different conversation and must see nothing.
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn client_in_two_target_rooms_gets_one_frame() {
        let hub = Hub::new();
        let (tx, mut rx) = mpsc::channel(8);
        hub.register("a", tx, Some("dp-1"));
        hub.join("a", &Room::conversation("cv-1"));

        hub.broadcast(
            &[Room::conversation("cv-1"), Room::department("dp-1")],
            &typing("cv-1"),
        );

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err(), "no duplicate frame");
    }

    #[tokio::test]
    async fn register_auto_joins_department_room() {
        let hub = Hub::new();
        let (tx, mut rx) = mpsc::channel(8);
        hub.register("a", tx, Some("dp-1"));

        hub.broadcast(&[Room::department("dp-1")], &typing("cv-9"));
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn join_and_leave_are_idempotent() {
        let hub = Hub::new();
        let (tx, _rx) = mpsc::channel(8);
        hub.register("a", tx, None);

        let room = Room::conversation("cv-1");
        hub.join("a", &room);
        hub.join("a", &room);
        assert!(hub.is_member("a", &room));

        hub.leave("a", &room);
        hub.leave("a", &room);
        assert!(!hub.is_member("a", &room));
    }

    #[tokio::test]
    async fn full_outbox_never_fails_the_broadcast() {
        let hub = Hub::new();
        let (tx, _rx) = mpsc::channel(1);
        hub.register("slow", tx, None);

        // Second broadcast overflows the capacity-1 outbox; both calls return.
        hub.broadcast_global(&HubEvent::ConnectionStatus {
            state: ConnectionState::Ready,
        });
        hub.broadcast_global(&HubEvent::ConnectionStatus {
            state: ConnectionState::Disconnected,
        });
        assert_eq!(hub.client_count(), 1);
    }

    #[tokio::test]
    async fn dropped_receiver_is_skipped() {
        let hub = Hub::new();
        let (tx, rx) = mpsc::channel(8);
        hub.register("gone", tx, None);
        drop(rx);

        hub.broadcast_global(&typing("cv-1"));
        // Client is still registered (cleanup belongs to the socket task) but
        // the send was swallowed.
        assert_eq!(hub.client_count(), 1);
    }

    #[tokio::test]
    async fn unregister_removes_membership() {
        let hub = Hub::new();
        let (tx, mut rx) = mpsc::channel(8);
        hub.register("a", tx, Some("dp-1"));
        hub.unregister("a");

        hub.broadcast(&[Room::department("dp-1")], &typing("cv-1"));
        assert!(rx.try_recv().is_err());
        assert_eq!(hub.client_count(), 0);
    }
}
