//! Multi-room fan-out hub for connected WebSocket clients.
//!
//! Rooms are keyed by session code. The hub holds each client's outbound
//! queue handle; connections themselves are owned by their adapter task.
//! Enqueues never block: a client whose queue is full is treated as dead,
//! its queue is closed, and the adapter tears the connection down when it
//! observes the close.

use std::collections::HashMap;

use axum::extract::ws::{Message, Utf8Bytes};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dto::ws::ServerMessage;

/// Bounded capacity of each client's outbound queue.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Role a connection plays inside its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRole {
    Host,
    Player,
}

/// Handle used to push serialized frames to one connected client.
pub struct RoomClient {
    pub id: Uuid,
    pub role: ClientRole,
    tx: mpsc::Sender<Message>,
}

impl RoomClient {
    pub fn new(id: Uuid, role: ClientRole, tx: mpsc::Sender<Message>) -> Self {
        Self { id, role, tx }
    }
}

/// Fan-out hub multiplexing rooms of connected clients.
#[derive(Default)]
pub struct RoomHub {
    rooms: RwLock<HashMap<String, HashMap<Uuid, RoomClient>>>,
}

impl RoomHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a client into a room, creating the room on first join.
    pub async fn join_room(&self, code: &str, client: RoomClient) {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(code.to_string())
            .or_default()
            .insert(client.id, client);
    }

    /// Remove a client from a room, deleting the room when it empties.
    /// Idempotent.
    pub async fn leave_room(&self, code: &str, client_id: Uuid) {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get_mut(code) {
            room.remove(&client_id);
            if room.is_empty() {
                rooms.remove(code);
            }
        }
    }

    /// Send a message to every client in a room.
    pub async fn broadcast(&self, code: &str, message: &ServerMessage) {
        self.fan_out(code, message, |_| true).await;
    }

    /// Send a message to the room's host connections only.
    pub async fn broadcast_to_host(&self, code: &str, message: &ServerMessage) {
        self.fan_out(code, message, |client| client.role == ClientRole::Host)
            .await;
    }

    /// Send a message to every non-host connection in a room.
    pub async fn broadcast_to_players(&self, code: &str, message: &ServerMessage) {
        self.fan_out(code, message, |client| client.role != ClientRole::Host)
            .await;
    }

    /// Send a message to one client; no-op when the client is not present.
    pub async fn send_to_client(&self, code: &str, client_id: Uuid, message: &ServerMessage) {
        self.fan_out(code, message, |client| client.id == client_id)
            .await;
    }

    /// Number of non-host clients currently in a room.
    pub async fn room_player_count(&self, code: &str) -> usize {
        let rooms = self.rooms.read().await;
        rooms
            .get(code)
            .map(|room| {
                room.values()
                    .filter(|client| client.role == ClientRole::Player)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Serialize once, then enqueue for every client matching `filter`.
    ///
    /// Enqueues are non-blocking; clients that cannot keep up are evicted
    /// so one stalled connection never backpressures the room.
    async fn fan_out<F>(&self, code: &str, message: &ServerMessage, filter: F)
    where
        F: Fn(&RoomClient) -> bool,
    {
        let frame = match serde_json::to_string(message) {
            Ok(payload) => Message::Text(Utf8Bytes::from(payload)),
            Err(err) => {
                warn!(error = %err, "failed to serialize outbound message");
                return;
            }
        };

        let mut dead = Vec::new();
        {
            let rooms = self.rooms.read().await;
            let Some(room) = rooms.get(code) else {
                return;
            };
            for client in room.values().filter(|client| filter(client)) {
                if client.tx.try_send(frame.clone()).is_err() {
                    dead.push(client.id);
                }
            }
        }

        if !dead.is_empty() {
            let mut rooms = self.rooms.write().await;
            if let Some(room) = rooms.get_mut(code) {
                for client_id in dead {
                    debug!(code, %client_id, "evicting slow or closed client");
                    room.remove(&client_id);
                }
                if room.is_empty() {
                    rooms.remove(code);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::ws::{PlayerPresence, ServerMessage};

    fn presence() -> ServerMessage {
        ServerMessage::PlayerJoined(PlayerPresence {
            player_id: Uuid::new_v4(),
            name: "ada".into(),
        })
    }

    fn client(role: ClientRole, capacity: usize) -> (RoomClient, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity);
        (RoomClient::new(Uuid::new_v4(), role, tx), rx)
    }

    #[tokio::test]
    async fn broadcast_reaches_every_room_member() {
        let hub = RoomHub::new();
        let (host, mut host_rx) = client(ClientRole::Host, 8);
        let (player, mut player_rx) = client(ClientRole::Player, 8);
        hub.join_room("111111", host).await;
        hub.join_room("111111", player).await;

        hub.broadcast("111111", &presence()).await;

        assert!(host_rx.try_recv().is_ok());
        assert!(player_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn audience_filters_split_host_and_players() {
        let hub = RoomHub::new();
        let (host, mut host_rx) = client(ClientRole::Host, 8);
        let (player, mut player_rx) = client(ClientRole::Player, 8);
        hub.join_room("222222", host).await;
        hub.join_room("222222", player).await;

        hub.broadcast_to_players("222222", &presence()).await;
        assert!(host_rx.try_recv().is_err());
        assert!(player_rx.try_recv().is_ok());

        hub.broadcast_to_host("222222", &presence()).await;
        assert!(host_rx.try_recv().is_ok());
        assert!(player_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn targeted_send_hits_one_client_and_ignores_strangers() {
        let hub = RoomHub::new();
        let (first, mut first_rx) = client(ClientRole::Player, 8);
        let (second, mut second_rx) = client(ClientRole::Player, 8);
        let first_id = first.id;
        hub.join_room("333333", first).await;
        hub.join_room("333333", second).await;

        hub.send_to_client("333333", first_id, &presence()).await;
        assert!(first_rx.try_recv().is_ok());
        assert!(second_rx.try_recv().is_err());

        // Unknown client id is a no-op.
        hub.send_to_client("333333", Uuid::new_v4(), &presence()).await;
    }

    #[tokio::test]
    async fn player_count_excludes_hosts_and_empty_rooms() {
        let hub = RoomHub::new();
        assert_eq!(hub.room_player_count("444444").await, 0);

        let (host, _host_rx) = client(ClientRole::Host, 8);
        let (player, _player_rx) = client(ClientRole::Player, 8);
        hub.join_room("444444", host).await;
        hub.join_room("444444", player).await;

        assert_eq!(hub.room_player_count("444444").await, 1);
    }

    #[tokio::test]
    async fn slow_consumer_is_evicted_and_its_queue_closed() {
        let hub = RoomHub::new();
        let (player, mut player_rx) = client(ClientRole::Player, 1);
        hub.join_room("555555", player).await;

        // First broadcast fills the queue; second one overflows it.
        hub.broadcast("555555", &presence()).await;
        hub.broadcast("555555", &presence()).await;

        assert_eq!(hub.room_player_count("555555").await, 0);
        assert!(player_rx.recv().await.is_some());
        // Sender was dropped on eviction, so the queue reports closed.
        assert!(player_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn leave_room_is_idempotent() {
        let hub = RoomHub::new();
        let (player, _rx) = client(ClientRole::Player, 8);
        let player_id = player.id;
        hub.join_room("666666", player).await;

        hub.leave_room("666666", player_id).await;
        hub.leave_room("666666", player_id).await;
        assert_eq!(hub.room_player_count("666666").await, 0);
    }
}
