//! Per-connection WebSocket lifecycle.
//!
//! Each socket gets an inbound read loop and a dedicated write-pump task
//! draining the client's outbound queue. The hub holds the queue's sender;
//! when the hub evicts a client (or the read loop leaves the room) the
//! sender is dropped, the pump observes the closed queue, and the socket
//! is shut down.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dto::ws::{ClientMessage, PlayerPresence, ServerMessage};
use crate::hub::{ClientRole, RoomClient, OUTBOUND_QUEUE_CAPACITY};
use crate::state::SharedState;

/// Connection is dropped when nothing (including keepalive pongs) arrives
/// within this window.
const READ_TIMEOUT: Duration = Duration::from_secs(60);
/// Protocol-level pings go out at 9/10 of the read deadline.
const KEEPALIVE_PERIOD: Duration = Duration::from_secs(54);
/// Deadline for writing a single frame.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Who is on the other end of a socket.
pub struct ConnectionIdentity {
    pub client_id: Uuid,
    pub role: ClientRole,
    /// Display name; present for player connections.
    pub player_name: Option<String>,
}

impl ConnectionIdentity {
    pub fn host() -> Self {
        Self {
            client_id: Uuid::new_v4(),
            role: ClientRole::Host,
            player_name: None,
        }
    }

    pub fn player(player_id: Uuid, name: String) -> Self {
        Self {
            client_id: player_id,
            role: ClientRole::Player,
            player_name: Some(name),
        }
    }

    fn presence(&self) -> PlayerPresence {
        PlayerPresence {
            player_id: self.client_id,
            name: self.player_name.clone().unwrap_or_default(),
        }
    }
}

/// Handle the full lifecycle of one client connection.
pub async fn handle_socket(
    state: SharedState,
    socket: WebSocket,
    code: String,
    identity: ConnectionIdentity,
) {
    let (sender, mut receiver) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE_CAPACITY);
    // Weak handle for control-frame replies; it must not hold the queue open
    // past hub eviction.
    let control_tx = outbound_tx.downgrade();

    let writer_task = tokio::spawn(write_pump(sender, outbound_rx));

    state
        .hub()
        .join_room(
            &code,
            RoomClient::new(identity.client_id, identity.role, outbound_tx),
        )
        .await;
    info!(code, client_id = %identity.client_id, role = ?identity.role, "client connected");

    if identity.role == ClientRole::Player {
        state
            .hub()
            .broadcast(&code, &ServerMessage::PlayerJoined(identity.presence()))
            .await;
    }

    // Re-sync a late joiner: mid-question they get the current question,
    // any other phase arrives naturally with the next broadcast.
    match state.engine().current_question(&code, identity.role).await {
        Ok(Some(message)) => {
            state
                .hub()
                .send_to_client(&code, identity.client_id, &message)
                .await;
        }
        Ok(None) => {}
        Err(err) => {
            warn!(code, error = %err, "could not re-sync connection");
        }
    }

    loop {
        let frame = match timeout(READ_TIMEOUT, receiver.next()).await {
            Err(_) => {
                warn!(code, client_id = %identity.client_id, "read deadline expired");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(err))) => {
                warn!(code, client_id = %identity.client_id, error = %err, "websocket error");
                break;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Message::Text(text) => dispatch(&state, &code, &identity, text.as_str()).await,
            Message::Ping(payload) => {
                if let Some(tx) = control_tx.upgrade() {
                    let _ = tx.try_send(Message::Pong(payload));
                }
            }
            Message::Close(_) => break,
            Message::Binary(_) | Message::Pong(_) => {}
        }
    }

    state.hub().leave_room(&code, identity.client_id).await;
    if identity.role == ClientRole::Player {
        state
            .hub()
            .broadcast(&code, &ServerMessage::PlayerLeft(identity.presence()))
            .await;
    }
    info!(code, client_id = %identity.client_id, "client disconnected");

    let _ = writer_task.await;
}

/// Drain the outbound queue onto the socket, interleaving keepalive pings.
async fn write_pump(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<Message>,
) {
    let mut keepalive = interval_at(Instant::now() + KEEPALIVE_PERIOD, KEEPALIVE_PERIOD);
    loop {
        tokio::select! {
            maybe = outbound_rx.recv() => match maybe {
                Some(message) => {
                    if !send_with_deadline(&mut sender, message).await {
                        break;
                    }
                }
                None => {
                    // Queue closed by eviction or room leave; say goodbye.
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            },
            _ = keepalive.tick() => {
                if !send_with_deadline(&mut sender, Message::Ping(Bytes::new())).await {
                    break;
                }
            }
        }
    }
}

async fn send_with_deadline(
    sender: &mut SplitSink<WebSocket, Message>,
    message: Message,
) -> bool {
    matches!(timeout(WRITE_TIMEOUT, sender.send(message)).await, Ok(Ok(())))
}

/// Decode one inbound envelope and route it by type and role.
///
/// Malformed envelopes and role violations are logged and dropped; the
/// connection stays open.
async fn dispatch(state: &SharedState, code: &str, identity: &ConnectionIdentity, raw: &str) {
    let message = match serde_json::from_str::<ClientMessage>(raw) {
        Ok(message) => message,
        Err(err) => {
            warn!(code, error = %err, "dropping unparseable envelope");
            return;
        }
    };

    match message {
        ClientMessage::Ping(_) => {
            state
                .hub()
                .send_to_client(code, identity.client_id, &ServerMessage::pong())
                .await;
        }
        ClientMessage::AnswerSubmitted {
            question_id,
            option_id,
        } => {
            if identity.role == ClientRole::Host {
                return;
            }
            let (Ok(question_id), Ok(option_id)) =
                (Uuid::parse_str(&question_id), Uuid::parse_str(&option_id))
            else {
                warn!(code, "dropping answer with malformed ids");
                return;
            };
            if let Err(err) = state
                .engine()
                .submit_answer(code, identity.client_id, question_id, option_id)
                .await
            {
                warn!(code, player_id = %identity.client_id, error = %err, "answer rejected");
            }
        }
        ClientMessage::NextQuestion(_) => {
            if identity.role != ClientRole::Host {
                return;
            }
            if let Err(err) = state.engine().next_question(code).await {
                warn!(code, error = %err, "cannot advance to next question");
            }
        }
        ClientMessage::Unknown => {
            debug!(code, "ignoring unsupported message type");
        }
    }
}
