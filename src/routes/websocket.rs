use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    services::connection::{self, ConnectionIdentity},
    state::SharedState,
};

/// Inbound envelopes larger than this are rejected at the framing layer.
const MAX_ENVELOPE_BYTES: usize = 512;

/// Identity a player carries into its WebSocket connection.
#[derive(Debug, Deserialize)]
pub struct PlayerWsQuery {
    pub player_id: Uuid,
    pub name: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/ws/host/{code}",
    tag = "ws",
    params(("code" = String, Path, description = "Six-digit join code")),
    responses((status = 101, description = "Switching protocols to WebSocket"))
)]
/// Upgrade the host's connection into the session room.
pub async fn host_ws(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.max_message_size(MAX_ENVELOPE_BYTES)
        .on_upgrade(move |socket| {
            connection::handle_socket(state, socket, code, ConnectionIdentity::host())
        })
}

#[utoipa::path(
    get,
    path = "/api/v1/ws/player/{code}",
    tag = "ws",
    params(
        ("code" = String, Path, description = "Six-digit join code"),
        ("player_id" = Uuid, Query, description = "Identity issued by the join endpoint"),
        ("name" = String, Query, description = "Display name")
    ),
    responses((status = 101, description = "Switching protocols to WebSocket"))
)]
/// Upgrade a player's connection into the session room.
pub async fn player_ws(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Query(query): Query<PlayerWsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.max_message_size(MAX_ENVELOPE_BYTES)
        .on_upgrade(move |socket| {
            connection::handle_socket(
                state,
                socket,
                code,
                ConnectionIdentity::player(query.player_id, query.name),
            )
        })
}

/// Configure the WebSocket endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/ws/host/{code}", get(host_ws))
        .route("/ws/player/{code}", get(player_ws))
}
