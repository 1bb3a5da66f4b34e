//! Session lifecycle operations: create, join, start, and end.

use rand::Rng;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::dao::storage::StorageError;
use crate::dto::session::{
    CreateSessionRequest, JoinedSession, JoinSessionRequest, PlayerSummary, SessionCreated,
    SessionSummary,
};
use crate::dto::ws::ServerMessage;
use crate::error::AppError;
use crate::state::SharedState;

/// Attempts to allocate an unclaimed join code before giving up.
const CODE_ALLOCATION_ATTEMPTS: usize = 5;

/// Open a new session for an existing quiz and hand out its join code.
pub async fn create_session(
    state: &SharedState,
    request: CreateSessionRequest,
) -> Result<SessionCreated, AppError> {
    if !state.game_store().quiz_exists(request.quiz_id).await? {
        return Err(AppError::NotFound(format!(
            "quiz `{}` not found",
            request.quiz_id
        )));
    }

    // Codes are human-entered, so collisions with a live session are
    // rejected by the unique constraint; retry with a fresh sample.
    for _ in 0..CODE_ALLOCATION_ATTEMPTS {
        let code = generate_code();
        match state
            .game_store()
            .create_session(request.quiz_id, code)
            .await
        {
            Ok(session) => {
                info!(code = %session.code, session_id = %session.id, "session created");
                return Ok(SessionCreated {
                    session_id: session.id,
                    code: session.code,
                });
            }
            Err(StorageError::Conflict { .. }) => continue,
            Err(err) => return Err(err.into()),
        }
    }

    Err(AppError::Internal(
        "could not allocate an unused session code".into(),
    ))
}

/// Enter a lobby by join code, registering the player in the session.
pub async fn join_session(
    state: &SharedState,
    request: JoinSessionRequest,
) -> Result<JoinedSession, AppError> {
    request.validate()?;

    let Some(session) = state
        .game_store()
        .find_joinable_session(request.code.clone())
        .await?
    else {
        return Err(AppError::NotFound(
            "game not found or already started".into(),
        ));
    };

    let player = state
        .game_store()
        .insert_player(session.id, request.name)
        .await?;

    Ok(JoinedSession {
        player_id: player.id,
        session_id: session.id,
        code: session.code,
        name: player.name,
    })
}

/// Begin play: flip the session to active, announce it, and kick off the
/// engine on a background task.
pub async fn start_session(state: &SharedState, id: Uuid) -> Result<SessionSummary, AppError> {
    let Some(session) = state.game_store().activate_session(id).await? else {
        return Err(AppError::NotFound(
            "session not found or already started".into(),
        ));
    };

    state
        .hub()
        .broadcast(
            &session.code,
            &ServerMessage::GameStarted {
                session_id: session.id,
            },
        )
        .await;

    // The HTTP response must not wait on (or cancel) the game start.
    let engine = state.engine().clone();
    let code = session.code.clone();
    let session_id = session.id;
    let quiz_id = session.quiz_id;
    tokio::spawn(async move {
        if let Err(err) = engine.start_game(&code, session_id, quiz_id).await {
            error!(code, error = %err, "failed to start game");
        }
    });

    Ok(session.into())
}

/// End a session early: mark the row finished, tell every client, and wipe
/// the recoverable state.
pub async fn end_session(state: &SharedState, id: Uuid) -> Result<(), AppError> {
    let Some(session) = state.game_store().finish_session(id).await? else {
        return Err(AppError::NotFound(format!("session `{id}` not found")));
    };

    if let Err(err) = state.engine().end_game(&session.code).await {
        warn!(code = %session.code, error = %err, "cleanup after forced end failed");
    }
    Ok(())
}

pub async fn get_session(state: &SharedState, id: Uuid) -> Result<SessionSummary, AppError> {
    state
        .game_store()
        .find_session(id)
        .await?
        .map(Into::into)
        .ok_or_else(|| AppError::NotFound(format!("session `{id}` not found")))
}

pub async fn get_session_by_code(
    state: &SharedState,
    code: String,
) -> Result<SessionSummary, AppError> {
    state
        .game_store()
        .find_session_by_code(code.clone())
        .await?
        .map(Into::into)
        .ok_or_else(|| AppError::NotFound(format!("session `{code}` not found")))
}

pub async fn list_players(
    state: &SharedState,
    session_id: Uuid,
) -> Result<Vec<PlayerSummary>, AppError> {
    let players = state.game_store().list_players(session_id).await?;
    Ok(players.into_iter().map(Into::into).collect())
}

/// Sample a six-digit join code, zero-padded, uniform over [0, 1_000_000).
fn generate_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000))
}
