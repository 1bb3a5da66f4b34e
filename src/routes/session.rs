use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    dto::session::{
        CreateSessionRequest, JoinedSession, JoinSessionRequest, PlayerSummary, SessionCreated,
        SessionSummary,
    },
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Routes handling the session lifecycle around a quiz run.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/join", post(join_session))
        .route("/sessions/code/{code}", get(get_session_by_code))
        .route("/sessions/{id}", get(get_session).delete(end_session))
        .route("/sessions/{id}/start", post(start_session))
        .route("/sessions/{id}/players", get(list_players))
}

/// Open a session for an existing quiz and hand out its join code.
#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    tag = "sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = SessionCreated),
        (status = 404, description = "Quiz not found")
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionCreated>), AppError> {
    let created = session_service::create_session(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Join a waiting session as a player.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/join",
    tag = "sessions",
    request_body = JoinSessionRequest,
    responses(
        (status = 200, description = "Joined the lobby", body = JoinedSession),
        (status = 404, description = "No waiting session with this code"),
        (status = 409, description = "Name already taken in this game")
    )
)]
pub async fn join_session(
    State(state): State<SharedState>,
    Json(payload): Json<JoinSessionRequest>,
) -> Result<Json<JoinedSession>, AppError> {
    let joined = session_service::join_session(&state, payload).await?;
    Ok(Json(joined))
}

/// Fetch a session by id.
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session found", body = SessionSummary),
        (status = 404, description = "Session not found")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, AppError> {
    Ok(Json(session_service::get_session(&state, id).await?))
}

/// Fetch a session by its join code.
#[utoipa::path(
    get,
    path = "/api/v1/sessions/code/{code}",
    tag = "sessions",
    params(("code" = String, Path, description = "Six-digit join code")),
    responses(
        (status = 200, description = "Session found", body = SessionSummary),
        (status = 404, description = "Session not found")
    )
)]
pub async fn get_session_by_code(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<SessionSummary>, AppError> {
    Ok(Json(
        session_service::get_session_by_code(&state, code).await?,
    ))
}

/// List the players registered in a session, in join order.
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}/players",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses((status = 200, description = "Roster", body = [PlayerSummary]))
)]
pub async fn list_players(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PlayerSummary>>, AppError> {
    Ok(Json(session_service::list_players(&state, id).await?))
}

/// Start the quiz for a waiting session.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/start",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Game starting", body = SessionSummary),
        (status = 404, description = "Session not found or already started")
    )
)]
pub async fn start_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, AppError> {
    Ok(Json(session_service::start_session(&state, id).await?))
}

/// End a session early, notifying every connected client.
#[utoipa::path(
    delete,
    path = "/api/v1/sessions/{id}",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 204, description = "Session ended"),
        (status = 404, description = "Session not found")
    )
)]
pub async fn end_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    session_service::end_session(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
