use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Pop Quiz Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::session::create_session,
        crate::routes::session::join_session,
        crate::routes::session::get_session,
        crate::routes::session::get_session_by_code,
        crate::routes::session::list_players,
        crate::routes::session::start_session,
        crate::routes::session::end_session,
        crate::routes::websocket::host_ws,
        crate::routes::websocket::player_ws,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::CreateSessionRequest,
            crate::dto::session::SessionCreated,
            crate::dto::session::JoinSessionRequest,
            crate::dto::session::JoinedSession,
            crate::dto::session::SessionSummary,
            crate::dto::session::PlayerSummary,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
            crate::dto::ws::PlayerPresence,
            crate::dto::ws::QuestionPayload,
            crate::dto::ws::QuestionBody,
            crate::dto::ws::OptionView,
            crate::dto::ws::RevealPayload,
            crate::dto::ws::RevealScore,
            crate::dto::ws::LeaderboardPayload,
            crate::dao::models::LeaderboardEntry,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sessions", description = "Session lifecycle operations"),
        (name = "ws", description = "WebSocket endpoints for hosts and players"),
    )
)]
pub struct ApiDoc;
