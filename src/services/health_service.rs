use tracing::warn;

use crate::dto::health::HealthResponse;
use crate::state::SharedState;

/// Respond with a static health payload while logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    if let Err(err) = state.game_store().active_session_codes().await {
        warn!(error = %err, "durable store health probe failed");
    }
    HealthResponse::ok()
}
