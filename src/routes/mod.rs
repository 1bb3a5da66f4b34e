use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod session;
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = Router::new().nest(
        "/api/v1",
        health::router()
            .merge(session::router())
            .merge(websocket::router()),
    );

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
