//! Central application state shared by routes, services, and the engine.

use std::sync::Arc;

use crate::dao::game_store::GameStore;
use crate::engine::Engine;
use crate::hub::RoomHub;

pub type SharedState = Arc<AppState>;

/// Handles shared across the whole application.
pub struct AppState {
    hub: Arc<RoomHub>,
    engine: Engine,
    store: Arc<dyn GameStore>,
}

impl AppState {
    /// Bundle the shared handles into an [`Arc`] so they can be cloned cheaply.
    pub fn new(hub: Arc<RoomHub>, engine: Engine, store: Arc<dyn GameStore>) -> SharedState {
        Arc::new(Self { hub, engine, store })
    }

    /// Fan-out hub tracking connected clients per session.
    pub fn hub(&self) -> &RoomHub {
        &self.hub
    }

    /// Game engine driving every active session.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Durable store for quizzes, sessions, players, and answers.
    pub fn game_store(&self) -> &dyn GameStore {
        self.store.as_ref()
    }
}
