//! Pop Quiz Back binary entrypoint wiring REST, WebSocket, Redis, and Postgres layers.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pop_quiz_back::{
    config::AppConfig,
    dao::{game_store::postgres::PgGameStore, state_store::redis::RedisStateStore},
    engine::Engine,
    hub::RoomHub,
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env();

    let game_store = PgGameStore::connect(&config.database_url)
        .await
        .context("connecting to postgres")?;
    let state_store = RedisStateStore::connect(&config.redis_url)
        .await
        .context("connecting to redis")?;

    let hub = Arc::new(RoomHub::new());
    let engine = Engine::new(
        hub.clone(),
        Arc::new(state_store),
        Arc::new(game_store.clone()),
    );

    // Sessions interrupted mid-question by a restart get their timers back.
    if let Err(err) = engine.resume_active_sessions().await {
        warn!(error = %err, "could not resume in-flight sessions");
    }

    let app_state = AppState::new(hub, engine, Arc::new(game_store));
    let app = build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
