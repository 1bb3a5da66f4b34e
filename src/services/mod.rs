/// WebSocket connection lifecycle: pumps, keepalive, and dispatch.
pub mod connection;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Session lifecycle operations backing the HTTP API.
pub mod session_service;
