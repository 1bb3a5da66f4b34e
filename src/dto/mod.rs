use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Health check data structures.
pub mod health;
/// Session lifecycle API data structures.
pub mod session;
/// Request validation utilities.
pub mod validation;
/// WebSocket message data structures.
pub mod ws;

/// Formats an [`OffsetDateTime`] as an RFC3339 timestamp string.
fn format_timestamp(timestamp: OffsetDateTime) -> String {
    timestamp
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
