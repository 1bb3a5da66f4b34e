//! Session lifecycle API data structures.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::dao::models::{GamePlayerRow, GameSessionRow};
use crate::dto::{format_timestamp, validation::validate_session_code};

/// Longest accepted player display name.
const MAX_PLAYER_NAME_LENGTH: usize = 50;

/// Payload used to open a new session for an existing quiz.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// Identifier of the quiz to play.
    pub quiz_id: Uuid,
}

/// Join code handed back after session creation.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionCreated {
    pub session_id: Uuid,
    pub code: String,
}

/// Payload a player submits to enter a lobby.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinSessionRequest {
    /// Six-digit join code shown by the host.
    pub code: String,
    /// Display name, unique within the session.
    pub name: String,
}

impl Validate for JoinSessionRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_session_code(&self.code) {
            errors.add("code", e);
        }

        if self.name.trim().is_empty() || self.name.len() > MAX_PLAYER_NAME_LENGTH {
            let mut err = ValidationError::new("name_length");
            err.message = Some(
                format!("Name must be 1 to {MAX_PLAYER_NAME_LENGTH} characters").into(),
            );
            errors.add("name", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Identity issued to a player that joined a lobby.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinedSession {
    pub player_id: Uuid,
    pub session_id: Uuid,
    pub code: String,
    pub name: String,
}

/// Session row as exposed over the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionSummary {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub code: String,
    pub status: String,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub created_at: String,
}

impl From<GameSessionRow> for SessionSummary {
    fn from(row: GameSessionRow) -> Self {
        Self {
            id: row.id,
            quiz_id: row.quiz_id,
            code: row.code,
            status: row.status,
            started_at: row.started_at.map(format_timestamp),
            ended_at: row.ended_at.map(format_timestamp),
            created_at: format_timestamp(row.created_at),
        }
    }
}

/// Player roster entry as exposed over the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerSummary {
    pub id: Uuid,
    pub session_id: Uuid,
    pub name: String,
    pub score: i32,
    pub joined_at: String,
}

impl From<GamePlayerRow> for PlayerSummary {
    fn from(row: GamePlayerRow) -> Self {
        Self {
            id: row.id,
            session_id: row.session_id,
            name: row.name,
            score: row.score,
            joined_at: format_timestamp(row.joined_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_request_rejects_bad_codes_and_names() {
        let valid = JoinSessionRequest {
            code: "031337".into(),
            name: "ada".into(),
        };
        assert!(valid.validate().is_ok());

        let bad_code = JoinSessionRequest {
            code: "31337".into(),
            name: "ada".into(),
        };
        assert!(bad_code.validate().is_err());

        let blank_name = JoinSessionRequest {
            code: "031337".into(),
            name: String::new(),
        };
        assert!(blank_name.validate().is_err());
    }
}
