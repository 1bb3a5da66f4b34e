//! WebSocket wire protocol: one JSON envelope per text frame, shaped as
//! `{"type": <string>, "payload": ...}`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::{LeaderboardEntry, StoredQuestion};

/// Reason attached to the `game_over` message when the host ends the session.
pub const GAME_OVER_SESSION_ENDED: &str = "session_ended";

/// Messages accepted from connected clients.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A player locks in an option for the current question.
    AnswerSubmitted {
        question_id: String,
        option_id: String,
    },
    /// The host advances past the leaderboard.
    #[schema(value_type = Option<Object>)]
    NextQuestion(Option<serde_json::Value>),
    /// Application-level keepalive; answered with a `pong` payload.
    #[schema(value_type = Option<Object>)]
    Ping(Option<serde_json::Value>),
    #[serde(other)]
    Unknown,
}

/// Messages pushed to connected clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    PlayerJoined(PlayerPresence),
    PlayerLeft(PlayerPresence),
    GameStarted { session_id: Uuid },
    Question(QuestionPayload),
    AnswerReveal(RevealPayload),
    Leaderboard(LeaderboardPayload),
    Podium(LeaderboardPayload),
    GameOver { reason: String },
    Ping(String),
}

impl ServerMessage {
    /// Reply to an application-level ping.
    pub fn pong() -> Self {
        ServerMessage::Ping("pong".to_string())
    }

    /// Forced end of session announced to the whole room.
    pub fn session_ended() -> Self {
        ServerMessage::GameOver {
            reason: GAME_OVER_SESSION_ENDED.to_string(),
        }
    }
}

/// A player entering or leaving a room.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerPresence {
    pub player_id: Uuid,
    pub name: String,
}

/// A question broadcast with its position in the quiz.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionPayload {
    pub question_index: usize,
    pub total_questions: usize,
    pub question: QuestionBody,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionBody {
    pub id: Uuid,
    pub text: String,
    pub time_limit: u32,
    pub options: Vec<OptionView>,
}

/// An answer option as shown to a client.
///
/// `is_correct` is only ever populated on the host variant; the player
/// variant omits the field entirely so correctness cannot leak.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OptionView {
    pub id: Uuid,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

impl QuestionPayload {
    /// Build the player-facing variant, with correctness stripped.
    pub fn for_players(question: &StoredQuestion, index: usize, total: usize) -> Self {
        Self::build(question, index, total, false)
    }

    /// Build the host-facing variant, with `is_correct` on every option.
    pub fn for_host(question: &StoredQuestion, index: usize, total: usize) -> Self {
        Self::build(question, index, total, true)
    }

    fn build(question: &StoredQuestion, index: usize, total: usize, reveal: bool) -> Self {
        let options = question
            .options
            .iter()
            .map(|option| OptionView {
                id: option.id,
                text: option.text.clone(),
                is_correct: reveal.then_some(option.is_correct),
            })
            .collect();

        Self {
            question_index: index,
            total_questions: total,
            question: QuestionBody {
                id: question.id,
                text: question.text.clone(),
                time_limit: question.time_limit,
                options,
            },
        }
    }
}

/// End-of-question disclosure: the correct option plus per-player scoring.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RevealPayload {
    /// `None` when the question has no correct option (data-integrity error).
    pub correct_option_id: Option<Uuid>,
    #[schema(value_type = Object)]
    pub scores: HashMap<Uuid, RevealScore>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RevealScore {
    pub is_correct: bool,
    pub points: i32,
    pub total_score: i32,
}

/// Ranked standings used by both `leaderboard` and `podium` messages.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaderboardPayload {
    pub entries: Vec<LeaderboardEntry>,
}
