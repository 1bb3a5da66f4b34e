//! Model definitions for the durable store and the session-state cache.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status values stored in `game_sessions.status`.
pub const STATUS_WAITING: &str = "waiting";
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_FINISHED: &str = "finished";

/// Phase of a running session's state machine.
///
/// Phases only ever advance in declaration order; no path moves a
/// session backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Session started, clients are navigating to the game view.
    Starting,
    /// A question is live and accepting answers.
    QuestionOpen,
    /// The correct answer and per-player scores are being shown.
    AnswerReveal,
    /// Cumulative standings between questions.
    Leaderboard,
    /// Final podium; the session is over.
    GameOver,
}

/// Per-session state persisted in the state store for recovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_code: String,
    pub session_id: Uuid,
    pub current_index: usize,
    pub total_questions: usize,
    pub phase: GamePhase,
    /// Set when `phase` most recently became [`GamePhase::QuestionOpen`].
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub question_started: Option<OffsetDateTime>,
}

/// Full question (including correct answers) cached in the state store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredQuestion {
    pub id: Uuid,
    pub text: String,
    /// Answer window in seconds; strictly positive for well-formed quizzes.
    pub time_limit: u32,
    pub order: i32,
    pub options: Vec<StoredOption>,
}

impl StoredQuestion {
    /// Identifier of the correct option, if the question has one.
    pub fn correct_option_id(&self) -> Option<Uuid> {
        self.options
            .iter()
            .find(|option| option.is_correct)
            .map(|option| option.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredOption {
    pub id: Uuid,
    pub text: String,
    pub is_correct: bool,
}

/// A single player's captured answer for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerAnswer {
    pub option_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub answered_at: OffsetDateTime,
}

/// Row of the `game_sessions` table.
#[derive(Debug, Clone, FromRow)]
pub struct GameSessionRow {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub code: String,
    pub status: String,
    pub started_at: Option<OffsetDateTime>,
    pub ended_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

/// Row of the `game_players` table.
#[derive(Debug, Clone, FromRow)]
pub struct GamePlayerRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub name: String,
    pub score: i32,
    pub joined_at: OffsetDateTime,
}

/// Answer record inserted into `game_answers` at reveal time.
#[derive(Debug, Clone)]
pub struct NewAnswerRecord {
    pub session_id: Uuid,
    pub player_id: Uuid,
    pub question_id: Uuid,
    pub option_id: Uuid,
    pub answered_at: OffsetDateTime,
    pub is_correct: bool,
    pub points: i32,
}

/// One ranked row of the leaderboard and podium broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    pub player_id: Uuid,
    pub name: String,
    pub score: i32,
    pub rank: u32,
}
