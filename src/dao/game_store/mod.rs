pub mod postgres;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{
    GamePlayerRow, GameSessionRow, LeaderboardEntry, NewAnswerRecord, StoredQuestion,
};
use crate::dao::storage::StorageResult;

/// Abstraction over the durable store for quizzes, sessions, players, and answers.
///
/// Quizzes are read-only inputs; the engine writes answer records, score
/// updates, and session lifecycle fields.
pub trait GameStore: Send + Sync {
    fn quiz_exists(&self, quiz_id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Load a quiz's questions with their options, ordered for play.
    fn load_quiz_questions(
        &self,
        quiz_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<StoredQuestion>>>;

    /// Insert a session row with the given join code; conflicts on the code
    /// surface as [`StorageError::Conflict`](crate::dao::storage::StorageError).
    fn create_session(
        &self,
        quiz_id: Uuid,
        code: String,
    ) -> BoxFuture<'static, StorageResult<GameSessionRow>>;
    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameSessionRow>>>;
    fn find_session_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionRow>>>;
    /// Find a session that is still accepting players (status `waiting`).
    fn find_joinable_session(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionRow>>>;
    /// Flip a `waiting` session to `active`; `None` when it was not waiting.
    fn activate_session(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionRow>>>;
    /// Mark a session finished by id, returning the updated row.
    fn finish_session(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionRow>>>;
    /// Mark a session finished by join code (game-over path).
    fn mark_session_finished(&self, code: String) -> BoxFuture<'static, StorageResult<()>>;
    /// Join codes of all sessions currently marked `active`.
    fn active_session_codes(&self) -> BoxFuture<'static, StorageResult<Vec<String>>>;

    /// Register a player; duplicate names within a session surface as conflicts.
    fn insert_player(
        &self,
        session_id: Uuid,
        name: String,
    ) -> BoxFuture<'static, StorageResult<GamePlayerRow>>;
    fn list_players(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<GamePlayerRow>>>;

    /// Insert an answer record, ignoring duplicates of
    /// `(session_id, player_id, question_id)`.
    fn insert_answer(&self, answer: NewAnswerRecord) -> BoxFuture<'static, StorageResult<()>>;
    /// Add `delta` to a player's cumulative score, returning the new total.
    fn add_score(&self, player_id: Uuid, delta: i32) -> BoxFuture<'static, StorageResult<i32>>;
    fn player_score(&self, player_id: Uuid) -> BoxFuture<'static, StorageResult<i32>>;
    /// Ranked standings for a session, best score first.
    fn leaderboard(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardEntry>>>;
}
