pub mod redis;

use std::collections::HashMap;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{PlayerAnswer, SessionState, StoredQuestion};
use crate::dao::storage::StorageResult;

/// Abstraction over the key-value store holding recoverable session state.
///
/// Values are scoped to a session code and expire with a safety-net TTL;
/// the engine is the only writer.
pub trait StateStore: Send + Sync {
    fn save_state(&self, state: SessionState) -> BoxFuture<'static, StorageResult<()>>;
    fn load_state(&self, code: String) -> BoxFuture<'static, StorageResult<Option<SessionState>>>;
    fn delete_state(&self, code: String) -> BoxFuture<'static, StorageResult<()>>;

    fn save_questions(
        &self,
        code: String,
        questions: Vec<StoredQuestion>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn load_questions(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<Vec<StoredQuestion>>>>;
    fn delete_questions(&self, code: String) -> BoxFuture<'static, StorageResult<()>>;

    /// Conditionally record a player's answer for the question at `index`.
    ///
    /// Returns `true` when the slot was empty and the answer was stored;
    /// `false` when the player had already answered (first answer wins).
    fn record_answer(
        &self,
        code: String,
        index: usize,
        player_id: Uuid,
        answer: PlayerAnswer,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    fn answers(
        &self,
        code: String,
        index: usize,
    ) -> BoxFuture<'static, StorageResult<HashMap<Uuid, PlayerAnswer>>>;
    fn count_answers(&self, code: String, index: usize)
        -> BoxFuture<'static, StorageResult<usize>>;
    fn delete_answers(&self, code: String, index: usize)
        -> BoxFuture<'static, StorageResult<()>>;
}
