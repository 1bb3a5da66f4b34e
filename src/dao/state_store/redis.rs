//! Redis backend for the session-state store.

use std::collections::HashMap;

use futures::future::BoxFuture;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::dao::models::{PlayerAnswer, SessionState, StoredQuestion};
use crate::dao::state_store::StateStore;
use crate::dao::storage::{StorageError, StorageResult};

/// Safety-net expiry applied to every session key.
const SESSION_KEY_TTL_SECS: u64 = 24 * 60 * 60;

fn state_key(code: &str) -> String {
    format!("game:{code}:state")
}

fn questions_key(code: &str) -> String {
    format!("game:{code}:questions")
}

fn answers_key(code: &str, index: usize) -> String {
    format!("game:{code}:q{index}:answers")
}

#[derive(Clone)]
pub struct RedisStateStore {
    connection: ConnectionManager,
}

impl RedisStateStore {
    /// Connect to Redis and hand out a managed connection that reconnects on failure.
    pub async fn connect(url: &str) -> StorageResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|source| StorageError::unavailable("invalid redis url".into(), source))?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(|source| StorageError::unavailable("connecting to redis".into(), source))?;
        Ok(Self { connection })
    }

    fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }
}

fn encode<T: serde::Serialize>(what: &'static str, value: &T) -> StorageResult<String> {
    serde_json::to_string(value)
        .map_err(|source| StorageError::unavailable(format!("serialize {what}"), source))
}

fn decode<T: serde::de::DeserializeOwned>(what: &'static str, raw: &str) -> StorageResult<T> {
    serde_json::from_str(raw)
        .map_err(|source| StorageError::unavailable(format!("deserialize {what}"), source))
}

fn command_error(key: &str, source: redis::RedisError) -> StorageError {
    StorageError::unavailable(format!("redis command on {key}"), source)
}

impl StateStore for RedisStateStore {
    fn save_state(&self, state: SessionState) -> BoxFuture<'static, StorageResult<()>> {
        let mut connection = self.connection();
        Box::pin(async move {
            let key = state_key(&state.session_code);
            let payload = encode("session state", &state)?;
            connection
                .set_ex::<_, _, ()>(&key, payload, SESSION_KEY_TTL_SECS)
                .await
                .map_err(|source| command_error(&key, source))
        })
    }

    fn load_state(&self, code: String) -> BoxFuture<'static, StorageResult<Option<SessionState>>> {
        let mut connection = self.connection();
        Box::pin(async move {
            let key = state_key(&code);
            let raw: Option<String> = connection
                .get(&key)
                .await
                .map_err(|source| command_error(&key, source))?;
            raw.as_deref()
                .map(|raw| decode("session state", raw))
                .transpose()
        })
    }

    fn delete_state(&self, code: String) -> BoxFuture<'static, StorageResult<()>> {
        let mut connection = self.connection();
        Box::pin(async move {
            let key = state_key(&code);
            connection
                .del::<_, ()>(&key)
                .await
                .map_err(|source| command_error(&key, source))
        })
    }

    fn save_questions(
        &self,
        code: String,
        questions: Vec<StoredQuestion>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let mut connection = self.connection();
        Box::pin(async move {
            let key = questions_key(&code);
            let payload = encode("question list", &questions)?;
            connection
                .set_ex::<_, _, ()>(&key, payload, SESSION_KEY_TTL_SECS)
                .await
                .map_err(|source| command_error(&key, source))
        })
    }

    fn load_questions(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<Vec<StoredQuestion>>>> {
        let mut connection = self.connection();
        Box::pin(async move {
            let key = questions_key(&code);
            let raw: Option<String> = connection
                .get(&key)
                .await
                .map_err(|source| command_error(&key, source))?;
            raw.as_deref()
                .map(|raw| decode("question list", raw))
                .transpose()
        })
    }

    fn delete_questions(&self, code: String) -> BoxFuture<'static, StorageResult<()>> {
        let mut connection = self.connection();
        Box::pin(async move {
            let key = questions_key(&code);
            connection
                .del::<_, ()>(&key)
                .await
                .map_err(|source| command_error(&key, source))
        })
    }

    fn record_answer(
        &self,
        code: String,
        index: usize,
        player_id: Uuid,
        answer: PlayerAnswer,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let mut connection = self.connection();
        Box::pin(async move {
            let key = answers_key(&code, index);
            let payload = encode("player answer", &answer)?;
            // HSETNX keeps the first submission authoritative.
            let stored: bool = connection
                .hset_nx(&key, player_id.to_string(), payload)
                .await
                .map_err(|source| command_error(&key, source))?;
            connection
                .expire::<_, ()>(&key, SESSION_KEY_TTL_SECS as i64)
                .await
                .map_err(|source| command_error(&key, source))?;
            Ok(stored)
        })
    }

    fn answers(
        &self,
        code: String,
        index: usize,
    ) -> BoxFuture<'static, StorageResult<HashMap<Uuid, PlayerAnswer>>> {
        let mut connection = self.connection();
        Box::pin(async move {
            let key = answers_key(&code, index);
            let raw: HashMap<String, String> = connection
                .hgetall(&key)
                .await
                .map_err(|source| command_error(&key, source))?;

            let mut answers = HashMap::with_capacity(raw.len());
            for (player, payload) in raw {
                let player_id = Uuid::parse_str(&player).map_err(|source| {
                    StorageError::unavailable(format!("invalid player id in {key}"), source)
                })?;
                answers.insert(player_id, decode("player answer", &payload)?);
            }
            Ok(answers)
        })
    }

    fn count_answers(
        &self,
        code: String,
        index: usize,
    ) -> BoxFuture<'static, StorageResult<usize>> {
        let mut connection = self.connection();
        Box::pin(async move {
            let key = answers_key(&code, index);
            connection
                .hlen(&key)
                .await
                .map_err(|source| command_error(&key, source))
        })
    }

    fn delete_answers(
        &self,
        code: String,
        index: usize,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let mut connection = self.connection();
        Box::pin(async move {
            let key = answers_key(&code, index);
            connection
                .del::<_, ()>(&key)
                .await
                .map_err(|source| command_error(&key, source))
        })
    }
}
