//! Postgres backend for the durable game store.

use std::collections::HashMap;

use futures::future::BoxFuture;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::dao::game_store::GameStore;
use crate::dao::models::{
    GamePlayerRow, GameSessionRow, LeaderboardEntry, NewAnswerRecord, StoredOption,
    StoredQuestion, STATUS_ACTIVE, STATUS_FINISHED, STATUS_WAITING,
};
use crate::dao::storage::{StorageError, StorageResult};

const MAX_POOL_CONNECTIONS: u32 = 8;

#[derive(Clone)]
pub struct PgGameStore {
    pool: PgPool,
}

impl PgGameStore {
    /// Connect to Postgres with a bounded connection pool.
    pub async fn connect(url: &str) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_POOL_CONNECTIONS)
            .connect(url)
            .await
            .map_err(|source| StorageError::unavailable("connecting to postgres".into(), source))?;
        Ok(Self { pool })
    }
}

#[derive(FromRow)]
struct QuestionRow {
    id: Uuid,
    text: String,
    time_limit: i32,
    order: i32,
}

#[derive(FromRow)]
struct OptionRow {
    id: Uuid,
    question_id: Uuid,
    text: String,
    is_correct: bool,
}

#[derive(FromRow)]
struct LeaderboardRow {
    player_id: Uuid,
    name: String,
    score: i32,
}

/// Assign ranks to rows already sorted best-first.
fn rank_entries(rows: Vec<LeaderboardRow>) -> Vec<LeaderboardEntry> {
    rows.into_iter()
        .enumerate()
        .map(|(position, row)| LeaderboardEntry {
            player_id: row.player_id,
            name: row.name,
            score: row.score,
            rank: position as u32 + 1,
        })
        .collect()
}

fn query_error(context: &'static str, source: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db_error) = &source {
        if db_error.is_unique_violation() {
            return StorageError::conflict(context);
        }
    }
    StorageError::unavailable(context.into(), source)
}

impl GameStore for PgGameStore {
    fn quiz_exists(&self, quiz_id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM quizzes WHERE id = $1)")
                .bind(quiz_id)
                .fetch_one(&pool)
                .await
                .map_err(|source| query_error("checking quiz existence", source))
        })
    }

    fn load_quiz_questions(
        &self,
        quiz_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<StoredQuestion>>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let questions = sqlx::query_as::<_, QuestionRow>(
                r#"SELECT id, text, time_limit, "order" FROM questions
                   WHERE quiz_id = $1 ORDER BY "order" ASC"#,
            )
            .bind(quiz_id)
            .fetch_all(&pool)
            .await
            .map_err(|source| query_error("loading quiz questions", source))?;

            let question_ids: Vec<Uuid> = questions.iter().map(|row| row.id).collect();
            let options = sqlx::query_as::<_, OptionRow>(
                "SELECT id, question_id, text, is_correct FROM options
                 WHERE question_id = ANY($1) ORDER BY id",
            )
            .bind(&question_ids)
            .fetch_all(&pool)
            .await
            .map_err(|source| query_error("loading question options", source))?;

            let mut options_by_question: HashMap<Uuid, Vec<StoredOption>> = HashMap::new();
            for row in options {
                options_by_question
                    .entry(row.question_id)
                    .or_default()
                    .push(StoredOption {
                        id: row.id,
                        text: row.text,
                        is_correct: row.is_correct,
                    });
            }

            Ok(questions
                .into_iter()
                .map(|row| StoredQuestion {
                    id: row.id,
                    text: row.text,
                    time_limit: row.time_limit.max(0) as u32,
                    order: row.order,
                    options: options_by_question.remove(&row.id).unwrap_or_default(),
                })
                .collect())
        })
    }

    fn create_session(
        &self,
        quiz_id: Uuid,
        code: String,
    ) -> BoxFuture<'static, StorageResult<GameSessionRow>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            sqlx::query_as::<_, GameSessionRow>(
                "INSERT INTO game_sessions (id, quiz_id, code, status)
                 VALUES ($1, $2, $3, $4)
                 RETURNING id, quiz_id, code, status, started_at, ended_at, created_at",
            )
            .bind(Uuid::new_v4())
            .bind(quiz_id)
            .bind(code)
            .bind(STATUS_WAITING)
            .fetch_one(&pool)
            .await
            .map_err(|source| query_error("creating session", source))
        })
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameSessionRow>>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            sqlx::query_as::<_, GameSessionRow>(
                "SELECT id, quiz_id, code, status, started_at, ended_at, created_at
                 FROM game_sessions WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&pool)
            .await
            .map_err(|source| query_error("loading session", source))
        })
    }

    fn find_session_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionRow>>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            sqlx::query_as::<_, GameSessionRow>(
                "SELECT id, quiz_id, code, status, started_at, ended_at, created_at
                 FROM game_sessions WHERE code = $1",
            )
            .bind(code)
            .fetch_optional(&pool)
            .await
            .map_err(|source| query_error("loading session by code", source))
        })
    }

    fn find_joinable_session(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionRow>>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            sqlx::query_as::<_, GameSessionRow>(
                "SELECT id, quiz_id, code, status, started_at, ended_at, created_at
                 FROM game_sessions WHERE code = $1 AND status = $2",
            )
            .bind(code)
            .bind(STATUS_WAITING)
            .fetch_optional(&pool)
            .await
            .map_err(|source| query_error("loading joinable session", source))
        })
    }

    fn activate_session(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionRow>>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            sqlx::query_as::<_, GameSessionRow>(
                "UPDATE game_sessions SET status = $1, started_at = NOW()
                 WHERE id = $2 AND status = $3
                 RETURNING id, quiz_id, code, status, started_at, ended_at, created_at",
            )
            .bind(STATUS_ACTIVE)
            .bind(id)
            .bind(STATUS_WAITING)
            .fetch_optional(&pool)
            .await
            .map_err(|source| query_error("activating session", source))
        })
    }

    fn finish_session(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionRow>>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            sqlx::query_as::<_, GameSessionRow>(
                "UPDATE game_sessions SET status = $1, ended_at = NOW()
                 WHERE id = $2
                 RETURNING id, quiz_id, code, status, started_at, ended_at, created_at",
            )
            .bind(STATUS_FINISHED)
            .bind(id)
            .fetch_optional(&pool)
            .await
            .map_err(|source| query_error("finishing session", source))
        })
    }

    fn mark_session_finished(&self, code: String) -> BoxFuture<'static, StorageResult<()>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            sqlx::query(
                "UPDATE game_sessions SET status = $1, ended_at = NOW() WHERE code = $2",
            )
            .bind(STATUS_FINISHED)
            .bind(code)
            .execute(&pool)
            .await
            .map(|_| ())
            .map_err(|source| query_error("marking session finished", source))
        })
    }

    fn active_session_codes(&self) -> BoxFuture<'static, StorageResult<Vec<String>>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            sqlx::query_scalar::<_, String>(
                "SELECT code FROM game_sessions WHERE status = $1",
            )
            .bind(STATUS_ACTIVE)
            .fetch_all(&pool)
            .await
            .map_err(|source| query_error("listing active sessions", source))
        })
    }

    fn insert_player(
        &self,
        session_id: Uuid,
        name: String,
    ) -> BoxFuture<'static, StorageResult<GamePlayerRow>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            sqlx::query_as::<_, GamePlayerRow>(
                "INSERT INTO game_players (id, session_id, name, score)
                 VALUES ($1, $2, $3, 0)
                 RETURNING id, session_id, name, score, joined_at",
            )
            .bind(Uuid::new_v4())
            .bind(session_id)
            .bind(name)
            .fetch_one(&pool)
            .await
            .map_err(|source| query_error("name already taken in this game", source))
        })
    }

    fn list_players(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<GamePlayerRow>>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            sqlx::query_as::<_, GamePlayerRow>(
                "SELECT id, session_id, name, score, joined_at FROM game_players
                 WHERE session_id = $1 ORDER BY joined_at ASC",
            )
            .bind(session_id)
            .fetch_all(&pool)
            .await
            .map_err(|source| query_error("listing players", source))
        })
    }

    fn insert_answer(&self, answer: NewAnswerRecord) -> BoxFuture<'static, StorageResult<()>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO game_answers
                     (id, session_id, player_id, question_id, option_id,
                      answered_at, is_correct, points)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 ON CONFLICT (session_id, player_id, question_id) DO NOTHING",
            )
            .bind(Uuid::new_v4())
            .bind(answer.session_id)
            .bind(answer.player_id)
            .bind(answer.question_id)
            .bind(answer.option_id)
            .bind(answer.answered_at)
            .bind(answer.is_correct)
            .bind(answer.points)
            .execute(&pool)
            .await
            .map(|_| ())
            .map_err(|source| query_error("inserting answer record", source))
        })
    }

    fn add_score(&self, player_id: Uuid, delta: i32) -> BoxFuture<'static, StorageResult<i32>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let total = sqlx::query_scalar::<_, i32>(
                "UPDATE game_players SET score = score + $1 WHERE id = $2 RETURNING score",
            )
            .bind(delta)
            .bind(player_id)
            .fetch_optional(&pool)
            .await
            .map_err(|source| query_error("updating player score", source))?;
            Ok(total.unwrap_or(0))
        })
    }

    fn player_score(&self, player_id: Uuid) -> BoxFuture<'static, StorageResult<i32>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let score = sqlx::query_scalar::<_, i32>(
                "SELECT score FROM game_players WHERE id = $1",
            )
            .bind(player_id)
            .fetch_optional(&pool)
            .await
            .map_err(|source| query_error("loading player score", source))?;
            Ok(score.unwrap_or(0))
        })
    }

    fn leaderboard(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardEntry>>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            // joined_at breaks score ties deterministically.
            let rows = sqlx::query_as::<_, LeaderboardRow>(
                "SELECT id AS player_id, name, score FROM game_players
                 WHERE session_id = $1 ORDER BY score DESC, joined_at ASC",
            )
            .bind(session_id)
            .fetch_all(&pool)
            .await
            .map_err(|source| query_error("loading leaderboard", source))?;
            Ok(rank_entries(rows))
        })
    }
}
