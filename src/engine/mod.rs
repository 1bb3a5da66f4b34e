//! Per-session game loop: question broadcast, answer capture, reveal,
//! leaderboard, and recovery of in-flight sessions.
//!
//! The engine owns every write to the session-state store. Transitions are
//! guarded by re-reading the phase on entry, so concurrent paths (question
//! timer vs. the last answer arriving) cannot double-apply a reveal: the
//! first to flip the phase does the work, the loser bails out.

pub mod scoring;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::{oneshot, Mutex};
use tokio::time::sleep;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::dao::game_store::GameStore;
use crate::dao::models::{
    GamePhase, NewAnswerRecord, PlayerAnswer, SessionState, StoredQuestion,
};
use crate::dao::state_store::StateStore;
use crate::dao::storage::StorageError;
use crate::dto::ws::{
    LeaderboardPayload, QuestionPayload, RevealPayload, RevealScore, ServerMessage,
};
use crate::hub::{ClientRole, RoomHub};

use self::scoring::calculate_points;

/// Delay before the first question and between a reveal and its
/// leaderboard, giving clients time to render the transition.
const PHASE_TRANSITION_DELAY: Duration = Duration::from_secs(3);

/// Errors surfaced by engine entry points.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no active game state for session {0}")]
    SessionNotFound(String),
    #[error("operation requires phase {required:?} but session is in {actual:?}")]
    IllegalPhase {
        required: GamePhase,
        actual: GamePhase,
    },
    #[error("submitted question id does not match the active question")]
    QuestionMismatch,
    #[error("quiz {0} has no questions")]
    EmptyQuiz(Uuid),
    #[error("cached questions missing for session {0}")]
    CachedQuestionsMissing(String),
    #[error("question index {index} out of range for session {code}")]
    MissingQuestion { code: String, index: usize },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Orchestrates the game loop for every active session.
#[derive(Clone)]
pub struct Engine {
    hub: Arc<RoomHub>,
    states: Arc<dyn StateStore>,
    store: Arc<dyn GameStore>,
    /// Active question timers keyed by session code; dropping or firing a
    /// sender cancels the timer task.
    timers: Arc<Mutex<HashMap<String, oneshot::Sender<()>>>>,
}

impl Engine {
    pub fn new(hub: Arc<RoomHub>, states: Arc<dyn StateStore>, store: Arc<dyn GameStore>) -> Self {
        Self {
            hub,
            states,
            store,
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Load a quiz, cache its questions, and schedule the first broadcast.
    ///
    /// Returns as soon as the session state is written; the first question
    /// goes out after a short delay so clients can navigate from the lobby
    /// to the game view.
    pub async fn start_game(
        &self,
        code: &str,
        session_id: Uuid,
        quiz_id: Uuid,
    ) -> Result<(), EngineError> {
        let questions = self.store.load_quiz_questions(quiz_id).await?;
        if questions.is_empty() {
            return Err(EngineError::EmptyQuiz(quiz_id));
        }
        let total_questions = questions.len();

        self.states
            .save_questions(code.to_string(), questions)
            .await?;
        self.states
            .save_state(SessionState {
                session_code: code.to_string(),
                session_id,
                current_index: 0,
                total_questions,
                phase: GamePhase::Starting,
                question_started: None,
            })
            .await?;

        info!(code, total_questions, "session started");

        let engine = self.clone();
        let code = code.to_string();
        tokio::spawn(async move {
            sleep(PHASE_TRANSITION_DELAY).await;
            if let Err(err) = engine.broadcast_question(&code, 0).await {
                error!(code, error = %err, "failed to broadcast first question");
            }
        });

        Ok(())
    }

    /// Record a player's answer; reveals early once every connected player
    /// has answered.
    ///
    /// A repeat submission for the same question is silently accepted and
    /// ignored: the first answer stays authoritative.
    pub async fn submit_answer(
        &self,
        code: &str,
        player_id: Uuid,
        question_id: Uuid,
        option_id: Uuid,
    ) -> Result<(), EngineError> {
        let state = self.require_state(code).await?;
        if state.phase != GamePhase::QuestionOpen {
            return Err(EngineError::IllegalPhase {
                required: GamePhase::QuestionOpen,
                actual: state.phase,
            });
        }

        let questions = self.require_questions(code).await?;
        let question = question_at(code, &questions, state.current_index)?;
        if question.id != question_id {
            return Err(EngineError::QuestionMismatch);
        }

        let recorded = self
            .states
            .record_answer(
                code.to_string(),
                state.current_index,
                player_id,
                PlayerAnswer {
                    option_id,
                    answered_at: OffsetDateTime::now_utc(),
                },
            )
            .await?;
        if !recorded {
            return Ok(());
        }

        // Advisory check: if everyone connected right now has answered,
        // end the question without waiting for the timer.
        let player_count = self.hub.room_player_count(code).await;
        let answered_count = self
            .states
            .count_answers(code.to_string(), state.current_index)
            .await?;
        if player_count > 0 && answered_count >= player_count {
            self.cancel_timer(code).await;
            let engine = self.clone();
            let code = code.to_string();
            tokio::spawn(async move {
                if let Err(err) = engine.trigger_reveal(&code).await {
                    error!(code, error = %err, "failed to reveal after all answers");
                }
            });
        }

        Ok(())
    }

    /// Advance from the leaderboard to the next question, or to the podium
    /// when the quiz is exhausted. Host-triggered.
    pub async fn next_question(&self, code: &str) -> Result<(), EngineError> {
        let state = self.require_state(code).await?;
        if state.phase != GamePhase::Leaderboard {
            return Err(EngineError::IllegalPhase {
                required: GamePhase::Leaderboard,
                actual: state.phase,
            });
        }

        let next = state.current_index + 1;
        if next >= state.total_questions {
            self.trigger_game_over(code).await
        } else {
            self.broadcast_question(code, next).await
        }
    }

    /// Forcefully end a session: announce `game_over`, cancel the timer, and
    /// delete every state-store key. Idempotent, safe after a natural finish.
    pub async fn end_game(&self, code: &str) -> Result<(), EngineError> {
        self.cancel_timer(code).await;
        self.hub
            .broadcast(code, &ServerMessage::session_ended())
            .await;

        if let Some(state) = self.states.load_state(code.to_string()).await? {
            for index in 0..state.total_questions {
                self.states.delete_answers(code.to_string(), index).await?;
            }
        }
        self.states.delete_state(code.to_string()).await?;
        self.states.delete_questions(code.to_string()).await?;

        info!(code, "session ended and state cleaned up");
        Ok(())
    }

    /// Current session state, if the session has been started.
    pub async fn current_state(&self, code: &str) -> Result<Option<SessionState>, EngineError> {
        Ok(self.states.load_state(code.to_string()).await?)
    }

    /// Role-appropriate payload for the question currently open, used to
    /// re-sync late-joining connections. `None` outside `question_open`.
    pub async fn current_question(
        &self,
        code: &str,
        role: ClientRole,
    ) -> Result<Option<ServerMessage>, EngineError> {
        let Some(state) = self.states.load_state(code.to_string()).await? else {
            return Ok(None);
        };
        if state.phase != GamePhase::QuestionOpen {
            return Ok(None);
        }

        let questions = self.require_questions(code).await?;
        let question = question_at(code, &questions, state.current_index)?;
        let payload = match role {
            ClientRole::Host => {
                QuestionPayload::for_host(question, state.current_index, state.total_questions)
            }
            ClientRole::Player => {
                QuestionPayload::for_players(question, state.current_index, state.total_questions)
            }
        };
        Ok(Some(ServerMessage::Question(payload)))
    }

    /// Re-arm question timers for sessions that were mid-question when the
    /// process last stopped.
    pub async fn resume_active_sessions(&self) -> Result<(), EngineError> {
        for code in self.store.active_session_codes().await? {
            let Some(state) = self.states.load_state(code.clone()).await? else {
                continue;
            };
            if state.phase != GamePhase::QuestionOpen {
                continue;
            }

            let questions = match self.require_questions(&code).await {
                Ok(questions) => questions,
                Err(err) => {
                    warn!(code, error = %err, "cannot resume session");
                    continue;
                }
            };
            let Ok(question) = question_at(&code, &questions, state.current_index) else {
                continue;
            };

            let elapsed = state
                .question_started
                .map(|started| (OffsetDateTime::now_utc() - started).as_seconds_f64())
                .unwrap_or_default();
            let remaining = (f64::from(question.time_limit) - elapsed).max(0.0);
            info!(
                code,
                index = state.current_index,
                remaining,
                "re-arming question timer after restart"
            );
            self.start_question_timer(
                &code,
                state.current_index,
                Duration::from_secs_f64(remaining),
            )
            .await;
        }
        Ok(())
    }

    /// Open the question at `index`: persist the phase change, fan out the
    /// role-specific payloads, and start the answer timer.
    async fn broadcast_question(&self, code: &str, index: usize) -> Result<(), EngineError> {
        let questions = self.require_questions(code).await?;
        let question = question_at(code, &questions, index)?;

        let mut state = self.require_state(code).await?;
        state.current_index = index;
        state.phase = GamePhase::QuestionOpen;
        state.question_started = Some(OffsetDateTime::now_utc());
        let total_questions = state.total_questions;
        self.states.save_state(state).await?;

        self.hub
            .broadcast_to_players(
                code,
                &ServerMessage::Question(QuestionPayload::for_players(
                    question,
                    index,
                    total_questions,
                )),
            )
            .await;
        self.hub
            .broadcast_to_host(
                code,
                &ServerMessage::Question(QuestionPayload::for_host(
                    question,
                    index,
                    total_questions,
                )),
            )
            .await;

        self.start_question_timer(
            code,
            index,
            Duration::from_secs(u64::from(question.time_limit)),
        )
        .await;
        Ok(())
    }

    /// Install the answer timer for a question, replacing (and thereby
    /// cancelling) any previous timer for the session.
    async fn start_question_timer(&self, code: &str, index: usize, limit: Duration) {
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        {
            let mut timers = self.timers.lock().await;
            timers.insert(code.to_string(), cancel_tx);
        }

        let engine = self.clone();
        let code = code.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = sleep(limit) => {
                    // Re-read state: a cancellation that lost the race with
                    // expiry must not produce a stale reveal.
                    match engine.states.load_state(code.clone()).await {
                        Ok(Some(state))
                            if state.current_index == index
                                && state.phase == GamePhase::QuestionOpen =>
                        {
                            if let Err(err) = engine.trigger_reveal(&code).await {
                                error!(code, error = %err, "timer-driven reveal failed");
                            }
                        }
                        Ok(_) => {}
                        Err(err) => {
                            warn!(code, error = %err, "timer could not re-read session state");
                        }
                    }
                }
                _ = cancel_rx => {}
            }
        });
    }

    /// Cancel the active question timer for a session, if any.
    async fn cancel_timer(&self, code: &str) {
        let mut timers = self.timers.lock().await;
        if let Some(cancel) = timers.remove(code) {
            let _ = cancel.send(());
        }
    }

    /// Close the current question: disclose the correct option, score every
    /// captured answer, persist the records, and schedule the leaderboard.
    async fn trigger_reveal(&self, code: &str) -> Result<(), EngineError> {
        let mut state = self.require_state(code).await?;
        if state.phase != GamePhase::QuestionOpen {
            // Another path got here first.
            return Ok(());
        }
        state.phase = GamePhase::AnswerReveal;
        self.states.save_state(state.clone()).await?;

        let questions = self.require_questions(code).await?;
        let question = question_at(code, &questions, state.current_index)?;
        let correct_option_id = question.correct_option_id();

        let answers = self
            .states
            .answers(code.to_string(), state.current_index)
            .await?;

        let mut scores = HashMap::with_capacity(answers.len());
        for (player_id, answer) in answers {
            let is_correct = correct_option_id == Some(answer.option_id);
            let points = if is_correct {
                let elapsed = state
                    .question_started
                    .map(|started| (answer.answered_at - started).as_seconds_f64())
                    .unwrap_or_default();
                calculate_points(elapsed, question.time_limit)
            } else {
                0
            };

            // One bad row must not stall the reveal for everyone else.
            if let Err(err) = self
                .store
                .insert_answer(NewAnswerRecord {
                    session_id: state.session_id,
                    player_id,
                    question_id: question.id,
                    option_id: answer.option_id,
                    answered_at: answer.answered_at,
                    is_correct,
                    points,
                })
                .await
            {
                warn!(code, %player_id, error = %err, "failed to persist answer record");
            }

            let total_score = if points > 0 {
                match self.store.add_score(player_id, points).await {
                    Ok(total) => total,
                    Err(err) => {
                        warn!(code, %player_id, error = %err, "failed to update player score");
                        points
                    }
                }
            } else {
                match self.store.player_score(player_id).await {
                    Ok(total) => total,
                    Err(err) => {
                        warn!(code, %player_id, error = %err, "failed to read player score");
                        0
                    }
                }
            };

            scores.insert(
                player_id,
                RevealScore {
                    is_correct,
                    points,
                    total_score,
                },
            );
        }

        self.hub
            .broadcast(
                code,
                &ServerMessage::AnswerReveal(RevealPayload {
                    correct_option_id,
                    scores,
                }),
            )
            .await;

        let engine = self.clone();
        let code = code.to_string();
        tokio::spawn(async move {
            sleep(PHASE_TRANSITION_DELAY).await;
            if let Err(err) = engine.broadcast_leaderboard(&code).await {
                error!(code, error = %err, "failed to broadcast leaderboard");
            }
        });

        Ok(())
    }

    /// Publish the cumulative standings between questions.
    async fn broadcast_leaderboard(&self, code: &str) -> Result<(), EngineError> {
        let mut state = self.require_state(code).await?;
        state.phase = GamePhase::Leaderboard;
        let session_id = state.session_id;
        self.states.save_state(state).await?;

        let entries = self.store.leaderboard(session_id).await?;
        self.hub
            .broadcast(code, &ServerMessage::Leaderboard(LeaderboardPayload { entries }))
            .await;
        Ok(())
    }

    /// Finish the quiz: mark the session row and publish the podium.
    ///
    /// State-store keys are left behind for the operator-controlled grace
    /// period; `end_game` removes them.
    async fn trigger_game_over(&self, code: &str) -> Result<(), EngineError> {
        let mut state = self.require_state(code).await?;
        state.phase = GamePhase::GameOver;
        let session_id = state.session_id;
        self.states.save_state(state).await?;

        if let Err(err) = self.store.mark_session_finished(code.to_string()).await {
            warn!(code, error = %err, "failed to mark session finished");
        }

        let entries = self.store.leaderboard(session_id).await?;
        self.hub
            .broadcast(code, &ServerMessage::Podium(LeaderboardPayload { entries }))
            .await;

        info!(code, "quiz complete, podium broadcast");
        Ok(())
    }

    async fn require_state(&self, code: &str) -> Result<SessionState, EngineError> {
        self.states
            .load_state(code.to_string())
            .await?
            .ok_or_else(|| EngineError::SessionNotFound(code.to_string()))
    }

    async fn require_questions(&self, code: &str) -> Result<Vec<StoredQuestion>, EngineError> {
        self.states
            .load_questions(code.to_string())
            .await?
            .ok_or_else(|| EngineError::CachedQuestionsMissing(code.to_string()))
    }
}

fn question_at<'a>(
    code: &str,
    questions: &'a [StoredQuestion],
    index: usize,
) -> Result<&'a StoredQuestion, EngineError> {
    questions.get(index).ok_or_else(|| EngineError::MissingQuestion {
        code: code.to_string(),
        index,
    })
}
