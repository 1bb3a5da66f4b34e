/// Durable Postgres persistence for quizzes, sessions, players, and answers.
pub mod game_store;
/// Database and cache model definitions.
pub mod models;
/// Redis-backed session state, question cache, and answer capture.
pub mod state_store;
/// Storage abstraction layer shared by both stores.
pub mod storage;
