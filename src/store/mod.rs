pub mod memory;
pub mod models;
pub mod storage;

use futures::future::BoxFuture;
use tokio::sync::broadcast;

use crate::store::{
    models::{
        AnswerRow, GameStatePatch, GameStateRow, Phase, PlayerRow, SessionRow, SessionSnapshot,
    },
    storage::{JoinOutcome, StorageResult, WriteOutcome},
};

/// Codes are matched case-insensitively; the uppercase form is canonical.
pub fn fold_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Player names are logically unique per session, matched case-insensitively.
pub fn fold_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Change notification emitted by the store after a committed write. Each
/// variant carries the full row as written, never a delta, so observers can
/// apply it by wholesale replacement regardless of what they saw before.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    /// The game state row was rewritten (phase transition, deadline, scores).
    StateChanged(GameStateRow),
    /// A new player made it onto the roster.
    PlayerJoined(PlayerRow),
    /// An answer landed in the ledger.
    AnswerRecorded(AnswerRow),
    /// Cumulative team totals moved.
    TotalsChanged(SessionRow),
}

/// Abstraction over the session persistence layer.
///
/// Contract highlights, matching what the rest of the crate is built on:
/// - `update_game_state` is a conditional write: when `expect` is non-empty
///   and the current phase is not in it, nothing is written and the caller
///   gets [`WriteOutcome::Stale`] back.
/// - `insert_player` is idempotent per `(session, name)`; `insert_answer`
///   enforces at-most-one per `(session, player, question)`.
/// - Change notifications for one session are delivered in write order.
///   There is no ordering guarantee across sessions.
/// - `resume` atomically pairs a catch-up snapshot with a subscription whose
///   first event is the first write after the snapshot: nothing can fall in
///   between.
pub trait SessionStore: Send + Sync {
    /// Atomically create the session registry row and its initial game state.
    fn create_session(
        &self,
        session: SessionRow,
        state: GameStateRow,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Point-read the session registry row.
    fn find_session(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<SessionRow>>>;

    /// Point-read the game state row.
    fn game_state(
        &self,
        code: &str,
    ) -> BoxFuture<'static, StorageResult<Option<GameStateRow>>>;

    /// All players of a session, in join order.
    fn players(&self, code: &str) -> BoxFuture<'static, StorageResult<Vec<PlayerRow>>>;

    /// Answers recorded for one question of a session.
    fn answers(
        &self,
        code: &str,
        question_index: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerRow>>>;

    /// The whole answer ledger of a session, across all questions.
    fn all_answers(&self, code: &str) -> BoxFuture<'static, StorageResult<Vec<AnswerRow>>>;

    /// Add a player to the roster. Re-joining under an existing name returns
    /// the existing identity instead of creating a duplicate; a locked
    /// session refuses outright.
    fn insert_player(&self, player: PlayerRow) -> BoxFuture<'static, StorageResult<JoinOutcome>>;

    /// Append an answer to the ledger, rejecting duplicates for the same
    /// player and question.
    fn insert_answer(&self, answer: AnswerRow) -> BoxFuture<'static, StorageResult<AnswerRow>>;

    /// Conditionally patch the game state row. The write applies only while
    /// the current phase is in `expect` (an empty slice means no guard).
    fn update_game_state(
        &self,
        code: &str,
        expect: &[Phase],
        patch: GameStatePatch,
    ) -> BoxFuture<'static, StorageResult<WriteOutcome>>;

    /// Add round deltas to the cumulative team totals.
    fn add_totals(
        &self,
        code: &str,
        delta_a: u32,
        delta_b: u32,
    ) -> BoxFuture<'static, StorageResult<SessionRow>>;

    /// Catch-up snapshot of a session without subscribing.
    fn snapshot(&self, code: &str)
    -> BoxFuture<'static, StorageResult<Option<SessionSnapshot>>>;

    /// Catch-up read plus subscription as one operation: the snapshot
    /// happens-before the subscription activates.
    fn resume(
        &self,
        code: &str,
    ) -> BoxFuture<'static, StorageResult<(SessionSnapshot, broadcast::Receiver<ChangeEvent>)>>;

    /// Number of sessions currently held, for health reporting.
    fn session_count(&self) -> usize;
}
