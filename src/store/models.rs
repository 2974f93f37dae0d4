use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Discrete phase of a session's game state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Lobby: players may join, nothing is running yet.
    Waiting,
    /// Pre-round countdown animation is playing on every client.
    Countdown,
    /// A question is live and accepting answers until the deadline.
    Quiz,
    /// The round closed; scores are being computed.
    Calculating,
    /// Round results (correct answer + scores) are on display.
    Results,
    /// Short breather between one round's results and the next countdown.
    Intermission,
    /// Terminal minigame phase; the quiz flow does not resume from here.
    Pong,
}

/// Team a player is bound to for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    /// First team (display name comes from the session row).
    A,
    /// Second team.
    B,
}

/// Session registry row: created once per game, immutable except for the
/// cumulative totals, which only ever grow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct SessionRow {
    /// Short human-typed join code, stored uppercase, matched case-insensitively.
    pub code: String,
    /// Display name for team A.
    pub team_a_name: String,
    /// Display name for team B.
    pub team_b_name: String,
    /// Cumulative score of team A across all concluded rounds.
    pub team_a_total: u32,
    /// Cumulative score of team B across all concluded rounds.
    pub team_b_total: u32,
}

/// The single authoritative mutable record per session. Every client derives
/// its entire view of "what to render" from this row plus the read-only
/// question catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct GameStateRow {
    /// Join code of the owning session.
    pub session_code: String,
    /// Current phase of the state machine.
    pub phase: Phase,
    /// Index into the question catalog for the active (or upcoming) round.
    pub current_question_index: usize,
    /// Absolute deadline of the live round. Non-null iff `phase == Quiz`;
    /// clients recompute time remaining from `deadline - now` on every tick.
    #[serde(with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>)]
    pub question_deadline: Option<OffsetDateTime>,
    /// Revealed correct answer, set when the round concludes and cleared
    /// before the next question goes live.
    pub correct_answer: Option<String>,
    /// Team A's score for the most recently concluded round.
    pub round_score_a: u32,
    /// Team B's score for the most recently concluded round.
    pub round_score_b: u32,
    /// Once true, new players are turned away.
    pub join_locked: bool,
    /// Optimistic concurrency token, bumped on every write.
    pub version: u64,
}

impl GameStateRow {
    /// Fresh state for a newly created session.
    pub fn initial(session_code: String) -> Self {
        Self {
            session_code,
            phase: Phase::Waiting,
            current_question_index: 0,
            question_deadline: None,
            correct_answer: None,
            round_score_a: 0,
            round_score_b: 0,
            join_locked: false,
            version: 0,
        }
    }

    /// Whether the row honours the deadline/phase coupling: a deadline is
    /// present exactly when a quiz round is live.
    pub fn deadline_matches_phase(&self) -> bool {
        self.question_deadline.is_some() == (self.phase == Phase::Quiz)
    }

    /// Apply a patch in place, bumping the version token.
    pub fn apply(&mut self, patch: &GameStatePatch) {
        if let Some(phase) = patch.phase {
            self.phase = phase;
        }
        if let Some(index) = patch.current_question_index {
            self.current_question_index = index;
        }
        if let Some(deadline) = patch.question_deadline {
            self.question_deadline = deadline;
        }
        if let Some(ref correct) = patch.correct_answer {
            self.correct_answer = correct.clone();
        }
        if let Some(score) = patch.round_score_a {
            self.round_score_a = score;
        }
        if let Some(score) = patch.round_score_b {
            self.round_score_b = score;
        }
        if let Some(locked) = patch.join_locked {
            self.join_locked = locked;
        }
        self.version += 1;
    }
}

/// Partial update applied to a [`GameStateRow`] by a conditional write.
/// Outer `None` leaves a field untouched; the nullable fields use a second
/// `Option` level to distinguish "set to null" from "leave alone".
#[derive(Debug, Clone, Default)]
pub struct GameStatePatch {
    /// New phase, if the transition's guard still matches.
    pub phase: Option<Phase>,
    /// New question index.
    pub current_question_index: Option<usize>,
    /// New deadline (`Some(None)` clears it).
    pub question_deadline: Option<Option<OffsetDateTime>>,
    /// New revealed answer (`Some(None)` clears it).
    pub correct_answer: Option<Option<String>>,
    /// New round score for team A.
    pub round_score_a: Option<u32>,
    /// New round score for team B.
    pub round_score_b: Option<u32>,
    /// New join lock flag.
    pub join_locked: Option<bool>,
}

/// Roster entry for a participant, created by the joining client and never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct PlayerRow {
    /// Stable identifier handed back to the joining device.
    pub id: Uuid,
    /// Join code of the owning session.
    pub session_code: String,
    /// Display name; logically unique per session (case-insensitive).
    pub name: String,
    /// Team the player is bound to for the whole session.
    pub team: Team,
    /// When the player first joined.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String)]
    pub joined_at: OffsetDateTime,
}

/// Answer ledger entry: at most one per `(session, player, question)`,
/// append-only, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct AnswerRow {
    /// Join code of the owning session.
    pub session_code: String,
    /// Name of the submitting player.
    pub player_name: String,
    /// Team the player answered for.
    pub team: Team,
    /// Question the answer belongs to.
    pub question_index: usize,
    /// The option the player picked.
    pub choice: String,
    /// Whether the pick matched the catalog's correct option.
    pub is_correct: bool,
    /// Milliseconds left on the round clock when the player answered.
    pub time_remaining_ms: u64,
    /// Points awarded for this answer.
    pub score: u32,
}

/// Catch-up snapshot of everything a client needs to render a session:
/// registry row, game state, roster, and the current question's answers.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct SessionSnapshot {
    /// Session registry row (team names + cumulative totals).
    pub session: SessionRow,
    /// Authoritative game state row.
    pub state: GameStateRow,
    /// Players who joined, in join order.
    pub players: Vec<PlayerRow>,
    /// Answers already recorded for the current question.
    pub answers: Vec<AnswerRow>,
}
