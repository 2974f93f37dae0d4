use thiserror::Error;

use crate::store::models::{GameStateRow, PlayerRow};

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying engine.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// No session exists under the given code.
    #[error("session `{code}` not found")]
    SessionNotFound {
        /// The (normalized) code that missed.
        code: String,
    },
    /// A session with this code already exists.
    #[error("session code `{code}` is already taken")]
    CodeTaken {
        /// The colliding code.
        code: String,
    },
    /// The session stopped accepting new players.
    #[error("session `{code}` no longer accepts joins")]
    JoinsLocked {
        /// Code of the locked session.
        code: String,
    },
    /// The answer ledger already holds a row for this player and question.
    #[error("player `{player}` already answered question {question_index} of `{code}`")]
    DuplicateAnswer {
        /// Session code.
        code: String,
        /// Submitting player.
        player: String,
        /// Question the duplicate was aimed at.
        question_index: usize,
    },
}

/// Outcome of a phase-guarded conditional write to the game state row.
///
/// A stale guard is not an error: the racing writer that lost simply skips
/// its side effects. Both variants carry the row as it stands after the
/// attempt so callers can report the authoritative phase either way.
#[derive(Debug, Clone)]
pub enum WriteOutcome {
    /// The guard matched and the patch was applied.
    Applied(GameStateRow),
    /// The guard no longer matched; nothing was written.
    Stale(GameStateRow),
}

impl WriteOutcome {
    /// Whether the write went through.
    pub fn applied(&self) -> bool {
        matches!(self, WriteOutcome::Applied(_))
    }

    /// The game state row after the attempt, applied or not.
    pub fn state(&self) -> &GameStateRow {
        match self {
            WriteOutcome::Applied(row) | WriteOutcome::Stale(row) => row,
        }
    }

    /// Consume the outcome, keeping the row.
    pub fn into_state(self) -> GameStateRow {
        match self {
            WriteOutcome::Applied(row) | WriteOutcome::Stale(row) => row,
        }
    }
}

/// Outcome of an idempotent roster insert.
#[derive(Debug, Clone)]
pub enum JoinOutcome {
    /// A fresh roster row was created.
    Joined(PlayerRow),
    /// The name was already on the roster; the existing identity is returned.
    Rejoined(PlayerRow),
}

impl JoinOutcome {
    /// The definitive roster row for the player, new or pre-existing.
    pub fn player(&self) -> &PlayerRow {
        match self {
            JoinOutcome::Joined(row) | JoinOutcome::Rejoined(row) => row,
        }
    }

    /// Whether this was a repeat join resolving to an existing identity.
    pub fn rejoined(&self) -> bool {
        matches!(self, JoinOutcome::Rejoined(_))
    }
}
