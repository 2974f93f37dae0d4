use std::collections::BTreeSet;

use time::{Duration, OffsetDateTime};

use crate::store::{
    ChangeEvent, fold_name,
    models::{GameStateRow, PlayerRow, SessionRow, SessionSnapshot},
};

/// Everything a client renders from: the session rows plus the set of
/// players who already answered the current question.
///
/// The view is maintained exclusively through [`SessionView::apply`], an
/// explicit reducer that replaces row state wholesale with the notification's
/// payload. Notifications are full snapshots of a row, so applying one never
/// depends on what the view held before; a client that attaches late and a
/// client that watched every transition converge on the same view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    /// Session registry row (team names + cumulative totals).
    pub session: SessionRow,
    /// Authoritative game state row.
    pub state: GameStateRow,
    /// Roster in join order.
    pub players: Vec<PlayerRow>,
    /// Folded names of players who answered the current question.
    pub answered: BTreeSet<String>,
}

impl SessionView {
    /// Build the initial view from a catch-up snapshot.
    pub fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        let answered = snapshot
            .answers
            .iter()
            .filter(|a| a.question_index == snapshot.state.current_question_index)
            .map(|a| fold_name(&a.player_name))
            .collect();
        Self {
            session: snapshot.session,
            state: snapshot.state,
            players: snapshot.players,
            answered,
        }
    }

    /// Fold one change notification into the view, returning the new view.
    pub fn apply(mut self, change: ChangeEvent) -> Self {
        match change {
            ChangeEvent::StateChanged(row) => {
                if row.current_question_index != self.state.current_question_index {
                    self.answered.clear();
                }
                self.state = row;
            }
            ChangeEvent::PlayerJoined(row) => {
                match self.players.iter_mut().find(|p| p.id == row.id) {
                    Some(existing) => *existing = row,
                    None => self.players.push(row),
                }
            }
            ChangeEvent::AnswerRecorded(row) => {
                if row.question_index == self.state.current_question_index {
                    self.answered.insert(fold_name(&row.player_name));
                }
            }
            ChangeEvent::TotalsChanged(row) => {
                self.session = row;
            }
        }
        self
    }

    /// Time left on the round clock, recomputed from the stored deadline so a
    /// client that was suspended for an arbitrary interval lands on the right
    /// value as soon as it wakes. `None` outside the quiz phase; floors at
    /// zero once the deadline passed.
    pub fn time_remaining(&self, now: OffsetDateTime) -> Option<Duration> {
        let deadline = self.state.question_deadline?;
        Some((deadline - now).max(Duration::ZERO))
    }

    /// Whether every rostered player has answered the current question.
    /// Always false for an empty roster.
    pub fn all_answered(&self) -> bool {
        !self.players.is_empty()
            && self
                .players
                .iter()
                .all(|p| self.answered.contains(&fold_name(&p.name)))
    }
}
