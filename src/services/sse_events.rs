use serde::Serialize;
use tracing::warn;

use crate::{
    dto::sse::ServerEvent,
    store::{ChangeEvent, models::SessionSnapshot},
};

/// First event on every stream: the full catch-up snapshot.
pub const EVENT_SNAPSHOT: &str = "snapshot";
/// The game state row was rewritten.
pub const EVENT_STATE_CHANGED: &str = "state.changed";
/// A player joined the roster.
pub const EVENT_PLAYER_JOINED: &str = "player.joined";
/// An answer landed in the ledger.
pub const EVENT_ANSWER_RECORDED: &str = "answer.recorded";
/// Cumulative team totals moved.
pub const EVENT_TOTALS_CHANGED: &str = "session.totals";

/// Wrap a catch-up snapshot for the wire.
pub fn snapshot_event(snapshot: &SessionSnapshot) -> Option<ServerEvent> {
    make_event(EVENT_SNAPSHOT, snapshot)
}

/// Convert a store change notification into its named wire event. Payloads
/// are always the full row, so subscribers can apply them by replacement.
pub fn change_event(change: &ChangeEvent) -> Option<ServerEvent> {
    match change {
        ChangeEvent::StateChanged(row) => make_event(EVENT_STATE_CHANGED, row),
        ChangeEvent::PlayerJoined(row) => make_event(EVENT_PLAYER_JOINED, row),
        ChangeEvent::AnswerRecorded(row) => make_event(EVENT_ANSWER_RECORDED, row),
        ChangeEvent::TotalsChanged(row) => make_event(EVENT_TOTALS_CHANGED, row),
    }
}

fn make_event(name: &str, payload: &impl Serialize) -> Option<ServerEvent> {
    match ServerEvent::json(Some(name.to_string()), payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event = name, error = %err, "failed to serialize SSE payload");
            None
        }
    }
}
