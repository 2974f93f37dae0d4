use thiserror::Error;

use crate::store::models::Phase;

/// Events the phase driver can apply to a session's state machine. Each one
/// maps to exactly one conditional write: the store only commits the target
/// phase while the current phase is still in [`DriverEvent::expected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverEvent {
    /// Broadcast operator starts the game from the lobby.
    StartGame,
    /// Countdown (or intermission breather) finished; a question goes live.
    StartRound,
    /// Round closed (deadline hit or everyone answered); scoring begins.
    BeginCalculating,
    /// Scoring finished; results go on display.
    PublishResults,
    /// Results pause over, more questions remain.
    BeginIntermission,
    /// Intermission delay elapsed; count down into the next question.
    NextCountdown,
    /// Results pause over and the catalog is exhausted; hand off to the
    /// terminal minigame.
    Finish,
}

impl DriverEvent {
    /// Phases this event may legally fire from. Doubles as the guard set of
    /// the conditional write that performs the transition.
    pub fn expected(self) -> &'static [Phase] {
        match self {
            DriverEvent::StartGame => &[Phase::Waiting],
            DriverEvent::StartRound => &[Phase::Countdown, Phase::Intermission],
            DriverEvent::BeginCalculating => &[Phase::Quiz],
            DriverEvent::PublishResults => &[Phase::Calculating],
            DriverEvent::BeginIntermission => &[Phase::Results],
            DriverEvent::NextCountdown => &[Phase::Intermission],
            DriverEvent::Finish => &[Phase::Results],
        }
    }

    /// Phase the event lands in when its guard matches.
    pub fn target(self) -> Phase {
        match self {
            DriverEvent::StartGame => Phase::Countdown,
            DriverEvent::StartRound => Phase::Quiz,
            DriverEvent::BeginCalculating => Phase::Calculating,
            DriverEvent::PublishResults => Phase::Results,
            DriverEvent::BeginIntermission => Phase::Intermission,
            DriverEvent::NextCountdown => Phase::Countdown,
            DriverEvent::Finish => Phase::Pong,
        }
    }
}

/// Error returned when an event cannot be applied from the current phase.
///
/// Inside the driver this is not an error condition at all: a racing writer
/// that lost its guard simply skips the transition. The type exists for the
/// pure state-machine API and its tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// Phase the machine was in when the event arrived.
    pub from: Phase,
    /// The event that does not apply there.
    pub event: DriverEvent,
}

/// Compute the phase an event leads to from `from`, or report why it cannot.
pub fn transition(from: Phase, event: DriverEvent) -> Result<Phase, InvalidTransition> {
    if event.expected().contains(&from) {
        Ok(event.target())
    } else {
        Err(InvalidTransition { from, event })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_happy_path_through_one_round() {
        let mut phase = Phase::Waiting;
        for event in [
            DriverEvent::StartGame,
            DriverEvent::StartRound,
            DriverEvent::BeginCalculating,
            DriverEvent::PublishResults,
            DriverEvent::BeginIntermission,
            DriverEvent::NextCountdown,
            DriverEvent::StartRound,
        ] {
            phase = transition(phase, event).unwrap();
        }
        assert_eq!(phase, Phase::Quiz);
    }

    #[test]
    fn results_forks_to_intermission_or_pong() {
        assert_eq!(
            transition(Phase::Results, DriverEvent::BeginIntermission).unwrap(),
            Phase::Intermission
        );
        assert_eq!(
            transition(Phase::Results, DriverEvent::Finish).unwrap(),
            Phase::Pong
        );
    }

    #[test]
    fn round_can_start_straight_from_intermission() {
        assert_eq!(
            transition(Phase::Intermission, DriverEvent::StartRound).unwrap(),
            Phase::Quiz
        );
    }

    #[test]
    fn duplicate_conclude_is_rejected_by_the_guard() {
        let after = transition(Phase::Quiz, DriverEvent::BeginCalculating).unwrap();
        assert_eq!(after, Phase::Calculating);

        let err = transition(after, DriverEvent::BeginCalculating).unwrap_err();
        assert_eq!(err.from, Phase::Calculating);
        assert_eq!(err.event, DriverEvent::BeginCalculating);
    }

    #[test]
    fn pong_is_terminal() {
        for event in [
            DriverEvent::StartGame,
            DriverEvent::StartRound,
            DriverEvent::BeginCalculating,
            DriverEvent::PublishResults,
            DriverEvent::BeginIntermission,
            DriverEvent::NextCountdown,
            DriverEvent::Finish,
        ] {
            assert!(transition(Phase::Pong, event).is_err());
        }
    }

    #[test]
    fn guards_and_targets_agree_with_the_transition_fn() {
        for event in [
            DriverEvent::StartGame,
            DriverEvent::StartRound,
            DriverEvent::BeginCalculating,
            DriverEvent::PublishResults,
            DriverEvent::BeginIntermission,
            DriverEvent::NextCountdown,
            DriverEvent::Finish,
        ] {
            for from in event.expected() {
                assert_eq!(transition(*from, event).unwrap(), event.target());
            }
        }
    }
}
