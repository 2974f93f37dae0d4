//! The phase driver: the only code that writes the game state row. Every
//! operation is a conditional write guarded on the phase(s) it may fire
//! from, so a racing duplicate trigger degrades to a recorded no-op instead
//! of a double transition.

use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::{
    dto::game::ActionResponse,
    error::ServiceError,
    services::{scoring, sync_service},
    state::{
        SharedState,
        machine::{DriverEvent, transition},
    },
    store::{
        SessionStore, fold_code,
        models::{GameStatePatch, Phase},
        storage::WriteOutcome,
    },
};

/// Floor for watcher naps so a deadline in the past still yields once.
const MIN_NAP: std::time::Duration = std::time::Duration::from_millis(25);

/// Start the game: lobby closes, every client plays the countdown.
pub async fn start_game(state: &SharedState, code: &str) -> Result<ActionResponse, ServiceError> {
    let patch = GameStatePatch {
        join_locked: Some(true),
        ..GameStatePatch::default()
    };
    let outcome = guarded(state, code, DriverEvent::StartGame, patch).await?;
    if outcome.applied() {
        info!(code = %fold_code(code), "game started; joins locked");
    }
    Ok(outcome.into())
}

/// Put the current question live with a fresh deadline. Fired by whichever
/// client finishes its countdown first; the guard makes the duplicates
/// no-ops. Also arms the server-side round watcher.
pub async fn start_round(state: &SharedState, code: &str) -> Result<ActionResponse, ServiceError> {
    let deadline = OffsetDateTime::now_utc() + state.config().round_duration();
    let patch = GameStatePatch {
        question_deadline: Some(Some(deadline)),
        correct_answer: Some(None),
        round_score_a: Some(0),
        round_score_b: Some(0),
        ..GameStatePatch::default()
    };

    let outcome = guarded(state, code, DriverEvent::StartRound, patch).await?;
    if let WriteOutcome::Applied(ref row) = outcome {
        info!(
            code = %row.session_code,
            question_index = row.current_question_index,
            "round started"
        );
        spawn_round_watcher(
            SharedState::clone(state),
            row.session_code.clone(),
            deadline,
            row.current_question_index,
        );
    }
    Ok(outcome.into())
}

/// Close the round and publish its results. Safe to invoke any number of
/// times from any number of triggers (deadline watcher, all-answered check,
/// an explicit driver call): only the invocation that wins the
/// quiz→calculating write performs the scoring and totals update.
pub async fn conclude_round(
    state: &SharedState,
    code: &str,
) -> Result<ActionResponse, ServiceError> {
    let store = state.store();

    let won = store
        .update_game_state(
            code,
            DriverEvent::BeginCalculating.expected(),
            GameStatePatch {
                phase: Some(Phase::Calculating),
                question_deadline: Some(None),
                ..GameStatePatch::default()
            },
        )
        .await?;
    let WriteOutcome::Applied(calculating) = won else {
        debug!(code = %fold_code(code), "conclude skipped: round already closed");
        return Ok(won.into());
    };

    // From here on this invocation is the only writer: nothing else moves a
    // session out of `calculating`.
    let question_index = calculating.current_question_index;
    let answers = store.answers(code, question_index).await?;
    let tally = scoring::tally_round(&answers);

    let correct = state
        .catalog()
        .question(question_index)
        .map(|q| q.correct.clone());
    if correct.is_none() {
        warn!(
            code = %calculating.session_code,
            question_index,
            "no catalog entry for concluded round"
        );
    }

    store.add_totals(code, tally.team_a, tally.team_b).await?;

    let published = store
        .update_game_state(
            code,
            DriverEvent::PublishResults.expected(),
            GameStatePatch {
                phase: Some(Phase::Results),
                correct_answer: Some(correct),
                round_score_a: Some(tally.team_a),
                round_score_b: Some(tally.team_b),
                ..GameStatePatch::default()
            },
        )
        .await?;

    info!(
        code = %calculating.session_code,
        question_index,
        answers = answers.len(),
        team_a = tally.team_a,
        team_b = tally.team_b,
        "round concluded"
    );
    Ok(published.into())
}

/// Leave the results screen: either breathe through an intermission into the
/// next question's countdown, or hand over to the terminal minigame when the
/// catalog is exhausted.
pub async fn advance(state: &SharedState, code: &str) -> Result<ActionResponse, ServiceError> {
    let store = state.store();
    let current = store
        .game_state(code)
        .await?
        .ok_or_else(|| ServiceError::SessionNotFound(fold_code(code)))?;

    if state.catalog().is_last(current.current_question_index) {
        let outcome = guarded(state, code, DriverEvent::Finish, GameStatePatch::default()).await?;
        if outcome.applied() {
            info!(code = %fold_code(code), "catalog exhausted; entering minigame");
        }
        return Ok(outcome.into());
    }

    let next_index = current.current_question_index + 1;
    let outcome = guarded(
        state,
        code,
        DriverEvent::BeginIntermission,
        GameStatePatch::default(),
    )
    .await?;
    if outcome.applied() {
        schedule_next_countdown(SharedState::clone(state), fold_code(code), next_index);
    }
    Ok(outcome.into())
}

/// Stop accepting new players. Used once before the first countdown; safe to
/// repeat.
pub async fn lock_joins(state: &SharedState, code: &str) -> Result<ActionResponse, ServiceError> {
    let patch = GameStatePatch {
        join_locked: Some(true),
        ..GameStatePatch::default()
    };
    let outcome = state.store().update_game_state(code, &[], patch).await?;
    Ok(outcome.into())
}

/// Perform one event's conditional write: target phase plus side-effect patch.
async fn guarded(
    state: &SharedState,
    code: &str,
    event: DriverEvent,
    mut patch: GameStatePatch,
) -> Result<WriteOutcome, ServiceError> {
    patch.phase = Some(event.target());
    let outcome = state
        .store()
        .update_game_state(code, event.expected(), patch)
        .await?;
    if !outcome.applied() {
        if let Err(invalid) = transition(outcome.state().phase, event) {
            debug!(code = %fold_code(code), %invalid, "transition skipped");
        }
    }
    Ok(outcome)
}

/// Watch a live round and conclude it when either trigger fires: the
/// deadline passes, or every rostered player has answered. Both funnel into
/// the same [`conclude_round`] guard, so racing an external caller is fine.
fn spawn_round_watcher(
    state: SharedState,
    code: String,
    deadline: OffsetDateTime,
    question_index: usize,
) {
    tokio::spawn(async move {
        match sync_service::attach(state.store(), &code).await {
            Ok(subscription) => {
                watch_round(&state, &code, question_index, subscription).await;
            }
            Err(err) => {
                // No change feed; the deadline alone still closes the round.
                warn!(%code, error = %err, "round watcher could not subscribe");
                sleep_until(deadline).await;
                finish_round(&state, &code, question_index).await;
            }
        }
    });
}

async fn watch_round(
    state: &SharedState,
    code: &str,
    question_index: usize,
    mut subscription: sync_service::SessionSubscription,
) {
    loop {
        let view = subscription.view();
        if view.state.phase != Phase::Quiz || view.state.current_question_index != question_index {
            debug!(%code, question_index, "round moved on; watcher retires");
            return;
        }
        if view.all_answered() {
            debug!(%code, question_index, "everyone answered; concluding early");
            break;
        }
        let Some(remaining) = view.time_remaining(OffsetDateTime::now_utc()) else {
            break;
        };
        if remaining.is_zero() {
            break;
        }

        // Nap in bounded slices, recomputing from the stored deadline on
        // every wake, so a suspended runtime cannot drift past the real
        // instant.
        let nap = remaining.min(time::Duration::seconds(1));
        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::try_from(nap).unwrap_or(MIN_NAP)) => {}
            changed = subscription.changed() => {
                if changed.is_err() {
                    // Feed died; fall back to pure deadline timing.
                    if let Some(deadline) = view.state.question_deadline {
                        sleep_until(deadline).await;
                    }
                    break;
                }
            }
        }
    }

    finish_round(state, code, question_index).await;
}

async fn finish_round(state: &SharedState, code: &str, question_index: usize) {
    match conclude_round(state, code).await {
        Ok(response) if response.applied => {
            debug!(%code, question_index, "round watcher concluded the round");
        }
        Ok(_) => {
            debug!(%code, question_index, "round was already concluded");
        }
        Err(err) => {
            warn!(%code, question_index, error = %err, "round watcher failed");
        }
    }
}

async fn sleep_until(deadline: OffsetDateTime) {
    loop {
        let remaining = deadline - OffsetDateTime::now_utc();
        if remaining <= time::Duration::ZERO {
            return;
        }
        let nap = remaining.min(time::Duration::seconds(1));
        tokio::time::sleep(std::time::Duration::try_from(nap).unwrap_or(MIN_NAP)).await;
    }
}

/// After the intermission breather, count down into the next question.
fn schedule_next_countdown(state: SharedState, code: String, next_index: usize) {
    let delay = state.config().intermission_delay();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        let patch = GameStatePatch {
            current_question_index: Some(next_index),
            correct_answer: Some(None),
            ..GameStatePatch::default()
        };
        match guarded(&state, &code, DriverEvent::NextCountdown, patch).await {
            Ok(outcome) if outcome.applied() => {
                debug!(%code, next_index, "intermission over; counting down");
            }
            Ok(_) => {
                debug!(%code, next_index, "intermission left before the countdown fired");
            }
            Err(err) => {
                warn!(%code, next_index, error = %err, "failed to schedule next countdown");
            }
        }
    });
}
