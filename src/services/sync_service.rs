//! In-process client synchronizer: the catch-up-then-subscribe sequence,
//! the view reducer, and a guard that releases the subscription on every
//! exit path. Remote clients get the same contract over SSE; this module is
//! for code living in the backend process (and for tests exercising the
//! protocol end to end).

use std::sync::Arc;

use tokio::sync::{broadcast::error::RecvError, watch};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::{
    error::ServiceError,
    state::view::SessionView,
    store::{SessionStore, fold_code},
};

/// Live handle on a session: a continuously reduced [`SessionView`] fed by
/// the store's change stream. Dropping the handle cancels the feeding task
/// and releases the subscription.
pub struct SessionSubscription {
    receiver: watch::Receiver<SessionView>,
    _guard: SubscriptionGuard,
}

impl SessionSubscription {
    /// The current view.
    pub fn view(&self) -> SessionView {
        self.receiver.borrow().clone()
    }

    /// Wait until the view changes. Errors only when the feeding task is
    /// gone for good.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.receiver.changed().await
    }
}

/// Aborts the feeding task when the subscription handle goes away, whatever
/// the exit path was.
struct SubscriptionGuard {
    task: JoinHandle<()>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Attach to a session: one catch-up read, then apply every change
/// notification through the reducer.
///
/// The store's `resume` makes the read happen-before the subscription
/// activates, so no transition can fall between them. If the change stream
/// ever lags (notifications were dropped), the synchronizer re-runs the
/// catch-up read before applying anything else, because missed notifications
/// are never replayed.
pub async fn attach(
    store: Arc<dyn SessionStore>,
    code: &str,
) -> Result<SessionSubscription, ServiceError> {
    let (snapshot, mut changes) = store.resume(code).await?;
    let (tx, receiver) = watch::channel(SessionView::from_snapshot(snapshot));
    let code = fold_code(code);

    let task = tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(change) => {
                    let next = tx.borrow().clone().apply(change);
                    if tx.send(next).is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(%code, missed, "change stream lagged; re-running catch-up");
                    match store.resume(&code).await {
                        Ok((snapshot, fresh)) => {
                            changes = fresh;
                            if tx.send(SessionView::from_snapshot(snapshot)).is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            warn!(%code, error = %err, "catch-up after lag failed");
                            break;
                        }
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    Ok(SessionSubscription {
        receiver,
        _guard: SubscriptionGuard { task },
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{
        catalog::{Question, QuestionCatalog},
        config::AppConfig,
        dto::{answer::SubmitAnswerRequest, session::JoinRequest},
        services::{answer_service, driver_service, session_service},
        state::{AppState, SharedState},
        store::{
            SessionStore,
            models::{GameStateRow, Phase, SessionRow, Team},
        },
    };

    use super::*;

    const CODE: &str = "AB3XK";

    async fn seeded_state() -> SharedState {
        let catalog = QuestionCatalog::from_questions(vec![Question {
            prompt: "only".into(),
            options: vec!["A".into(), "B".into()],
            correct: "B".into(),
        }]);
        let state = AppState::new(AppConfig::default(), catalog);
        state
            .store()
            .create_session(
                SessionRow {
                    code: CODE.into(),
                    team_a_name: "Blue".into(),
                    team_b_name: "Red".into(),
                    team_a_total: 0,
                    team_b_total: 0,
                },
                GameStateRow::initial(CODE.into()),
            )
            .await
            .unwrap();
        state
    }

    async fn wait_for_phase(subscription: &mut SessionSubscription, phase: Phase) -> SessionView {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let view = subscription.view();
                if view.state.phase == phase {
                    return view;
                }
                subscription.changed().await.expect("feed died");
            }
        })
        .await
        .expect("timed out waiting for phase")
    }

    #[tokio::test]
    async fn view_follows_the_whole_round() {
        let state = seeded_state().await;
        let mut subscription = attach(state.store(), CODE).await.unwrap();
        assert_eq!(subscription.view().state.phase, Phase::Waiting);

        session_service::join_session(
            &state,
            CODE,
            JoinRequest {
                name: "Ana".into(),
                team: Team::A,
            },
        )
        .await
        .unwrap();

        driver_service::start_game(&state, CODE).await.unwrap();
        let view = wait_for_phase(&mut subscription, Phase::Countdown).await;
        assert!(view.state.join_locked);
        assert_eq!(view.players.len(), 1);

        driver_service::start_round(&state, CODE).await.unwrap();
        let view = wait_for_phase(&mut subscription, Phase::Quiz).await;
        assert!(view.state.question_deadline.is_some());
        assert!(!view.all_answered());

        // Ana is the whole roster, so her answer concludes the round.
        answer_service::submit_answer(
            &state,
            CODE,
            SubmitAnswerRequest {
                name: "Ana".into(),
                choice: "B".into(),
                question_index: 0,
                time_remaining_ms: 8_000,
            },
        )
        .await
        .unwrap();

        let view = wait_for_phase(&mut subscription, Phase::Results).await;
        assert_eq!(view.state.round_score_a, 90);
        assert_eq!(view.state.correct_answer.as_deref(), Some("B"));
        assert_eq!(view.session.team_a_total, 90);
    }

    #[tokio::test]
    async fn late_attacher_sees_what_the_observer_saw() {
        let state = seeded_state().await;

        // Observer attached before anything happened.
        let mut observer = attach(state.store(), CODE).await.unwrap();

        session_service::join_session(
            &state,
            CODE,
            JoinRequest {
                name: "Ana".into(),
                team: Team::A,
            },
        )
        .await
        .unwrap();
        driver_service::start_game(&state, CODE).await.unwrap();
        driver_service::start_round(&state, CODE).await.unwrap();
        answer_service::submit_answer(
            &state,
            CODE,
            SubmitAnswerRequest {
                name: "Ana".into(),
                choice: "B".into(),
                question_index: 0,
                time_remaining_ms: 8_000,
            },
        )
        .await
        .unwrap();
        let observed = wait_for_phase(&mut observer, Phase::Results).await;

        // A client attaching only now, having seen none of the transitions,
        // renders the same final scores.
        let late = attach(state.store(), CODE).await.unwrap();
        assert_eq!(late.view(), observed);
    }
}
