use tracing::debug;

use crate::{
    dto::answer::{AnswerAck, SubmitAnswerRequest},
    error::ServiceError,
    services::{driver_service, scoring},
    state::SharedState,
    store::{
        SessionStore, fold_code, fold_name,
        models::{AnswerRow, Phase},
    },
};

/// Record a player's answer for the live question.
///
/// The backend recomputes correctness and score from the catalog rather than
/// trusting the device, and clamps the reported time remaining to the round
/// length. When this submission completes the roster, the round is concluded
/// early through the same idempotent guard the deadline watcher uses.
pub async fn submit_answer(
    state: &SharedState,
    code: &str,
    request: SubmitAnswerRequest,
) -> Result<AnswerAck, ServiceError> {
    let store = state.store();
    let game_state = store
        .game_state(code)
        .await?
        .ok_or_else(|| ServiceError::SessionNotFound(fold_code(code)))?;

    if game_state.phase != Phase::Quiz {
        return Err(ServiceError::InvalidState(
            "answers are only accepted while a round is live".into(),
        ));
    }
    if game_state.current_question_index != request.question_index {
        return Err(ServiceError::InvalidState(format!(
            "question {} is no longer live",
            request.question_index
        )));
    }

    let players = store.players(code).await?;
    let submitted_name = fold_name(&request.name);
    let Some(player) = players
        .iter()
        .find(|p| fold_name(&p.name) == submitted_name)
    else {
        return Err(ServiceError::InvalidInput(format!(
            "player `{}` has not joined this session",
            request.name.trim()
        )));
    };

    let question = state
        .catalog()
        .question(game_state.current_question_index)
        .ok_or_else(|| {
            ServiceError::InvalidState(format!(
                "question {} does not exist",
                game_state.current_question_index
            ))
        })?;

    let config = state.config();
    let choice = request.choice.trim().to_string();
    let is_correct = question.correct == choice;
    let time_remaining_ms = request.time_remaining_ms.min(config.round_ms);
    let score = scoring::answer_score(
        config.base_points,
        config.speed_weight,
        config.round_ms,
        is_correct,
        time_remaining_ms,
    );

    let recorded = store
        .insert_answer(AnswerRow {
            session_code: player.session_code.clone(),
            player_name: player.name.clone(),
            team: player.team,
            question_index: game_state.current_question_index,
            choice,
            is_correct,
            time_remaining_ms,
            score,
        })
        .await?;
    debug!(
        code = %recorded.session_code,
        player = %recorded.player_name,
        question_index = recorded.question_index,
        "answer recorded"
    );

    // Optional early-conclude trigger: once every rostered player has a row
    // for this question there is nothing left to wait for. The round watcher
    // may fire the same trigger concurrently; the guard absorbs whichever
    // loses, so the ack only reports that the round is now closed.
    let answers = store
        .answers(code, game_state.current_question_index)
        .await?;
    let mut round_concluded = false;
    if !players.is_empty() && answers.len() >= players.len() {
        let response = driver_service::conclude_round(state, code).await?;
        round_concluded = response.phase != Phase::Quiz;
    }

    Ok(AnswerAck::for_row(&recorded, round_concluded))
}

#[cfg(test)]
mod tests {
    use crate::{
        catalog::{Question, QuestionCatalog},
        config::AppConfig,
        dto::session::JoinRequest,
        services::{driver_service, session_service},
        state::AppState,
        store::{
            SessionStore,
            models::{GameStateRow, SessionRow, Team},
        },
    };

    use super::*;

    const CODE: &str = "AB3XK";

    async fn live_session() -> SharedState {
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
        for (name, team) in [("Ana", Team::A), ("Ben", Team::B)] {
            session_service::join_session(
                &state,
                CODE,
                JoinRequest {
                    name: name.into(),
                    team,
                },
            )
            .await
            .unwrap();
        }
        driver_service::start_game(&state, CODE).await.unwrap();
        driver_service::start_round(&state, CODE).await.unwrap();
        state
    }

    fn request(name: &str, choice: &str, question_index: usize) -> SubmitAnswerRequest {
        SubmitAnswerRequest {
            name: name.into(),
            choice: choice.into(),
            question_index,
            time_remaining_ms: 8_000,
        }
    }

    #[tokio::test]
    async fn score_is_recomputed_server_side() {
        let state = live_session().await;
        submit_answer(&state, CODE, request("Ana", "B", 0))
            .await
            .unwrap();

        let answers = state.store().answers(CODE, 0).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert!(answers[0].is_correct);
        assert_eq!(answers[0].score, 90);

        // A wrong pick scores zero no matter how fast it was.
        submit_answer(
            &state,
            CODE,
            SubmitAnswerRequest {
                time_remaining_ms: 9_999,
                ..request("Ben", "A", 0)
            },
        )
        .await
        .unwrap();
        let answers = state.store().answers(CODE, 0).await.unwrap();
        assert_eq!(answers[1].score, 0);
    }

    #[tokio::test]
    async fn inflated_clock_is_clamped() {
        let state = live_session().await;
        submit_answer(
            &state,
            CODE,
            SubmitAnswerRequest {
                time_remaining_ms: u64::MAX,
                ..request("Ana", "B", 0)
            },
        )
        .await
        .unwrap();

        let answers = state.store().answers(CODE, 0).await.unwrap();
        assert_eq!(answers[0].time_remaining_ms, 10_000);
        assert_eq!(answers[0].score, 100);
    }

    #[tokio::test]
    async fn double_submission_is_rejected() {
        let state = live_session().await;
        submit_answer(&state, CODE, request("Ana", "B", 0))
            .await
            .unwrap();
        let err = submit_answer(&state, CODE, request("ANA", "A", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(state.store().answers(CODE, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn submissions_outside_a_live_round_are_rejected() {
        let state = live_session().await;

        let err = submit_answer(&state, CODE, request("Ana", "B", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        driver_service::conclude_round(&state, CODE).await.unwrap();
        let err = submit_answer(&state, CODE, request("Ana", "B", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn unknown_player_cannot_answer() {
        let state = live_session().await;
        let err = submit_answer(&state, CODE, request("Mallory", "B", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn last_outstanding_answer_concludes_the_round() {
        let state = live_session().await;
        let first = submit_answer(&state, CODE, request("Ana", "B", 0))
            .await
            .unwrap();
        assert!(!first.round_concluded);

        let second = submit_answer(&state, CODE, request("Ben", "A", 0))
            .await
            .unwrap();
        assert!(second.round_concluded);

        // The conclude may still be mid-publish when the ack returns; wait
        // for the results write.
        let mut waited = 0u64;
        let row = loop {
            let row = state.store().game_state(CODE).await.unwrap().unwrap();
            if row.phase == Phase::Results {
                break row;
            }
            waited += 10;
            assert!(waited < 2_000, "round never reached results");
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        };
        assert_eq!(row.round_score_a, 90);
        assert_eq!(row.round_score_b, 0);
    }
}
