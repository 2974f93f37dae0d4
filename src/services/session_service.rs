use rand::Rng;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    dto::session::{
        CreateSessionRequest, JoinRequest, JoinResponse, LeaderboardEntry, RoundTiming,
        SessionSummary, SnapshotResponse,
    },
    error::ServiceError,
    services::scoring,
    state::SharedState,
    store::{
        SessionStore, fold_code,
        models::{GameStateRow, PlayerRow, SessionRow},
        storage::StorageError,
    },
};

/// Join-code alphabet with the visually ambiguous glyphs removed
/// (no `0`/`O`, no `1`/`I`/`L`).
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// How many collisions we tolerate before giving up on code generation.
const MAX_CODE_ATTEMPTS: usize = 16;

/// How many players the results leaderboard shows.
const LEADERBOARD_SIZE: usize = 10;

/// Default display name for team A.
const DEFAULT_TEAM_A_NAME: &str = "Blue";
/// Default display name for team B.
const DEFAULT_TEAM_B_NAME: &str = "Red";

/// Create a session and its initial game state under a fresh join code.
pub async fn create_session(
    state: &SharedState,
    request: CreateSessionRequest,
) -> Result<SessionSummary, ServiceError> {
    let team_a_name = display_name(request.team_a_name, DEFAULT_TEAM_A_NAME);
    let team_b_name = display_name(request.team_b_name, DEFAULT_TEAM_B_NAME);

    let store = state.store();
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = generate_code(state.config().code_length);
        let session = SessionRow {
            code: code.clone(),
            team_a_name: team_a_name.clone(),
            team_b_name: team_b_name.clone(),
            team_a_total: 0,
            team_b_total: 0,
        };
        let game_state = GameStateRow::initial(code.clone());

        match store.create_session(session.clone(), game_state.clone()).await {
            Ok(()) => {
                info!(%code, "session created");
                return Ok((session, game_state).into());
            }
            Err(StorageError::CodeTaken { .. }) => continue,
            Err(err) => return Err(err.into()),
        }
    }

    Err(ServiceError::Conflict(
        "could not allocate a unique join code".into(),
    ))
}

/// Add a player to a session's roster. Joining again under a name that is
/// already on the roster recovers the existing identity.
pub async fn join_session(
    state: &SharedState,
    code: &str,
    request: JoinRequest,
) -> Result<JoinResponse, ServiceError> {
    let player = PlayerRow {
        id: Uuid::new_v4(),
        session_code: fold_code(code),
        name: request.name.trim().to_string(),
        team: request.team,
        joined_at: OffsetDateTime::now_utc(),
    };

    let outcome = state.store().insert_player(player).await?;
    let rejoined = outcome.rejoined();
    let player = outcome.player().clone();
    if rejoined {
        info!(code = %player.session_code, name = %player.name, "player re-joined");
    } else {
        info!(code = %player.session_code, name = %player.name, team = ?player.team, "player joined");
    }

    Ok(JoinResponse { player, rejoined })
}

/// Catch-up snapshot plus derived leaderboard for an attaching client.
pub async fn snapshot(state: &SharedState, code: &str) -> Result<SnapshotResponse, ServiceError> {
    let store = state.store();
    let snapshot = store
        .snapshot(code)
        .await?
        .ok_or_else(|| ServiceError::SessionNotFound(fold_code(code)))?;

    let ledger = store.all_answers(code).await?;
    let leaderboard = scoring::leaderboard(&ledger, LEADERBOARD_SIZE)
        .into_iter()
        .map(LeaderboardEntry::from)
        .collect();

    let config = state.config();
    Ok(SnapshotResponse {
        snapshot,
        leaderboard,
        timing: RoundTiming {
            round_ms: config.round_ms,
            countdown_seconds: config.countdown_seconds,
            intermission_ms: config.intermission_ms,
        },
    })
}

fn display_name(input: Option<String>, default: &str) -> String {
    match input {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => default.to_string(),
    }
}

/// Draw a join code from the unambiguous alphabet.
fn generate_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::{catalog::QuestionCatalog, config::AppConfig, state::AppState};
    use crate::store::models::Team;

    use super::*;

    fn test_state() -> SharedState {
        AppState::new(AppConfig::default(), QuestionCatalog::builtin())
    }

    #[test]
    fn generated_codes_avoid_ambiguous_characters() {
        for _ in 0..200 {
            let code = generate_code(5);
            assert_eq!(code.len(), 5);
            for c in code.chars() {
                assert!(!matches!(c, '0' | 'O' | '1' | 'I' | 'L'), "ambiguous {c} in {code}");
                assert!(c.is_ascii_uppercase() || c.is_ascii_digit());
            }
        }
    }

    #[tokio::test]
    async fn create_then_join_is_idempotent_per_name() {
        let state = test_state();
        let summary = create_session(&state, CreateSessionRequest::default())
            .await
            .unwrap();
        assert_eq!(summary.team_a_name, "Blue");
        assert_eq!(summary.team_b_name, "Red");

        let first = join_session(
            &state,
            &summary.code,
            JoinRequest {
                name: "Ana".into(),
                team: Team::A,
            },
        )
        .await
        .unwrap();
        assert!(!first.rejoined);

        // Same name, different casing, even a different team: same identity.
        let second = join_session(
            &state,
            &summary.code.to_lowercase(),
            JoinRequest {
                name: "ANA".into(),
                team: Team::B,
            },
        )
        .await
        .unwrap();
        assert!(second.rejoined);
        assert_eq!(second.player.id, first.player.id);
        assert_eq!(second.player.team, Team::A);
    }

    #[tokio::test]
    async fn join_unknown_code_is_not_found() {
        let state = test_state();
        let err = join_session(
            &state,
            "ZZZZZ",
            JoinRequest {
                name: "Ana".into(),
                team: Team::A,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn snapshot_of_fresh_session_is_waiting_with_empty_board() {
        let state = test_state();
        let summary = create_session(&state, CreateSessionRequest::default())
            .await
            .unwrap();

        let response = snapshot(&state, &summary.code).await.unwrap();
        assert_eq!(
            response.snapshot.state.phase,
            crate::store::models::Phase::Waiting
        );
        assert!(response.snapshot.players.is_empty());
        assert!(response.leaderboard.is_empty());
        assert_eq!(response.timing.round_ms, 10_000);
        assert_eq!(response.timing.countdown_seconds, 5);
    }
}
