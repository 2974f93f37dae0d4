//! In-memory [`SessionStore`] backend. One shard per session, guarded by a
//! mutex so that writes and their change notifications commit in a single
//! critical section, which is what gives subscribers per-session write order.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::{Mutex, broadcast};

use crate::store::{
    ChangeEvent, SessionStore, fold_code, fold_name,
    models::{AnswerRow, GameStatePatch, GameStateRow, Phase, PlayerRow, SessionRow, SessionSnapshot},
    storage::{JoinOutcome, StorageError, StorageResult, WriteOutcome},
};

/// Default capacity of each session's change-notification channel. Slow
/// subscribers that overrun it observe a lag and re-run their catch-up read.
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Everything one session owns: registry row, game state, roster (in join
/// order, keyed by folded name), the answer ledger, and the change channel.
struct Shard {
    session: SessionRow,
    state: GameStateRow,
    players: IndexMap<String, PlayerRow>,
    answers: Vec<AnswerRow>,
    tx: broadcast::Sender<ChangeEvent>,
}

impl Shard {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session: self.session.clone(),
            state: self.state.clone(),
            players: self.players.values().cloned().collect(),
            answers: self
                .answers
                .iter()
                .filter(|a| a.question_index == self.state.current_question_index)
                .cloned()
                .collect(),
        }
    }

    /// Publish a change to whoever is subscribed; a send error only means
    /// nobody is listening right now.
    fn publish(&self, event: ChangeEvent) {
        let _ = self.tx.send(event);
    }
}

/// Authoritative in-memory store backing the whole backend.
pub struct MemoryStore {
    shards: DashMap<String, Arc<Mutex<Shard>>>,
    channel_capacity: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl MemoryStore {
    /// Create a store whose per-session change channels hold `channel_capacity`
    /// undelivered events before lagging a subscriber.
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            shards: DashMap::new(),
            channel_capacity,
        }
    }

    fn shard(&self, code: &str) -> Option<Arc<Mutex<Shard>>> {
        self.shards.get(&fold_code(code)).map(|s| Arc::clone(&s))
    }
}

impl SessionStore for MemoryStore {
    fn create_session(
        &self,
        session: SessionRow,
        state: GameStateRow,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let code = fold_code(&session.code);
        let result = match self.shards.entry(code.clone()) {
            Entry::Occupied(_) => Err(StorageError::CodeTaken { code }),
            Entry::Vacant(slot) => {
                let (tx, _rx) = broadcast::channel(self.channel_capacity);
                slot.insert(Arc::new(Mutex::new(Shard {
                    session,
                    state,
                    players: IndexMap::new(),
                    answers: Vec::new(),
                    tx,
                })));
                Ok(())
            }
        };
        async move { result }.boxed()
    }

    fn find_session(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<SessionRow>>> {
        let shard = self.shard(code);
        async move {
            match shard {
                None => Ok(None),
                Some(shard) => Ok(Some(shard.lock().await.session.clone())),
            }
        }
        .boxed()
    }

    fn game_state(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<GameStateRow>>> {
        let shard = self.shard(code);
        async move {
            match shard {
                None => Ok(None),
                Some(shard) => Ok(Some(shard.lock().await.state.clone())),
            }
        }
        .boxed()
    }

    fn players(&self, code: &str) -> BoxFuture<'static, StorageResult<Vec<PlayerRow>>> {
        let shard = self.shard(code);
        let code = fold_code(code);
        async move {
            let shard = shard.ok_or(StorageError::SessionNotFound { code })?;
            let guard = shard.lock().await;
            Ok(guard.players.values().cloned().collect())
        }
        .boxed()
    }

    fn answers(
        &self,
        code: &str,
        question_index: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerRow>>> {
        let shard = self.shard(code);
        let code = fold_code(code);
        async move {
            let shard = shard.ok_or(StorageError::SessionNotFound { code })?;
            let guard = shard.lock().await;
            Ok(guard
                .answers
                .iter()
                .filter(|a| a.question_index == question_index)
                .cloned()
                .collect())
        }
        .boxed()
    }

    fn all_answers(&self, code: &str) -> BoxFuture<'static, StorageResult<Vec<AnswerRow>>> {
        let shard = self.shard(code);
        let code = fold_code(code);
        async move {
            let shard = shard.ok_or(StorageError::SessionNotFound { code })?;
            let guard = shard.lock().await;
            Ok(guard.answers.clone())
        }
        .boxed()
    }

    fn insert_player(&self, player: PlayerRow) -> BoxFuture<'static, StorageResult<JoinOutcome>> {
        let shard = self.shard(&player.session_code);
        let code = fold_code(&player.session_code);
        async move {
            let shard = shard.ok_or(StorageError::SessionNotFound { code: code.clone() })?;
            let mut guard = shard.lock().await;

            // Idempotent identity recovery comes before the lock check so a
            // player who already joined can still recover their row.
            let key = fold_name(&player.name);
            if let Some(existing) = guard.players.get(&key) {
                return Ok(JoinOutcome::Rejoined(existing.clone()));
            }

            if guard.state.join_locked {
                return Err(StorageError::JoinsLocked { code });
            }

            guard.players.insert(key, player.clone());
            guard.publish(ChangeEvent::PlayerJoined(player.clone()));
            Ok(JoinOutcome::Joined(player))
        }
        .boxed()
    }

    fn insert_answer(&self, answer: AnswerRow) -> BoxFuture<'static, StorageResult<AnswerRow>> {
        let shard = self.shard(&answer.session_code);
        let code = fold_code(&answer.session_code);
        async move {
            let shard = shard.ok_or(StorageError::SessionNotFound { code: code.clone() })?;
            let mut guard = shard.lock().await;

            let key = fold_name(&answer.player_name);
            let duplicate = guard.answers.iter().any(|existing| {
                existing.question_index == answer.question_index
                    && fold_name(&existing.player_name) == key
            });
            if duplicate {
                return Err(StorageError::DuplicateAnswer {
                    code,
                    player: answer.player_name,
                    question_index: answer.question_index,
                });
            }

            guard.answers.push(answer.clone());
            guard.publish(ChangeEvent::AnswerRecorded(answer.clone()));
            Ok(answer)
        }
        .boxed()
    }

    fn update_game_state(
        &self,
        code: &str,
        expect: &[Phase],
        patch: GameStatePatch,
    ) -> BoxFuture<'static, StorageResult<WriteOutcome>> {
        let shard = self.shard(code);
        let code = fold_code(code);
        let expect = expect.to_vec();
        async move {
            let shard = shard.ok_or(StorageError::SessionNotFound { code })?;
            let mut guard = shard.lock().await;

            if !expect.is_empty() && !expect.contains(&guard.state.phase) {
                return Ok(WriteOutcome::Stale(guard.state.clone()));
            }

            guard.state.apply(&patch);
            // A deadline may exist exactly while a round is live.
            debug_assert!(guard.state.deadline_matches_phase());
            let row = guard.state.clone();
            guard.publish(ChangeEvent::StateChanged(row.clone()));
            Ok(WriteOutcome::Applied(row))
        }
        .boxed()
    }

    fn add_totals(
        &self,
        code: &str,
        delta_a: u32,
        delta_b: u32,
    ) -> BoxFuture<'static, StorageResult<SessionRow>> {
        let shard = self.shard(code);
        let code = fold_code(code);
        async move {
            let shard = shard.ok_or(StorageError::SessionNotFound { code })?;
            let mut guard = shard.lock().await;
            guard.session.team_a_total = guard.session.team_a_total.saturating_add(delta_a);
            guard.session.team_b_total = guard.session.team_b_total.saturating_add(delta_b);
            let row = guard.session.clone();
            guard.publish(ChangeEvent::TotalsChanged(row.clone()));
            Ok(row)
        }
        .boxed()
    }

    fn snapshot(
        &self,
        code: &str,
    ) -> BoxFuture<'static, StorageResult<Option<SessionSnapshot>>> {
        let shard = self.shard(code);
        async move {
            match shard {
                None => Ok(None),
                Some(shard) => Ok(Some(shard.lock().await.snapshot())),
            }
        }
        .boxed()
    }

    fn resume(
        &self,
        code: &str,
    ) -> BoxFuture<'static, StorageResult<(SessionSnapshot, broadcast::Receiver<ChangeEvent>)>>
    {
        let shard = self.shard(code);
        let code = fold_code(code);
        async move {
            let shard = shard.ok_or(StorageError::SessionNotFound { code })?;
            // Snapshot and subscription under the same lock: no write can
            // land between the read and the subscription going live.
            let guard = shard.lock().await;
            let snapshot = guard.snapshot();
            let receiver = guard.tx.subscribe();
            Ok((snapshot, receiver))
        }
        .boxed()
    }

    fn session_count(&self) -> usize {
        self.shards.len()
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::*;

    fn seed(store: &MemoryStore, code: &str) {
        let session = SessionRow {
            code: code.to_string(),
            team_a_name: "Blue".into(),
            team_b_name: "Red".into(),
            team_a_total: 0,
            team_b_total: 0,
        };
        store
            .create_session(session, GameStateRow::initial(code.to_string()))
            .now_or_never()
            .unwrap()
            .unwrap();
    }

    fn player(code: &str, name: &str, team: crate::store::models::Team) -> PlayerRow {
        PlayerRow {
            id: Uuid::new_v4(),
            session_code: code.to_string(),
            name: name.to_string(),
            team,
            joined_at: OffsetDateTime::now_utc(),
        }
    }

    fn answer(code: &str, name: &str, question_index: usize) -> AnswerRow {
        AnswerRow {
            session_code: code.to_string(),
            player_name: name.to_string(),
            team: crate::store::models::Team::A,
            question_index,
            choice: "x".into(),
            is_correct: false,
            time_remaining_ms: 0,
            score: 0,
        }
    }

    #[tokio::test]
    async fn codes_are_case_insensitive() {
        let store = MemoryStore::default();
        seed(&store, "AB3XK");

        let found = store.find_session("ab3xk").await.unwrap();
        assert_eq!(found.unwrap().code, "AB3XK");
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected() {
        let store = MemoryStore::default();
        seed(&store, "AB3XK");

        let session = SessionRow {
            code: "ab3xk".into(),
            team_a_name: "Blue".into(),
            team_b_name: "Red".into(),
            team_a_total: 0,
            team_b_total: 0,
        };
        let err = store
            .create_session(session, GameStateRow::initial("ab3xk".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::CodeTaken { .. }));
    }

    #[tokio::test]
    async fn stale_guard_is_a_noop() {
        let store = MemoryStore::default();
        seed(&store, "AB3XK");

        let patch = GameStatePatch {
            phase: Some(Phase::Calculating),
            ..GameStatePatch::default()
        };
        let outcome = store
            .update_game_state("AB3XK", &[Phase::Quiz], patch)
            .await
            .unwrap();

        assert!(!outcome.applied());
        assert_eq!(outcome.state().phase, Phase::Waiting);
        assert_eq!(outcome.state().version, 0);
    }

    #[tokio::test]
    async fn repeat_join_returns_existing_identity() {
        let store = MemoryStore::default();
        seed(&store, "AB3XK");

        let first = store
            .insert_player(player("AB3XK", "Ana", crate::store::models::Team::A))
            .await
            .unwrap();
        let second = store
            .insert_player(player("AB3XK", "ana", crate::store::models::Team::B))
            .await
            .unwrap();

        assert!(!first.rejoined());
        assert!(second.rejoined());
        assert_eq!(first.player().id, second.player().id);
        // The rejoin did not rebind the team.
        assert_eq!(second.player().team, crate::store::models::Team::A);
        assert_eq!(store.players("AB3XK").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn locked_session_refuses_new_players() {
        let store = MemoryStore::default();
        seed(&store, "AB3XK");
        store
            .insert_player(player("AB3XK", "Ana", crate::store::models::Team::A))
            .await
            .unwrap();

        let patch = GameStatePatch {
            join_locked: Some(true),
            ..GameStatePatch::default()
        };
        store.update_game_state("AB3XK", &[], patch).await.unwrap();

        let err = store
            .insert_player(player("AB3XK", "Ben", crate::store::models::Team::B))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::JoinsLocked { .. }));

        // Identity recovery still works for a player who was already in.
        let back = store
            .insert_player(player("AB3XK", "ANA", crate::store::models::Team::A))
            .await
            .unwrap();
        assert!(back.rejoined());
    }

    #[tokio::test]
    async fn second_answer_for_same_question_conflicts() {
        let store = MemoryStore::default();
        seed(&store, "AB3XK");

        store.insert_answer(answer("AB3XK", "Ana", 0)).await.unwrap();
        let err = store
            .insert_answer(answer("AB3XK", "ANA", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::DuplicateAnswer { .. }));

        // A different question is fine.
        store.insert_answer(answer("AB3XK", "Ana", 1)).await.unwrap();
    }

    #[tokio::test]
    async fn resume_delivers_later_writes_in_order() {
        let store = MemoryStore::default();
        seed(&store, "AB3XK");

        let (snapshot, mut rx) = store.resume("AB3XK").await.unwrap();
        assert_eq!(snapshot.state.version, 0);

        store
            .update_game_state(
                "AB3XK",
                &[Phase::Waiting],
                GameStatePatch {
                    phase: Some(Phase::Countdown),
                    join_locked: Some(true),
                    ..GameStatePatch::default()
                },
            )
            .await
            .unwrap();
        store
            .insert_player(player("AB3XK", "Ana", crate::store::models::Team::A))
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            ChangeEvent::StateChanged(row) => {
                assert_eq!(row.phase, Phase::Countdown);
                assert_eq!(row.version, 1);
            }
            other => panic!("expected state change first, got {other:?}"),
        }
        match rx.recv().await.unwrap() {
            ChangeEvent::PlayerJoined(row) => assert_eq!(row.name, "Ana"),
            other => panic!("expected player join second, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn snapshot_only_carries_current_question_answers() {
        let store = MemoryStore::default();
        seed(&store, "AB3XK");

        store.insert_answer(answer("AB3XK", "Ana", 0)).await.unwrap();
        store.insert_answer(answer("AB3XK", "Ana", 1)).await.unwrap();
        store
            .update_game_state(
                "AB3XK",
                &[],
                GameStatePatch {
                    current_question_index: Some(1),
                    ..GameStatePatch::default()
                },
            )
            .await
            .unwrap();

        let snapshot = store.snapshot("AB3XK").await.unwrap().unwrap();
        assert_eq!(snapshot.answers.len(), 1);
        assert_eq!(snapshot.answers[0].question_index, 1);
    }
}
