use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{
        GameActionEntity, GameEntity, GameLogEntity, GameSummaryEntity, ScriptEntity,
        SnapshotEntity, SnapshotSummaryEntity, UserEntity,
    },
    storage::{StorageError, StorageResult},
};
use crate::state::GameStatus;

/// Process-local store used when no database is configured and in tests.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    games: DashMap<Uuid, GameEntity>,
    users: DashMap<Uuid, UserEntity>,
    logs: DashMap<Uuid, Vec<GameLogEntity>>,
    snapshots: DashMap<Uuid, Vec<SnapshotEntity>>,
    scripts: DashMap<String, ScriptEntity>,
    actions: DashMap<Uuid, Vec<GameActionEntity>>,
    summaries: DashMap<Uuid, GameSummaryEntity>,
}

impl MemoryGameStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameStore for MemoryGameStore {
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let taken = store.inner.games.iter().any(|entry| {
                entry.value().join_code == game.join_code && entry.value().id != game.id
            });
            if taken {
                return Err(StorageError::Conflict(format!(
                    "join code `{}` is already in use",
                    game.join_code
                )));
            }
            store.inner.games.insert(game.id, game);
            Ok(())
        })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.games.get(&id).map(|entry| entry.value().clone())) })
    }

    fn find_game_by_code(
        &self,
        join_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .games
                .iter()
                .find(|entry| entry.value().join_code == join_code)
                .map(|entry| entry.value().clone()))
        })
    }

    fn create_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let taken = store
                .inner
                .users
                .iter()
                .any(|entry| entry.value().username == user.username);
            if taken {
                return Err(StorageError::Conflict(format!(
                    "username `{}` is already taken",
                    user.username
                )));
            }
            store.inner.users.insert(user.id, user);
            Ok(())
        })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.users.get(&id).map(|entry| entry.value().clone())) })
    }

    fn find_user_by_name(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .users
                .iter()
                .find(|entry| entry.value().username == username)
                .map(|entry| entry.value().clone()))
        })
    }

    fn increment_games_played(&self, user_ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            for id in user_ids {
                if let Some(mut user) = store.inner.users.get_mut(&id) {
                    user.games_played += 1;
                }
            }
            Ok(())
        })
    }

    fn append_log(&self, entry: GameLogEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.logs.entry(entry.game_id).or_default().push(entry);
            Ok(())
        })
    }

    fn list_logs(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<GameLogEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .logs
                .get(&game_id)
                .map(|entries| entries.value().clone())
                .unwrap_or_default())
        })
    }

    fn save_snapshot(&self, snapshot: SnapshotEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .inner
                .snapshots
                .entry(snapshot.game_id)
                .or_default()
                .push(snapshot);
            Ok(())
        })
    }

    fn find_snapshot(
        &self,
        game_id: Uuid,
        snapshot_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SnapshotEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store.inner.snapshots.get(&game_id).and_then(|snapshots| {
                snapshots
                    .iter()
                    .find(|snapshot| snapshot.id == snapshot_id)
                    .cloned()
            }))
        })
    }

    fn list_snapshots(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SnapshotSummaryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .snapshots
                .get(&game_id)
                .map(|snapshots| snapshots.iter().rev().map(Into::into).collect())
                .unwrap_or_default())
        })
    }

    fn save_script(&self, script: ScriptEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.scripts.insert(script.id.clone(), script);
            Ok(())
        })
    }

    fn delete_script(&self, id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.scripts.remove(&id).is_some()) })
    }

    fn list_scripts(&self) -> BoxFuture<'static, StorageResult<Vec<ScriptEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut scripts: Vec<ScriptEntity> = store
                .inner
                .scripts
                .iter()
                .map(|entry| entry.value().clone())
                .collect();
            scripts.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(scripts)
        })
    }

    fn script_in_use(&self, script_id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store.inner.games.iter().any(|entry| {
                let game = entry.value();
                game.status != GameStatus::Ended
                    && game.script_id.as_deref() == Some(script_id.as_str())
            }))
        })
    }

    fn append_action(&self, action: GameActionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .inner
                .actions
                .entry(action.game_id)
                .or_default()
                .push(action);
            Ok(())
        })
    }

    fn list_actions(
        &self,
        game_id: Uuid,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<GameActionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .actions
                .get(&game_id)
                .map(|actions| {
                    actions
                        .iter()
                        .rev()
                        .filter(|action| !action.is_undone)
                        .take(limit)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    fn find_action(
        &self,
        game_id: Uuid,
        action_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameActionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store.inner.actions.get(&game_id).and_then(|actions| {
                actions
                    .iter()
                    .find(|action| action.id == action_id)
                    .cloned()
            }))
        })
    }

    fn mark_action_undone(
        &self,
        game_id: Uuid,
        action_id: Uuid,
        reason: String,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let Some(mut actions) = store.inner.actions.get_mut(&game_id) else {
                return Ok(false);
            };
            match actions
                .iter_mut()
                .find(|action| action.id == action_id && !action.is_undone)
            {
                Some(action) => {
                    action.is_undone = true;
                    action.undo_reason = Some(reason);
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    fn count_actions(
        &self,
        game_id: Uuid,
        action_type: String,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            let count = store
                .inner
                .actions
                .get(&game_id)
                .map(|actions| {
                    actions
                        .iter()
                        .filter(|action| !action.is_undone && action.action_type == action_type)
                        .count()
                })
                .unwrap_or_default();
            Ok(count as u64)
        })
    }

    fn save_summary(&self, summary: GameSummaryEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.summaries.insert(summary.game_id, summary);
            Ok(())
        })
    }

    fn find_summary(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameSummaryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .summaries
                .get(&game_id)
                .map(|entry| entry.value().clone()))
        })
    }

    fn list_summaries_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<GameSummaryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut summaries: Vec<GameSummaryEntity> = store
                .inner
                .summaries
                .iter()
                .filter(|entry| entry.value().participants.contains(&user_id))
                .map(|entry| entry.value().clone())
                .collect();
            summaries.sort_by(|a, b| b.ended_at.cmp(&a.ended_at));
            Ok(summaries)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn user(name: &str) -> UserEntity {
        UserEntity {
            id: Uuid::new_v4(),
            username: name.into(),
            games_played: 0,
            created_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let store = MemoryGameStore::new();
        store.create_user(user("ada")).await.unwrap();

        let err = store.create_user(user("ada")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
        assert!(
            store
                .find_user_by_name("ada".into())
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn games_played_is_incremented_per_user() {
        let store = MemoryGameStore::new();
        let ada = user("ada");
        let bob = user("bob");
        store.create_user(ada.clone()).await.unwrap();
        store.create_user(bob.clone()).await.unwrap();

        store
            .increment_games_played(vec![ada.id, bob.id, Uuid::new_v4()])
            .await
            .unwrap();
        store.increment_games_played(vec![ada.id]).await.unwrap();

        assert_eq!(store.find_user(ada.id).await.unwrap().unwrap().games_played, 2);
        assert_eq!(store.find_user(bob.id).await.unwrap().unwrap().games_played, 1);
    }

    #[tokio::test]
    async fn logs_keep_insertion_order() {
        let store = MemoryGameStore::new();
        let game_id = Uuid::new_v4();
        for event in ["game_created", "player_joined", "game_started"] {
            store
                .append_log(GameLogEntity {
                    id: Uuid::new_v4(),
                    game_id,
                    event_type: event.into(),
                    payload: serde_json::Value::Null,
                    day_number: 0,
                    phase: 0,
                    created_at: SystemTime::now(),
                })
                .await
                .unwrap();
        }

        let events: Vec<String> = store
            .list_logs(game_id)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.event_type)
            .collect();
        assert_eq!(events, ["game_created", "player_joined", "game_started"]);
        assert!(store.list_logs(Uuid::new_v4()).await.unwrap().is_empty());
    }

    fn action(game_id: Uuid, action_type: &str) -> GameActionEntity {
        GameActionEntity {
            id: Uuid::new_v4(),
            game_id,
            action_type: action_type.into(),
            action_data: serde_json::Value::Null,
            performed_by: Uuid::new_v4(),
            performed_at: SystemTime::now(),
            is_undone: false,
            undo_reason: None,
            status: GameStatus::Day,
            phase: 2,
            day_number: 1,
        }
    }

    #[tokio::test]
    async fn undone_actions_drop_out_of_listings_and_counts() {
        let store = MemoryGameStore::new();
        let game_id = Uuid::new_v4();
        let first = action(game_id, "execute");
        let second = action(game_id, "execute");
        let third = action(game_id, "vote");
        for entry in [&first, &second, &third] {
            store.append_action(entry.clone()).await.unwrap();
        }

        let listed = store.list_actions(game_id, 2).await.unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|entry| entry.id).collect();
        assert_eq!(ids, [third.id, second.id]);

        assert!(
            store
                .mark_action_undone(game_id, second.id, "misclick".into())
                .await
                .unwrap()
        );
        assert!(
            !store
                .mark_action_undone(game_id, second.id, "again".into())
                .await
                .unwrap()
        );
        assert_eq!(store.count_actions(game_id, "execute".into()).await.unwrap(), 1);

        let undone = store.find_action(game_id, second.id).await.unwrap().unwrap();
        assert!(undone.is_undone);
        assert_eq!(undone.undo_reason.as_deref(), Some("misclick"));
        let listed = store.list_actions(game_id, 50).await.unwrap();
        assert_eq!(listed.len(), 2);
    }
}
