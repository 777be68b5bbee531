use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Client, Collection, Database, IndexModel, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoActionDocument, MongoGameDocument, MongoLogDocument, MongoScriptDocument,
        MongoSnapshotDocument, MongoSummaryDocument, MongoUserDocument, by_game, doc_id,
    },
};
use crate::dao::{
    game_store::GameStore,
    models::{
        GameActionEntity, GameEntity, GameLogEntity, GameSummaryEntity, ScriptEntity,
        SnapshotEntity, SnapshotSummaryEntity, UserEntity,
    },
    storage::StorageResult,
};

const GAME_COLLECTION_NAME: &str = "games";
const USER_COLLECTION_NAME: &str = "users";
const LOG_COLLECTION_NAME: &str = "game_logs";
const SNAPSHOT_COLLECTION_NAME: &str = "game_states";
const SCRIPT_COLLECTION_NAME: &str = "scripts";
const ACTION_COLLECTION_NAME: &str = "game_actions";
const SUMMARY_COLLECTION_NAME: &str = "game_histories";

/// [`GameStore`] backed by MongoDB. Cloning shares the underlying connection.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    // Held so the connection pool lives as long as the database handle.
    _client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard._client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState {
                _client: client,
                database,
            }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;
        let indexes: [(&'static str, &'static str, mongodb::bson::Document, bool); 6] = [
            (GAME_COLLECTION_NAME, "join_code", doc! {"join_code": 1}, true),
            (USER_COLLECTION_NAME, "username", doc! {"username": 1}, true),
            (
                LOG_COLLECTION_NAME,
                "game_id,created_at",
                doc! {"game_id": 1, "created_at": 1},
                false,
            ),
            (
                SNAPSHOT_COLLECTION_NAME,
                "game_id,created_at",
                doc! {"game_id": 1, "created_at": -1},
                false,
            ),
            (
                ACTION_COLLECTION_NAME,
                "game_id,performed_at",
                doc! {"game_id": 1, "performed_at": -1},
                false,
            ),
            (
                SUMMARY_COLLECTION_NAME,
                "participants,ended_at",
                doc! {"participants": 1, "ended_at": -1},
                false,
            ),
        ];

        for (collection, index, keys, unique) in indexes {
            let model = IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(Some(format!("{collection}_{}_idx", index.replace(',', "_"))))
                        .unique(Some(unique))
                        .build(),
                )
                .build();

            database
                .collection::<mongodb::bson::Document>(collection)
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index,
                    source,
                })?;
        }

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn games(&self) -> Collection<MongoGameDocument> {
        self.database().await.collection(GAME_COLLECTION_NAME)
    }

    async fn users(&self) -> Collection<MongoUserDocument> {
        self.database().await.collection(USER_COLLECTION_NAME)
    }

    async fn logs(&self) -> Collection<MongoLogDocument> {
        self.database().await.collection(LOG_COLLECTION_NAME)
    }

    async fn snapshots(&self) -> Collection<MongoSnapshotDocument> {
        self.database().await.collection(SNAPSHOT_COLLECTION_NAME)
    }

    async fn scripts(&self) -> Collection<MongoScriptDocument> {
        self.database().await.collection(SCRIPT_COLLECTION_NAME)
    }

    async fn actions(&self) -> Collection<MongoActionDocument> {
        self.database().await.collection(ACTION_COLLECTION_NAME)
    }

    async fn summaries(&self) -> Collection<MongoSummaryDocument> {
        self.database().await.collection(SUMMARY_COLLECTION_NAME)
    }

    async fn save_game(&self, game: GameEntity) -> MongoResult<()> {
        let id = game.id;
        let document: MongoGameDocument = game.into();
        self.games()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveGame { id, source })?;
        Ok(())
    }

    async fn find_game(&self, id: Uuid) -> MongoResult<Option<GameEntity>> {
        let document = self
            .games()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadGame {
                key: id.to_string(),
                source,
            })?;
        Ok(document.map(|doc| doc.game))
    }

    async fn find_game_by_code(&self, join_code: String) -> MongoResult<Option<GameEntity>> {
        let document = self
            .games()
            .await
            .find_one(doc! {"join_code": &join_code})
            .await
            .map_err(|source| MongoDaoError::LoadGame {
                key: join_code,
                source,
            })?;
        Ok(document.map(|doc| doc.game))
    }

    async fn create_user(&self, user: UserEntity) -> MongoResult<()> {
        let id = user.id;
        let document: MongoUserDocument = user.into();
        self.users()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::SaveUser { id, source })?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> MongoResult<Option<UserEntity>> {
        let document = self
            .users()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadUser {
                key: id.to_string(),
                source,
            })?;
        Ok(document.map(|doc| doc.user))
    }

    async fn find_user_by_name(&self, username: String) -> MongoResult<Option<UserEntity>> {
        let document = self
            .users()
            .await
            .find_one(doc! {"username": &username})
            .await
            .map_err(|source| MongoDaoError::LoadUser {
                key: username,
                source,
            })?;
        Ok(document.map(|doc| doc.user))
    }

    async fn increment_games_played(&self, user_ids: Vec<Uuid>) -> MongoResult<()> {
        if user_ids.is_empty() {
            return Ok(());
        }
        let count = user_ids.len();
        let ids: Vec<String> = user_ids.iter().map(Uuid::to_string).collect();
        self.users()
            .await
            .update_many(
                doc! {"_id": {"$in": ids}},
                doc! {"$inc": {"user.games_played": 1}},
            )
            .await
            .map_err(|source| MongoDaoError::UpdateUsers { count, source })?;
        Ok(())
    }

    async fn append_log(&self, entry: GameLogEntity) -> MongoResult<()> {
        let game_id = entry.game_id;
        let document: MongoLogDocument = entry.into();
        self.logs()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::AppendLog { game_id, source })?;
        Ok(())
    }

    async fn list_logs(&self, game_id: Uuid) -> MongoResult<Vec<GameLogEntity>> {
        let documents: Vec<MongoLogDocument> = self
            .logs()
            .await
            .find(by_game(game_id))
            .sort(doc! {"created_at": 1})
            .await
            .map_err(|source| MongoDaoError::ListLogs { game_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListLogs { game_id, source })?;

        Ok(documents.into_iter().map(|doc| doc.entry).collect())
    }

    async fn save_snapshot(&self, snapshot: SnapshotEntity) -> MongoResult<()> {
        let id = snapshot.id;
        let document: MongoSnapshotDocument = snapshot.into();
        self.snapshots()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::SaveSnapshot { id, source })?;
        Ok(())
    }

    async fn find_snapshot(
        &self,
        game_id: Uuid,
        snapshot_id: Uuid,
    ) -> MongoResult<Option<SnapshotEntity>> {
        let document = self
            .snapshots()
            .await
            .find_one(doc! {"_id": snapshot_id.to_string(), "game_id": game_id.to_string()})
            .await
            .map_err(|source| MongoDaoError::LoadSnapshot { game_id, source })?;
        Ok(document.map(|doc| doc.snapshot))
    }

    async fn list_snapshots(&self, game_id: Uuid) -> MongoResult<Vec<SnapshotSummaryEntity>> {
        let documents: Vec<MongoSnapshotDocument> = self
            .snapshots()
            .await
            .find(by_game(game_id))
            .sort(doc! {"created_at": -1})
            .await
            .map_err(|source| MongoDaoError::LoadSnapshot { game_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadSnapshot { game_id, source })?;

        Ok(documents
            .iter()
            .map(|doc| SnapshotSummaryEntity::from(&doc.snapshot))
            .collect())
    }

    async fn save_script(&self, script: ScriptEntity) -> MongoResult<()> {
        let id = script.id.clone();
        let document: MongoScriptDocument = script.into();
        self.scripts()
            .await
            .replace_one(doc! {"_id": &id}, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::WriteScript { id, source })?;
        Ok(())
    }

    async fn delete_script(&self, id: String) -> MongoResult<bool> {
        let result = self
            .scripts()
            .await
            .delete_one(doc! {"_id": &id})
            .await
            .map_err(|source| MongoDaoError::WriteScript { id, source })?;
        Ok(result.deleted_count > 0)
    }

    async fn list_scripts(&self) -> MongoResult<Vec<ScriptEntity>> {
        let documents: Vec<MongoScriptDocument> = self
            .scripts()
            .await
            .find(doc! {})
            .sort(doc! {"_id": 1})
            .await
            .map_err(|source| MongoDaoError::LoadScripts { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadScripts { source })?;
        Ok(documents.into_iter().map(|doc| doc.script).collect())
    }

    async fn script_in_use(&self, script_id: String) -> MongoResult<bool> {
        let count = self
            .games()
            .await
            .count_documents(doc! {
                "game.script_id": &script_id,
                "game.status": {"$ne": "ended"},
            })
            .await
            .map_err(|source| MongoDaoError::LoadScripts { source })?;
        Ok(count > 0)
    }

    async fn append_action(&self, action: GameActionEntity) -> MongoResult<()> {
        let game_id = action.game_id;
        let document: MongoActionDocument = action.into();
        self.actions()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::WriteAction { game_id, source })?;
        Ok(())
    }

    async fn list_actions(
        &self,
        game_id: Uuid,
        limit: usize,
    ) -> MongoResult<Vec<GameActionEntity>> {
        let mut filter = by_game(game_id);
        filter.insert("is_undone", false);
        let documents: Vec<MongoActionDocument> = self
            .actions()
            .await
            .find(filter)
            .sort(doc! {"performed_at": -1})
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await
            .map_err(|source| MongoDaoError::LoadActions { game_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadActions { game_id, source })?;
        Ok(documents.into_iter().map(|doc| doc.action).collect())
    }

    async fn find_action(
        &self,
        game_id: Uuid,
        action_id: Uuid,
    ) -> MongoResult<Option<GameActionEntity>> {
        let document = self
            .actions()
            .await
            .find_one(doc! {"_id": action_id.to_string(), "game_id": game_id.to_string()})
            .await
            .map_err(|source| MongoDaoError::LoadActions { game_id, source })?;
        Ok(document.map(|doc| doc.action))
    }

    async fn mark_action_undone(
        &self,
        game_id: Uuid,
        action_id: Uuid,
        reason: String,
    ) -> MongoResult<bool> {
        let result = self
            .actions()
            .await
            .update_one(
                doc! {
                    "_id": action_id.to_string(),
                    "game_id": game_id.to_string(),
                    "is_undone": false,
                },
                doc! {"$set": {
                    "is_undone": true,
                    "action.is_undone": true,
                    "action.undo_reason": reason,
                }},
            )
            .await
            .map_err(|source| MongoDaoError::WriteAction { game_id, source })?;
        Ok(result.modified_count > 0)
    }

    async fn count_actions(&self, game_id: Uuid, action_type: String) -> MongoResult<u64> {
        let mut filter = by_game(game_id);
        filter.insert("is_undone", false);
        filter.insert("action_type", action_type);
        self.actions()
            .await
            .count_documents(filter)
            .await
            .map_err(|source| MongoDaoError::LoadActions { game_id, source })
    }

    async fn save_summary(&self, summary: GameSummaryEntity) -> MongoResult<()> {
        let game_id = summary.game_id;
        let document: MongoSummaryDocument = summary.into();
        self.summaries()
            .await
            .replace_one(doc_id(game_id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveSummary { game_id, source })?;
        Ok(())
    }

    async fn find_summary(&self, game_id: Uuid) -> MongoResult<Option<GameSummaryEntity>> {
        let document = self
            .summaries()
            .await
            .find_one(doc_id(game_id))
            .await
            .map_err(|source| MongoDaoError::LoadSummary {
                key: game_id,
                source,
            })?;
        Ok(document.map(|doc| doc.summary))
    }

    async fn list_summaries_for_user(
        &self,
        user_id: Uuid,
    ) -> MongoResult<Vec<GameSummaryEntity>> {
        let documents: Vec<MongoSummaryDocument> = self
            .summaries()
            .await
            .find(doc! {"participants": user_id.to_string()})
            .sort(doc! {"ended_at": -1})
            .await
            .map_err(|source| MongoDaoError::LoadSummary {
                key: user_id,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadSummary {
                key: user_id,
                source,
            })?;
        Ok(documents.into_iter().map(|doc| doc.summary).collect())
    }
}

impl GameStore for MongoGameStore {
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_game(game).await.map_err(Into::into) })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(id).await.map_err(Into::into) })
    }

    fn find_game_by_code(
        &self,
        join_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game_by_code(join_code).await.map_err(Into::into) })
    }

    fn create_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.create_user(user).await.map_err(Into::into) })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_user(id).await.map_err(Into::into) })
    }

    fn find_user_by_name(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_user_by_name(username).await.map_err(Into::into) })
    }

    fn increment_games_played(&self, user_ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .increment_games_played(user_ids)
                .await
                .map_err(Into::into)
        })
    }

    fn append_log(&self, entry: GameLogEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.append_log(entry).await.map_err(Into::into) })
    }

    fn list_logs(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<GameLogEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_logs(game_id).await.map_err(Into::into) })
    }

    fn save_snapshot(&self, snapshot: SnapshotEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_snapshot(snapshot).await.map_err(Into::into) })
    }

    fn find_snapshot(
        &self,
        game_id: Uuid,
        snapshot_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SnapshotEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_snapshot(game_id, snapshot_id)
                .await
                .map_err(Into::into)
        })
    }

    fn list_snapshots(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SnapshotSummaryEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_snapshots(game_id).await.map_err(Into::into) })
    }

    fn save_script(&self, script: ScriptEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_script(script).await.map_err(Into::into) })
    }

    fn delete_script(&self, id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_script(id).await.map_err(Into::into) })
    }

    fn list_scripts(&self) -> BoxFuture<'static, StorageResult<Vec<ScriptEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_scripts().await.map_err(Into::into) })
    }

    fn script_in_use(&self, script_id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.script_in_use(script_id).await.map_err(Into::into) })
    }

    fn append_action(&self, action: GameActionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.append_action(action).await.map_err(Into::into) })
    }

    fn list_actions(
        &self,
        game_id: Uuid,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<GameActionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_actions(game_id, limit).await.map_err(Into::into) })
    }

    fn find_action(
        &self,
        game_id: Uuid,
        action_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameActionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_action(game_id, action_id)
                .await
                .map_err(Into::into)
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
            store
                .mark_action_undone(game_id, action_id, reason)
                .await
                .map_err(Into::into)
        })
    }

    fn count_actions(
        &self,
        game_id: Uuid,
        action_type: String,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .count_actions(game_id, action_type)
                .await
                .map_err(Into::into)
        })
    }

    fn save_summary(&self, summary: GameSummaryEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_summary(summary).await.map_err(Into::into) })
    }

    fn find_summary(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameSummaryEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_summary(game_id).await.map_err(Into::into) })
    }

    fn list_summaries_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<GameSummaryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_summaries_for_user(user_id)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
