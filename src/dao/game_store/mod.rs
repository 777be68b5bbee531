/// In-process store backed by concurrent maps.
pub mod memory;
/// MongoDB store.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{
    GameActionEntity, GameEntity, GameLogEntity, GameSummaryEntity, ScriptEntity, SnapshotEntity,
    SnapshotSummaryEntity, UserEntity,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for users, games, logs and snapshots.
pub trait GameStore: Send + Sync {
    /// Insert or replace a game.
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load a game by id.
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Look a game up by its (already normalised) join code.
    fn find_game_by_code(
        &self,
        join_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Insert a user. Fails with a conflict when the username is taken.
    fn create_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load a user by id.
    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    /// Load a user by exact username.
    fn find_user_by_name(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    /// Add one finished game to each listed user.
    fn increment_games_played(&self, user_ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<()>>;
    /// Append an audit log entry.
    fn append_log(&self, entry: GameLogEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Log entries of a game in chronological order.
    fn list_logs(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<GameLogEntity>>>;
    /// Store a snapshot.
    fn save_snapshot(&self, snapshot: SnapshotEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load one snapshot of a game.
    fn find_snapshot(
        &self,
        game_id: Uuid,
        snapshot_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SnapshotEntity>>>;
    /// Snapshots of a game, newest first.
    fn list_snapshots(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SnapshotSummaryEntity>>>;
    /// Insert or replace a custom script.
    fn save_script(&self, script: ScriptEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Remove a custom script, reporting whether it existed.
    fn delete_script(&self, id: String) -> BoxFuture<'static, StorageResult<bool>>;
    /// Every stored custom script.
    fn list_scripts(&self) -> BoxFuture<'static, StorageResult<Vec<ScriptEntity>>>;
    /// Whether a game that has not ended uses the script.
    fn script_in_use(&self, script_id: String) -> BoxFuture<'static, StorageResult<bool>>;
    /// Append an action to a game's action log.
    fn append_action(&self, action: GameActionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Actions of a game that are not undone, newest first, at most `limit` of them.
    fn list_actions(
        &self,
        game_id: Uuid,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<GameActionEntity>>>;
    /// Load one action of a game, undone or not.
    fn find_action(
        &self,
        game_id: Uuid,
        action_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameActionEntity>>>;
    /// Flag an action as undone. Returns `false` when it was missing or already undone.
    fn mark_action_undone(
        &self,
        game_id: Uuid,
        action_id: Uuid,
        reason: String,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Number of actions of `action_type` in a game that are not undone.
    fn count_actions(
        &self,
        game_id: Uuid,
        action_type: String,
    ) -> BoxFuture<'static, StorageResult<u64>>;
    /// Insert or replace the summary of a finished game.
    fn save_summary(&self, summary: GameSummaryEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Summary of a finished game.
    fn find_summary(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameSummaryEntity>>>;
    /// Summaries of games `user_id` hosted or played in, most recently ended first.
    fn list_summaries_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<GameSummaryEntity>>>;
    /// Cheap round trip proving the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Rebuild the connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
