use std::time::SystemTime;

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{GameEntity, SnapshotEntity, SnapshotSummaryEntity},
    dto::{
        game::GameView,
        snapshot::{SaveSnapshotRequest, SnapshotSummary},
        sse::SnapshotEvent,
    },
    error::ServiceError,
    services::game_service::ensure_host,
    state::{
        SharedState,
        events::{ActionKind, EventKind, Outbox},
        game::GameSession,
        transitions::commit_game,
    },
};

fn snapshot_of(game: &GameSession, name: String, saved_by: Uuid) -> SnapshotEntity {
    SnapshotEntity {
        id: Uuid::new_v4(),
        game_id: game.id,
        name,
        saved_by,
        created_at: SystemTime::now(),
        game: GameEntity::from(game),
    }
}

/// Save a full, independent copy of the game under `request.name`.
pub async fn save_snapshot(
    state: &SharedState,
    game_id: Uuid,
    request: SaveSnapshotRequest,
) -> Result<SnapshotSummary, ServiceError> {
    let mut guard = state.lock_game(game_id).await?;
    ensure_host(&guard, request.user_id, "save the game")?;
    guard.ensure_not_ended()?;
    let store = state.require_game_store().await?;

    let snapshot = snapshot_of(&guard, request.name, request.user_id);
    store.save_snapshot(snapshot.clone()).await?;
    info!(%game_id, snapshot_id = %snapshot.id, name = %snapshot.name, "game state saved");

    let mut outbox = Outbox::new();
    outbox.record(
        ActionKind::SaveState,
        request.user_id,
        &json!({ "snapshot_id": snapshot.id, "name": snapshot.name }),
    );
    outbox.push(
        EventKind::StateSaved,
        &SnapshotEvent {
            snapshot_id: snapshot.id,
            name: snapshot.name.clone(),
        },
    );
    let draft = guard.clone();
    commit_game(state, &mut guard, draft, outbox).await?;
    Ok(SnapshotSummaryEntity::from(&snapshot).into())
}

/// Saved states of a game, newest first.
pub async fn list_snapshots(
    state: &SharedState,
    game_id: Uuid,
    user_id: Uuid,
) -> Result<Vec<SnapshotSummary>, ServiceError> {
    let game = state.read_game(game_id).await?;
    ensure_host(&game, user_id, "list saved states")?;
    let store = state.require_game_store().await?;
    let snapshots = store.list_snapshots(game_id).await?;
    Ok(snapshots.into_iter().map(SnapshotSummary::from).collect())
}

/// Replace the game with a saved state, auto-saving the current one first.
pub async fn load_snapshot(
    state: &SharedState,
    game_id: Uuid,
    snapshot_id: Uuid,
    user_id: Uuid,
) -> Result<GameView, ServiceError> {
    let mut guard = state.lock_game(game_id).await?;
    ensure_host(&guard, user_id, "load a saved state")?;
    guard.ensure_not_ended()?;
    let store = state.require_game_store().await?;

    let snapshot = store
        .find_snapshot(game_id, snapshot_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("saved state `{snapshot_id}` not found")))?;
    let restored = GameSession::restore(snapshot.game, state.catalog())?;

    let backup = snapshot_of(
        &guard,
        format!("auto-save before loading {}", snapshot.name),
        user_id,
    );
    store.save_snapshot(backup.clone()).await?;

    let mut outbox = Outbox::new();
    outbox.record(
        ActionKind::LoadState,
        user_id,
        &json!({ "snapshot_id": snapshot_id, "name": snapshot.name, "backup_id": backup.id }),
    );
    outbox.push(
        EventKind::StateSaved,
        &SnapshotEvent {
            snapshot_id: backup.id,
            name: backup.name,
        },
    );
    outbox.push(
        EventKind::StateLoaded,
        &SnapshotEvent {
            snapshot_id,
            name: snapshot.name,
        },
    );
    commit_game(state, &mut guard, restored, outbox).await?;
    info!(%game_id, %snapshot_id, "game state loaded");
    Ok(GameView::host(&guard))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::game_store::memory::MemoryGameStore,
        dto::{
            game::{CreateGameRequest, EndGameRequest, JoinGameRequest, SettingsOverrides},
            user::CreateUserRequest,
        },
        services::{game_service, lobby_service, user_service},
        state::AppState,
    };

    async fn register(state: &SharedState, name: &str) -> Uuid {
        user_service::register(
            state,
            CreateUserRequest {
                username: name.into(),
            },
        )
        .await
        .unwrap()
        .id
    }

    async fn lobby() -> (SharedState, Uuid, Uuid, String) {
        let state =
            AppState::with_store(AppConfig::default(), Arc::new(MemoryGameStore::new())).await;
        let host = register(&state, "host").await;
        let game = lobby_service::create_game(
            &state,
            CreateGameRequest {
                host_id: host,
                script_id: None,
                settings: SettingsOverrides::default(),
            },
        )
        .await
        .unwrap();
        (state, host, game.id, game.join_code)
    }

    #[tokio::test]
    async fn loading_restores_the_saved_table() {
        let (state, host, game_id, join_code) = lobby().await;
        let saved = save_snapshot(
            &state,
            game_id,
            SaveSnapshotRequest {
                user_id: host,
                name: "empty table".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(saved.name, "empty table");

        let guest = register(&state, "guest").await;
        lobby_service::join_game(&state, JoinGameRequest { join_code, user_id: guest })
            .await
            .unwrap();

        let view = load_snapshot(&state, game_id, saved.id, host).await.unwrap();
        assert_eq!(view.players.len(), 1);

        let listed = list_snapshots(&state, game_id, host).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].name.starts_with("auto-save"));
    }

    #[tokio::test]
    async fn ended_games_cannot_be_loaded_into() {
        let (state, host, game_id, _) = lobby().await;
        let saved = save_snapshot(
            &state,
            game_id,
            SaveSnapshotRequest {
                user_id: host,
                name: "before".into(),
            },
        )
        .await
        .unwrap();
        game_service::end_game(
            &state,
            game_id,
            EndGameRequest {
                user_id: host,
                winner: None,
            },
        )
        .await
        .unwrap();

        let err = load_snapshot(&state, game_id, saved.id, host).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let err = save_snapshot(
            &state,
            game_id,
            SaveSnapshotRequest {
                user_id: host,
                name: "after".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        let listed = list_snapshots(&state, game_id, host).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "before");
    }

    #[tokio::test]
    async fn snapshots_are_host_only() {
        let (state, _, game_id, _) = lobby().await;
        let stranger = register(&state, "stranger").await;
        let err = list_snapshots(&state, game_id, stranger).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }
}
