use std::{sync::Arc, time::SystemTime};

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        game_store::GameStore,
        models::{FinalSeatEntity, GameEntity, GameSummaryEntity},
    },
    dto::{
        game::GameView,
        history::{GameLogView, GameSummaryView},
    },
    error::ServiceError,
    services::user_service,
    state::{SharedState, events::ActionKind, game::GameSession},
};

/// Audit log of a game in chronological order.
pub async fn history(state: &SharedState, game_id: Uuid) -> Result<Vec<GameLogView>, ServiceError> {
    let store = state.require_game_store().await?;
    if store.find_game(game_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    }
    let entries = store.list_logs(game_id).await?;
    Ok(entries.into_iter().map(GameLogView::from).collect())
}

/// Outcome of a finished game.
pub async fn summary(state: &SharedState, game_id: Uuid) -> Result<GameSummaryView, ServiceError> {
    let store = state.require_game_store().await?;
    let summary = store.find_summary(game_id).await?.ok_or_else(|| {
        ServiceError::NotFound(format!("game `{game_id}` has no summary, it has not ended"))
    })?;
    summary_view(state, summary)
}

/// Finished games `user_id` hosted or played in, most recent first.
pub async fn user_history(
    state: &SharedState,
    user_id: Uuid,
) -> Result<Vec<GameSummaryView>, ServiceError> {
    user_service::require_user(state, user_id).await?;
    let store = state.require_game_store().await?;
    store
        .list_summaries_for_user(user_id)
        .await?
        .into_iter()
        .map(|summary| summary_view(state, summary))
        .collect()
}

fn summary_view(
    state: &SharedState,
    summary: GameSummaryEntity,
) -> Result<GameSummaryView, ServiceError> {
    let final_state = GameSession::restore(summary.final_state.clone(), state.catalog())?;
    Ok(GameSummaryView::new(summary, GameView::host(&final_state)))
}

/// Write the summary of a game that just ended. Failures are logged, the game stays ended.
pub(crate) async fn record_summary(store: &Arc<dyn GameStore>, game: &GameSession) {
    let executions = store
        .count_actions(game.id, ActionKind::Execute.as_str().to_owned())
        .await;
    let total_executions = executions.unwrap_or_else(|err| {
        warn!(game_id = %game.id, error = %err, "failed to count executions");
        0
    });

    let summary = build_summary(game, total_executions);
    match store.save_summary(summary).await {
        Ok(()) => info!(game_id = %game.id, winner = ?game.winner, "recorded game summary"),
        Err(err) => warn!(game_id = %game.id, error = %err, "failed to record game summary"),
    }
}

fn build_summary(game: &GameSession, total_executions: u64) -> GameSummaryEntity {
    let ended_at = game.ended_at.unwrap_or_else(SystemTime::now);
    let duration_seconds = game
        .started_at
        .and_then(|started| ended_at.duration_since(started).ok())
        .map(|elapsed| elapsed.as_secs());

    let mut participants = vec![game.host_id];
    for user_id in game.participant_ids() {
        if !participants.contains(&user_id) {
            participants.push(user_id);
        }
    }

    let seats = game
        .players()
        .iter()
        .map(|player| FinalSeatEntity {
            user_id: player.user_id,
            username: player.username.clone(),
            position: player.position,
            role_id: player.role.as_ref().map(|role| role.character_id.clone()),
            is_alive: player.is_alive,
        })
        .collect();

    GameSummaryEntity {
        game_id: game.id,
        host_id: game.host_id,
        script_id: game.script_id.clone(),
        winner: game.winner,
        end_reason: game.end_reason,
        started_at: game.started_at,
        ended_at,
        duration_seconds,
        total_days: game.day_number(),
        total_executions,
        participants,
        seats,
        final_state: GameEntity::from(game),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::game_store::memory::MemoryGameStore,
        dto::{
            game::{CreateGameRequest, SettingsOverrides},
            user::CreateUserRequest,
        },
        services::{lobby_service, user_service},
        state::AppState,
    };

    #[tokio::test]
    async fn history_lists_events_in_order() {
        let state =
            AppState::with_store(AppConfig::default(), Arc::new(MemoryGameStore::new())).await;
        let host = user_service::register(
            &state,
            CreateUserRequest {
                username: "host".into(),
            },
        )
        .await
        .unwrap()
        .id;
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
        lobby_service::toggle_ready(&state, game.id, host).await.unwrap();

        let log = history(&state, game.id).await.unwrap();
        let kinds: Vec<&str> = log.iter().map(|entry| entry.event_type.as_str()).collect();
        assert_eq!(kinds, ["game_created", "player_ready_changed"]);
        assert_eq!(log[1].payload["is_ready"], false);

        let err = history(&state, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
