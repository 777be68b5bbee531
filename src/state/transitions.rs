use std::{sync::Arc, time::SystemTime};

use tokio::{sync::OwnedMutexGuard, time::timeout};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dao::{
        game_store::GameStore,
        models::{GameActionEntity, GameEntity},
    },
    error::ServiceError,
    services::{history_service, sse_events::publish_notifications},
    state::{
        SharedState,
        events::{Outbox, PendingAction},
        game::GameSession,
        state_machine::GameStatus,
    },
};

/// Apply `work` to a game under its lock, persist the result, then publish the notifications.
///
/// `work` runs on a draft copy. The live game only changes when the draft has been stored, so
/// a failing step leaves the game exactly as it was and nothing is published.
pub async fn run_game_mutation<F, T>(
    state: &SharedState,
    game_id: Uuid,
    work: F,
) -> Result<T, ServiceError>
where
    F: FnOnce(&mut GameSession, &mut Outbox) -> Result<T, ServiceError>,
{
    let mut guard = state.lock_game(game_id).await?;
    let mut draft = guard.clone();
    let mut outbox = Outbox::new();

    let value = work(&mut draft, &mut outbox)?;
    commit_game(state, &mut guard, draft, outbox).await?;
    Ok(value)
}

/// Persist `draft`, swap it into the locked slot, log its actions and publish `outbox`.
///
/// Callers that need to await other storage calls before committing lock the game with
/// [`crate::state::AppState::lock_game`] and finish with this function. A game that ends here
/// gets its summary written and is evicted from memory.
pub async fn commit_game(
    state: &SharedState,
    guard: &mut OwnedMutexGuard<GameSession>,
    draft: GameSession,
    mut outbox: Outbox,
) -> Result<(), ServiceError> {
    let store = state.require_game_store().await?;
    let save = store.save_game(GameEntity::from(&draft));
    match state.mutation_timeout() {
        Some(limit) => timeout(limit, save)
            .await
            .map_err(|_| ServiceError::Timeout)??,
        None => save.await?,
    }

    let just_ended = guard.status() != GameStatus::Ended && draft.status() == GameStatus::Ended;
    **guard = draft;
    debug!(
        game_id = %guard.id,
        status = ?guard.status(),
        events = ?outbox.kinds().map(|kind| kind.as_str()).collect::<Vec<_>>(),
        "game mutation committed"
    );

    persist_actions(&store, guard, outbox.take_actions()).await;

    if just_ended {
        let participants = guard.participant_ids();
        if let Err(err) = store.increment_games_played(participants).await {
            warn!(game_id = %guard.id, error = %err, "failed to update games played");
        }
        history_service::record_summary(&store, guard).await;
    }

    publish_notifications(state, &store, guard, outbox.into_inner()).await;

    if just_ended {
        state.evict_game(guard.id);
    }
    Ok(())
}

/// Append recorded actions to the log. Failures are logged, the game change stands.
async fn persist_actions(
    store: &Arc<dyn GameStore>,
    game: &GameSession,
    actions: Vec<PendingAction>,
) {
    let performed_at = SystemTime::now();
    for action in actions {
        let entity = GameActionEntity {
            id: Uuid::new_v4(),
            game_id: game.id,
            action_type: action.kind.as_str().to_owned(),
            action_data: action.data,
            performed_by: action.performed_by,
            performed_at,
            is_undone: false,
            undo_reason: None,
            status: game.status(),
            phase: game.phase(),
            day_number: game.day_number(),
        };
        if let Err(err) = store.append_action(entity).await {
            warn!(
                game_id = %game.id,
                action = action.kind.as_str(),
                error = %err,
                "failed to record action"
            );
        }
    }
}
