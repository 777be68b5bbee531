use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::GameActionEntity,
    dto::{
        history::{ActionQuery, GameActionView, UndoActionRequest},
        sse::ActionUndoneEvent,
    },
    error::ServiceError,
    services::game_service::ensure_host,
    state::{
        SharedState,
        events::{ActionKind, EventKind, Outbox},
        transitions::commit_game,
    },
};

const DEFAULT_ACTION_LIMIT: usize = 50;
const MAX_ACTION_LIMIT: usize = 500;
const DEFAULT_UNDO_REASON: &str = "Undone by host";

/// Actions of a game that have not been undone, newest first.
pub async fn list_actions(
    state: &SharedState,
    game_id: Uuid,
    query: ActionQuery,
) -> Result<Vec<GameActionView>, ServiceError> {
    let game = state.read_game(game_id).await?;
    if !game.is_host(query.user_id) && game.player_by_user(query.user_id).is_none() {
        return Err(ServiceError::Forbidden(
            "only the host and seated players can read the action log".into(),
        ));
    }

    let limit = query
        .limit
        .unwrap_or(DEFAULT_ACTION_LIMIT)
        .clamp(1, MAX_ACTION_LIMIT);
    let store = state.require_game_store().await?;
    let actions = store.list_actions(game_id, limit).await?;
    Ok(actions.into_iter().map(GameActionView::from).collect())
}

/// Flag a logged action as undone. The game itself is left as it is.
pub async fn undo_action(
    state: &SharedState,
    game_id: Uuid,
    action_id: Uuid,
    request: UndoActionRequest,
) -> Result<GameActionView, ServiceError> {
    let mut guard = state.lock_game(game_id).await?;
    ensure_host(&guard, request.user_id, "undo actions")?;
    guard.ensure_not_ended()?;
    let store = state.require_game_store().await?;

    let action = store
        .find_action(game_id, action_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("action `{action_id}` not found")))?;
    let reason = request
        .reason
        .map(|reason| reason.trim().to_owned())
        .filter(|reason| !reason.is_empty())
        .unwrap_or_else(|| DEFAULT_UNDO_REASON.to_owned());
    let undone = !action.is_undone
        && store
            .mark_action_undone(game_id, action_id, reason.clone())
            .await?;
    if !undone {
        return Err(ServiceError::InvalidState(format!(
            "action `{action_id}` is already undone"
        )));
    }

    let mut outbox = Outbox::new();
    outbox.record(
        ActionKind::UndoAction,
        request.user_id,
        &json!({
            "action_id": action_id,
            "action_type": action.action_type,
            "reason": reason,
        }),
    );
    outbox.push(
        EventKind::ActionUndone,
        &ActionUndoneEvent {
            action_id,
            action_type: action.action_type.clone(),
            reason: reason.clone(),
        },
    );
    let draft = guard.clone();
    commit_game(state, &mut guard, draft, outbox).await?;
    info!(%game_id, %action_id, action = %action.action_type, "action undone");

    Ok(GameActionEntity {
        is_undone: true,
        undo_reason: Some(reason),
        ..action
    }
    .into())
}
