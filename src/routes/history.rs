use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        game::{CallerRequest, GameView},
        history::{ActionQuery, GameActionView, GameLogView, GameSummaryView, UndoActionRequest},
        snapshot::{SaveSnapshotRequest, SnapshotSummary},
    },
    error::AppError,
    services::{action_service, history_service, snapshot_service},
    state::SharedState,
};

/// Audit log, action log, saved states and summaries of games.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games/{id}/history", get(history))
        .route("/games/{id}/summary", get(summary))
        .route("/games/{id}/actions", get(list_actions))
        .route("/games/{id}/actions/{action_id}/undo", post(undo_action))
        .route("/users/{id}/game-history", get(user_history))
        .route("/games/{id}/states", get(list_states).post(save_state))
        .route("/games/{id}/states/{state_id}/load", post(load_state))
}

/// Audit log of a game.
#[utoipa::path(
    get,
    path = "/games/{id}/history",
    tag = "history",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses((status = 200, description = "Events in chronological order", body = [GameLogView]))
)]
pub async fn history(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<GameLogView>>, AppError> {
    Ok(Json(history_service::history(&state, id).await?))
}

/// Save a snapshot of the game. Host only.
#[utoipa::path(
    post,
    path = "/games/{id}/states",
    tag = "history",
    params(("id" = Uuid, Path, description = "Game identifier")),
    request_body = SaveSnapshotRequest,
    responses((status = 200, description = "State saved", body = SnapshotSummary))
)]
pub async fn save_state(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SaveSnapshotRequest>>,
) -> Result<Json<SnapshotSummary>, AppError> {
    Ok(Json(snapshot_service::save_snapshot(&state, id, payload).await?))
}

/// List saved snapshots. Host only.
#[utoipa::path(
    get,
    path = "/games/{id}/states",
    tag = "history",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("user_id" = Uuid, Query, description = "Calling user, must be the host")
    ),
    responses(
        (status = 200, description = "Saved states, newest first", body = [SnapshotSummary])
    )
)]
pub async fn list_states(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(caller): Query<CallerRequest>,
) -> Result<Json<Vec<SnapshotSummary>>, AppError> {
    Ok(Json(
        snapshot_service::list_snapshots(&state, id, caller.user_id).await?,
    ))
}

/// Restore a snapshot. Host only.
#[utoipa::path(
    post,
    path = "/games/{id}/states/{state_id}/load",
    tag = "history",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("state_id" = Uuid, Path, description = "Saved state identifier")
    ),
    request_body = CallerRequest,
    responses(
        (status = 200, description = "State loaded", body = GameView),
        (status = 409, description = "Game already ended")
    )
)]
pub async fn load_state(
    State(state): State<SharedState>,
    Path((id, state_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CallerRequest>,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(
        snapshot_service::load_snapshot(&state, id, state_id, payload.user_id).await?,
    ))
}

/// Outcome of a finished game.
#[utoipa::path(
    get,
    path = "/games/{id}/summary",
    tag = "history",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Outcome of the finished game", body = GameSummaryView),
        (status = 404, description = "Unknown game or game not ended")
    )
)]
pub async fn summary(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameSummaryView>, AppError> {
    Ok(Json(history_service::summary(&state, id).await?))
}

/// Finished games a user hosted or played in.
#[utoipa::path(
    get,
    path = "/users/{id}/game-history",
    tag = "history",
    params(("id" = Uuid, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Finished games, most recent first", body = [GameSummaryView])
    )
)]
pub async fn user_history(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<GameSummaryView>>, AppError> {
    Ok(Json(history_service::user_history(&state, id).await?))
}

/// Action log of a game.
#[utoipa::path(
    get,
    path = "/games/{id}/actions",
    tag = "history",
    params(("id" = Uuid, Path, description = "Game identifier"), ActionQuery),
    responses(
        (status = 200, description = "Actions not undone, newest first", body = [GameActionView]),
        (status = 403, description = "Caller is neither host nor seated")
    )
)]
pub async fn list_actions(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ActionQuery>,
) -> Result<Json<Vec<GameActionView>>, AppError> {
    Ok(Json(action_service::list_actions(&state, id, query).await?))
}

/// Mark a logged action undone. Host only.
#[utoipa::path(
    post,
    path = "/games/{id}/actions/{action_id}/undo",
    tag = "history",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("action_id" = Uuid, Path, description = "Action identifier")
    ),
    request_body = UndoActionRequest,
    responses(
        (status = 200, description = "Action marked undone", body = GameActionView),
        (status = 409, description = "Already undone or game ended")
    )
)]
pub async fn undo_action(
    State(state): State<SharedState>,
    Path((id, action_id)): Path<(Uuid, Uuid)>,
    Valid(Json(payload)): Valid<Json<UndoActionRequest>>,
) -> Result<Json<GameActionView>, AppError> {
    Ok(Json(
        action_service::undo_action(&state, id, action_id, payload).await?,
    ))
}
