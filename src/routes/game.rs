use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::game::{
        AbilityUseView, ActionRequest, CallerRequest, CreateGameRequest, EffectRemovedResponse,
        EndGameRequest, GameView, JoinGameRequest, KillRequest, KillResponse, NeighborsResponse,
        NominateRequest, NominationView, NotesRequest, SetScriptRequest, StatusEffectRequest,
        StatusEffectView, ViewerQuery, VoteRequest, VoteView,
    },
    error::AppError,
    services::{game_service, lobby_service},
    state::SharedState,
};

/// Lobby and gameplay routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", post(create_game))
        .route("/games/join", post(join_game))
        .route("/games/{id}", get(get_game))
        .route("/games/{id}/leave", post(leave_game))
        .route("/games/{id}/ready", post(toggle_ready))
        .route("/games/{id}/script", post(set_script))
        .route("/games/{id}/start", post(start_game))
        .route("/games/{id}/advance", post(advance_phase))
        .route("/games/{id}/end", post(end_game))
        .route("/games/{id}/nominate", post(nominate))
        .route("/games/{id}/vote", post(cast_vote))
        .route("/games/{id}/players/{player_id}/kill", post(kill_player))
        .route(
            "/games/{id}/players/{player_id}/resurrect",
            post(resurrect_player),
        )
        .route("/games/{id}/players/{player_id}/actions", post(record_action))
        .route(
            "/games/{id}/players/{player_id}/effects",
            post(add_status_effect),
        )
        .route(
            "/games/{id}/players/{player_id}/effects/{name}",
            delete(remove_status_effect),
        )
        .route("/games/{id}/players/{player_id}/notes", put(set_notes))
        .route(
            "/games/{id}/players/{player_id}/neighbors",
            get(neighbors),
        )
}

/// Open a new lobby; the host is seated first.
#[utoipa::path(
    post,
    path = "/games",
    tag = "lobby",
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Game created", body = GameView),
        (status = 404, description = "Unknown host or script")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateGameRequest>>,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(lobby_service::create_game(&state, payload).await?))
}

/// Join a lobby with its code.
#[utoipa::path(
    post,
    path = "/games/join",
    tag = "lobby",
    request_body = JoinGameRequest,
    responses(
        (status = 200, description = "Seat taken", body = GameView),
        (status = 404, description = "No game with this code"),
        (status = 409, description = "Game started, full, or already joined")
    )
)]
pub async fn join_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<JoinGameRequest>>,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(lobby_service::join_game(&state, payload).await?))
}

/// Current game state as seen by the caller.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "game",
    params(("id" = Uuid, Path, description = "Game identifier"), ViewerQuery),
    responses((status = 200, description = "Game", body = GameView))
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ViewerQuery>,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(game_service::get_game(&state, id, query.user_id).await?))
}

/// Leave a game.
#[utoipa::path(
    post,
    path = "/games/{id}/leave",
    tag = "lobby",
    params(("id" = Uuid, Path, description = "Game identifier")),
    request_body = CallerRequest,
    responses((status = 200, description = "Left the game", body = GameView))
)]
pub async fn leave_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CallerRequest>,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(lobby_service::leave_game(&state, id, payload.user_id).await?))
}

/// Flip the caller's ready flag.
#[utoipa::path(
    post,
    path = "/games/{id}/ready",
    tag = "lobby",
    params(("id" = Uuid, Path, description = "Game identifier")),
    request_body = CallerRequest,
    responses((status = 200, description = "Ready flag toggled", body = GameView))
)]
pub async fn toggle_ready(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CallerRequest>,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(lobby_service::toggle_ready(&state, id, payload.user_id).await?))
}

/// Pick the script of a lobby. Host only.
#[utoipa::path(
    post,
    path = "/games/{id}/script",
    tag = "lobby",
    params(("id" = Uuid, Path, description = "Game identifier")),
    request_body = SetScriptRequest,
    responses(
        (status = 200, description = "Script selected", body = GameView),
        (status = 403, description = "Caller is not the host")
    )
)]
pub async fn set_script(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SetScriptRequest>>,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(lobby_service::set_script(&state, id, payload).await?))
}

/// Assign roles and begin the first night.
#[utoipa::path(
    post,
    path = "/games/{id}/start",
    tag = "game",
    params(("id" = Uuid, Path, description = "Game identifier")),
    request_body = CallerRequest,
    responses(
        (status = 200, description = "Game started", body = GameView),
        (status = 403, description = "Caller is not the host"),
        (status = 409, description = "Players missing or not ready")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CallerRequest>,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(game_service::start_game(&state, id, payload.user_id).await?))
}

/// Move to the next phase. Host only.
#[utoipa::path(
    post,
    path = "/games/{id}/advance",
    tag = "game",
    params(("id" = Uuid, Path, description = "Game identifier")),
    request_body = CallerRequest,
    responses((status = 200, description = "Phase advanced", body = GameView))
)]
pub async fn advance_phase(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CallerRequest>,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(game_service::advance_phase(&state, id, payload.user_id).await?))
}

/// End the game. Host only.
#[utoipa::path(
    post,
    path = "/games/{id}/end",
    tag = "game",
    params(("id" = Uuid, Path, description = "Game identifier")),
    request_body = EndGameRequest,
    responses((status = 200, description = "Game ended", body = GameView))
)]
pub async fn end_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EndGameRequest>,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(game_service::end_game(&state, id, payload).await?))
}

/// Nominate a player.
#[utoipa::path(
    post,
    path = "/games/{id}/nominate",
    tag = "game",
    params(("id" = Uuid, Path, description = "Game identifier")),
    request_body = NominateRequest,
    responses(
        (status = 200, description = "Nomination recorded", body = NominationView),
        (status = 409, description = "Not day, already nominated, or dead player involved")
    )
)]
pub async fn nominate(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<NominateRequest>,
) -> Result<Json<NominationView>, AppError> {
    Ok(Json(game_service::nominate(&state, id, payload).await?))
}

/// Cast or abstain a vote.
#[utoipa::path(
    post,
    path = "/games/{id}/vote",
    tag = "game",
    params(("id" = Uuid, Path, description = "Game identifier")),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Vote recorded", body = VoteView),
        (status = 409, description = "Not day or no vote left")
    )
)]
pub async fn cast_vote(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<VoteView>, AppError> {
    Ok(Json(game_service::cast_vote(&state, id, payload).await?))
}

/// Kill a player. Host only.
#[utoipa::path(
    post,
    path = "/games/{id}/players/{player_id}/kill",
    tag = "players",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("player_id" = Uuid, Path, description = "Player identifier")
    ),
    request_body = KillRequest,
    responses((status = 200, description = "Player killed", body = KillResponse))
)]
pub async fn kill_player(
    State(state): State<SharedState>,
    Path((id, player_id)): Path<(Uuid, Uuid)>,
    Valid(Json(payload)): Valid<Json<KillRequest>>,
) -> Result<Json<KillResponse>, AppError> {
    Ok(Json(
        game_service::kill_player(&state, id, player_id, payload).await?,
    ))
}

/// Bring a dead player back. Host only.
#[utoipa::path(
    post,
    path = "/games/{id}/players/{player_id}/resurrect",
    tag = "players",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("player_id" = Uuid, Path, description = "Player identifier")
    ),
    request_body = CallerRequest,
    responses((status = 200, description = "Player resurrected", body = GameView))
)]
pub async fn resurrect_player(
    State(state): State<SharedState>,
    Path((id, player_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CallerRequest>,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(
        game_service::resurrect_player(&state, id, player_id, payload.user_id).await?,
    ))
}

/// Record a night ability use. Host only.
#[utoipa::path(
    post,
    path = "/games/{id}/players/{player_id}/actions",
    tag = "players",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("player_id" = Uuid, Path, description = "Player identifier")
    ),
    request_body = ActionRequest,
    responses(
        (status = 200, description = "Ability use recorded", body = AbilityUseView),
        (status = 409, description = "Not night")
    )
)]
pub async fn record_action(
    State(state): State<SharedState>,
    Path((id, player_id)): Path<(Uuid, Uuid)>,
    Valid(Json(payload)): Valid<Json<ActionRequest>>,
) -> Result<Json<AbilityUseView>, AppError> {
    Ok(Json(
        game_service::record_action(&state, id, player_id, payload).await?,
    ))
}

/// Place a status effect. Host only.
#[utoipa::path(
    post,
    path = "/games/{id}/players/{player_id}/effects",
    tag = "players",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("player_id" = Uuid, Path, description = "Player identifier")
    ),
    request_body = StatusEffectRequest,
    responses((status = 200, description = "Effect applied", body = StatusEffectView))
)]
pub async fn add_status_effect(
    State(state): State<SharedState>,
    Path((id, player_id)): Path<(Uuid, Uuid)>,
    Valid(Json(payload)): Valid<Json<StatusEffectRequest>>,
) -> Result<Json<StatusEffectView>, AppError> {
    Ok(Json(
        game_service::add_status_effect(&state, id, player_id, payload).await?,
    ))
}

/// Remove a status effect. Host only.
#[utoipa::path(
    delete,
    path = "/games/{id}/players/{player_id}/effects/{name}",
    tag = "players",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("player_id" = Uuid, Path, description = "Player identifier"),
        ("name" = String, Path, description = "Effect name"),
        ("user_id" = Uuid, Query, description = "Calling user")
    ),
    responses((status = 200, description = "Effect removed", body = EffectRemovedResponse))
)]
pub async fn remove_status_effect(
    State(state): State<SharedState>,
    Path((id, player_id, name)): Path<(Uuid, Uuid, String)>,
    Query(caller): Query<CallerRequest>,
) -> Result<Json<EffectRemovedResponse>, AppError> {
    Ok(Json(
        game_service::remove_status_effect(&state, id, player_id, name, caller.user_id).await?,
    ))
}

/// Replace the host's notes about a player.
#[utoipa::path(
    put,
    path = "/games/{id}/players/{player_id}/notes",
    tag = "players",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("player_id" = Uuid, Path, description = "Player identifier")
    ),
    request_body = NotesRequest,
    responses((status = 200, description = "Notes stored", body = GameView))
)]
pub async fn set_notes(
    State(state): State<SharedState>,
    Path((id, player_id)): Path<(Uuid, Uuid)>,
    Valid(Json(payload)): Valid<Json<NotesRequest>>,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(
        game_service::set_notes(&state, id, player_id, payload).await?,
    ))
}

/// Seating neighbours of a player.
#[utoipa::path(
    get,
    path = "/games/{id}/players/{player_id}/neighbors",
    tag = "players",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("player_id" = Uuid, Path, description = "Player identifier")
    ),
    responses((status = 200, description = "Seating neighbours", body = NeighborsResponse))
)]
pub async fn neighbors(
    State(state): State<SharedState>,
    Path((id, player_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<NeighborsResponse>, AppError> {
    Ok(Json(game_service::neighbors(&state, id, player_id).await?))
}
