use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        catalog::{
            CreateScriptRequest, DistributionResponse, RoleQuery, RoleSummary, ScriptDetail,
            ScriptSummary, UpdateScriptRequest,
        },
        game::CallerRequest,
    },
    error::AppError,
    services::catalog_service,
    state::SharedState,
};

/// Roles, scripts and custom script management.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/roles", get(list_roles))
        .route("/roles/{character_id}", get(get_role))
        .route("/scripts", get(list_scripts).post(create_script))
        .route(
            "/scripts/{id}",
            get(get_script).put(update_script).delete(delete_script),
        )
        .route(
            "/scripts/{id}/distribution/{player_count}",
            get(distribution),
        )
}

/// List roles, optionally filtered by edition and team.
#[utoipa::path(
    get,
    path = "/roles",
    tag = "catalog",
    params(RoleQuery),
    responses((status = 200, description = "Roles", body = [RoleSummary]))
)]
pub async fn list_roles(
    State(state): State<SharedState>,
    Query(query): Query<RoleQuery>,
) -> Json<Vec<RoleSummary>> {
    Json(catalog_service::list_roles(&state, &query))
}

/// Fetch one role.
#[utoipa::path(
    get,
    path = "/roles/{character_id}",
    tag = "catalog",
    params(
        ("character_id" = String, Path, description = "Character id, e.g. `fortune_teller`")
    ),
    responses((status = 200, description = "Role", body = RoleSummary))
)]
pub async fn get_role(
    State(state): State<SharedState>,
    Path(character_id): Path<String>,
) -> Result<Json<RoleSummary>, AppError> {
    Ok(Json(catalog_service::get_role(&state, &character_id)?))
}

/// List every script, official ones first.
#[utoipa::path(
    get,
    path = "/scripts",
    tag = "catalog",
    responses((status = 200, description = "Scripts", body = [ScriptSummary]))
)]
pub async fn list_scripts(State(state): State<SharedState>) -> Json<Vec<ScriptSummary>> {
    Json(catalog_service::list_scripts(&state))
}

/// Fetch a script with its roles grouped by team.
#[utoipa::path(
    get,
    path = "/scripts/{id}",
    tag = "catalog",
    params(("id" = String, Path, description = "Script id or name")),
    responses((status = 200, description = "Script with roles by team", body = ScriptDetail))
)]
pub async fn get_script(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ScriptDetail>, AppError> {
    Ok(Json(catalog_service::get_script(&state, &id)?))
}

/// Create a custom script.
#[utoipa::path(
    post,
    path = "/scripts",
    tag = "catalog",
    request_body = CreateScriptRequest,
    responses(
        (status = 200, description = "Script created", body = ScriptDetail),
        (status = 400, description = "Script breaks the composition rules"),
        (status = 409, description = "Name already taken")
    )
)]
pub async fn create_script(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateScriptRequest>>,
) -> Result<Json<ScriptDetail>, AppError> {
    Ok(Json(catalog_service::create_script(&state, payload).await?))
}

/// Edit a custom script. Author only.
#[utoipa::path(
    put,
    path = "/scripts/{id}",
    tag = "catalog",
    params(("id" = String, Path, description = "Script id or name")),
    request_body = UpdateScriptRequest,
    responses(
        (status = 200, description = "Script updated", body = ScriptDetail),
        (status = 403, description = "Caller is not the author")
    )
)]
pub async fn update_script(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Valid(Json(payload)): Valid<Json<UpdateScriptRequest>>,
) -> Result<Json<ScriptDetail>, AppError> {
    Ok(Json(catalog_service::update_script(&state, &id, payload).await?))
}

/// Delete a custom script no running game uses. Author only.
#[utoipa::path(
    delete,
    path = "/scripts/{id}",
    tag = "catalog",
    params(
        ("id" = String, Path, description = "Script id or name"),
        ("user_id" = Uuid, Query, description = "Calling user, must be the author")
    ),
    responses(
        (status = 204, description = "Script deleted"),
        (status = 403, description = "Caller is not the author"),
        (status = 409, description = "A running game uses the script")
    )
)]
pub async fn delete_script(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(caller): Query<CallerRequest>,
) -> Result<StatusCode, AppError> {
    catalog_service::delete_script(&state, &id, caller.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Team counts for a table size.
#[utoipa::path(
    get,
    path = "/scripts/{id}/distribution/{player_count}",
    tag = "catalog",
    params(
        ("id" = String, Path, description = "Script id or name"),
        ("player_count" = usize, Path, description = "Players at the table, 5 to 15")
    ),
    responses(
        (status = 200, description = "Team counts", body = DistributionResponse),
        (status = 400, description = "Unsupported player count")
    )
)]
pub async fn distribution(
    State(state): State<SharedState>,
    Path((id, player_count)): Path<(String, usize)>,
) -> Result<Json<DistributionResponse>, AppError> {
    Ok(Json(catalog_service::distribution(&state, &id, player_count)?))
}
