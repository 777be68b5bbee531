use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::user::{CreateUserRequest, UserSummary},
    error::AppError,
    services::user_service,
    state::SharedState,
};

/// User registration routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/{id}", get(get_user))
}

/// Register a user.
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User registered", body = UserSummary),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn create_user(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateUserRequest>>,
) -> Result<Json<UserSummary>, AppError> {
    Ok(Json(user_service::register(&state, payload).await?))
}

/// Fetch a user profile.
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User identifier")),
    responses((status = 200, description = "User", body = UserSummary))
)]
pub async fn get_user(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserSummary>, AppError> {
    Ok(Json(user_service::get_user(&state, id).await?))
}
