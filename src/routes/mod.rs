use axum::Router;

use crate::state::SharedState;

/// Roles, scripts and custom script management.
pub mod catalog;
/// Swagger UI and the OpenAPI document.
pub mod docs;
/// Lobby and gameplay routes.
pub mod game;
/// Health check.
pub mod health;
/// Audit and action logs, saved states and summaries.
pub mod history;
/// Server-sent event streams.
pub mod sse;
/// User registration.
pub mod users;
/// WebSocket event streams.
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(users::router())
        .merge(catalog::router())
        .merge(game::router())
        .merge(history::router())
        .merge(sse::router())
        .merge(websocket::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
