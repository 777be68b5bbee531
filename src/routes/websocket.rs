use axum::{
    Router,
    extract::{Path, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    services::{sse_service, websocket_service},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/games/{id}/ws",
    tag = "websocket",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 101, description = "Switching protocols to WebSocket"),
        (status = 404, description = "Unknown game")
    )
)]
/// Upgrade the HTTP connection into a game event WebSocket session.
pub async fn ws_handler(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let subscription = sse_service::subscribe_game(&state, id).await?;
    Ok(ws.on_upgrade(move |socket| websocket_service::handle_socket(subscription, socket)))
}

/// Configure the WebSocket endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/games/{id}/ws", get(ws_handler))
}
