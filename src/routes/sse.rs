use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;
use uuid::Uuid;

use crate::{error::AppError, services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/games/{id}/events",
    tag = "sse",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses(
        (
            status = 200,
            description = "Game event stream",
            content_type = "text/event-stream",
            body = String
        ),
        (status = 404, description = "Unknown game")
    )
)]
/// Stream the public events of one game, starting with a handshake.
pub async fn game_stream(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let subscription = sse_service::subscribe_game(&state, id).await?;
    info!(game_id = %id, "new game SSE connection");
    Ok(sse_service::to_sse_stream(subscription))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/games/{id}/events", get(game_stream))
}
