use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dto::sse::ServerEvent,
    error::ServiceError,
    services::sse_events,
    state::SharedState,
};

/// Subscription to the events of one game.
pub struct GameSubscription {
    /// Game the subscription follows.
    pub game_id: Uuid,
    /// Live events of the game.
    pub receiver: broadcast::Receiver<ServerEvent>,
    /// Sent before any broadcast event.
    pub handshake: Option<ServerEvent>,
}

/// Subscribe to the events of `game_id`, failing when the game does not exist.
pub async fn subscribe_game(
    state: &SharedState,
    game_id: Uuid,
) -> Result<GameSubscription, ServiceError> {
    state.game_slot(game_id).await?;
    let receiver = state.hubs().hub(game_id).subscribe();
    let handshake = sse_events::handshake_event(state, game_id).await;
    Ok(GameSubscription {
        game_id,
        receiver,
        handshake,
    })
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

/// Convert a game subscription into an SSE response, forwarding events until the client
/// disconnects.
pub fn to_sse_stream(
    subscription: GameSubscription,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let GameSubscription {
        game_id,
        mut receiver,
        handshake,
    } = subscription;
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if let Some(handshake) = handshake {
            if tx.send(Ok(to_event(handshake))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(%game_id, skipped, "SSE subscriber lagged behind");
                            continue;
                        }
                    }
                }
            }
        }

        info!(%game_id, "game SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::game_store::memory::MemoryGameStore,
        state::{AppState, game::{GameSession, GameSettings}},
    };

    #[tokio::test]
    async fn unknown_games_cannot_be_subscribed() {
        let state =
            AppState::with_store(AppConfig::default(), Arc::new(MemoryGameStore::new())).await;
        let err = subscribe_game(&state, Uuid::new_v4()).await.err();
        assert!(matches!(err, Some(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn subscription_starts_with_a_handshake() {
        let state =
            AppState::with_store(AppConfig::default(), Arc::new(MemoryGameStore::new())).await;
        let game = GameSession::new(
            Uuid::new_v4(),
            "host".into(),
            "QWERTY".into(),
            None,
            GameSettings::default(),
        );
        let game_id = game.id;
        state.insert_game(game);

        let subscription = subscribe_game(&state, game_id).await.unwrap();
        let handshake = subscription.handshake.unwrap();
        assert_eq!(handshake.event.as_deref(), Some("handshake"));
        assert!(handshake.data.contains(&game_id.to_string()));
        assert_eq!(state.hubs().hub(game_id).receiver_count(), 1);
    }
}
