use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{dto::sse::ServerEvent, services::sse_service::GameSubscription};

/// Push the events of one game to a WebSocket client until either side closes.
///
/// Every event goes out as a JSON text frame carrying the same envelope as the SSE stream.
/// Inbound text and binary frames are ignored, pings are answered.
pub async fn handle_socket(subscription: GameSubscription, socket: WebSocket) {
    let GameSubscription {
        game_id,
        mut receiver,
        handshake,
    } = subscription;
    let (mut sender, mut inbound) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    info!(%game_id, "game websocket connected");
    if let Some(handshake) = handshake {
        if send_event(&outbound_tx, handshake).is_err() {
            finalize(writer_task, outbound_tx).await;
            return;
        }
    }

    loop {
        tokio::select! {
            event = receiver.recv() => match event {
                Ok(event) => {
                    if send_event(&outbound_tx, event).is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(%game_id, skipped, "websocket subscriber lagged behind");
                }
                Err(RecvError::Closed) => break,
            },
            message = inbound.next() => match message {
                Some(Ok(Message::Ping(payload))) => {
                    let _ = outbound_tx.send(Message::Pong(payload));
                }
                Some(Ok(Message::Close(frame))) => {
                    let _ = outbound_tx.send(Message::Close(frame));
                    break;
                }
                Some(Ok(Message::Text(text))) => {
                    debug!(%game_id, payload = %text, "ignoring inbound websocket text");
                }
                Some(Ok(Message::Binary(_) | Message::Pong(_))) => {}
                Some(Err(err)) => {
                    warn!(%game_id, error = %err, "websocket error");
                    break;
                }
                None => break,
            },
        }
    }

    info!(%game_id, "game websocket disconnected");
    finalize(writer_task, outbound_tx).await;
}

/// Forward the already serialized envelope as a text frame.
fn send_event(tx: &mpsc::UnboundedSender<Message>, event: ServerEvent) -> Result<(), ()> {
    tx.send(Message::Text(event.data.into())).map_err(|_| ())
}

async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
