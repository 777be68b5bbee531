use std::{sync::Arc, time::SystemTime};

use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::{game_store::GameStore, models::GameLogEntity},
    dto::{
        format_system_time,
        sse::{GameEventEnvelope, Handshake, ServerEvent},
    },
    state::{SharedState, events::Notification, game::GameSession},
};

const EVENT_HANDSHAKE: &str = "handshake";

/// Append `notifications` to the game log and fan them out to the game's subscribers.
///
/// Both sinks are best effort: the change they describe is already stored, so failures are
/// logged and the remaining notifications still go out.
pub async fn publish_notifications(
    state: &SharedState,
    store: &Arc<dyn GameStore>,
    game: &GameSession,
    notifications: Vec<Notification>,
) {
    for notification in notifications {
        let event_type = notification.kind.as_str();
        let now = SystemTime::now();

        let entry = GameLogEntity {
            id: Uuid::new_v4(),
            game_id: game.id,
            event_type: event_type.to_string(),
            payload: notification.payload.clone(),
            day_number: game.day_number(),
            phase: game.phase(),
            created_at: now,
        };
        if let Err(err) = store.append_log(entry).await {
            warn!(
                game_id = %game.id,
                event = event_type,
                error = %err,
                "failed to append game log"
            );
        }

        let envelope = GameEventEnvelope {
            event_type: event_type.to_string(),
            game_id: game.id,
            day_number: game.day_number(),
            phase: game.phase(),
            payload: notification.payload,
            timestamp: format_system_time(now),
        };
        match ServerEvent::json(Some(event_type.to_string()), &envelope) {
            Ok(event) => state.hubs().broadcast(game.id, event),
            Err(err) => warn!(event = event_type, error = %err, "failed to serialize game event"),
        }
    }
}

/// First event sent to a freshly subscribed client, ahead of the game's broadcast events.
pub async fn handshake_event(state: &SharedState, game_id: Uuid) -> Option<ServerEvent> {
    let payload = Handshake {
        game_id,
        message: "subscribed to game events".into(),
        degraded: state.is_degraded().await,
    };
    ServerEvent::json(Some(EVENT_HANDSHAKE.to_string()), &payload)
        .inspect_err(|err| warn!(error = %err, "failed to serialize handshake"))
        .ok()
}
