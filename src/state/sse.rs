use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dto::sse::ServerEvent;

/// Broadcast hubs keyed by game, created on first use.
pub struct GameHubs {
    hubs: DashMap<Uuid, Arc<SseHub>>,
    capacity: usize,
}

impl GameHubs {
    /// Build an empty registry; every hub gets `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            hubs: DashMap::new(),
            capacity,
        }
    }

    /// Hub for `game_id`, creating it when nobody has listened or published yet.
    pub fn hub(&self, game_id: Uuid) -> Arc<SseHub> {
        self.hubs
            .entry(game_id)
            .or_insert_with(|| Arc::new(SseHub::new(self.capacity)))
            .clone()
    }

    /// Publish to the hub of `game_id` if one exists.
    pub fn broadcast(&self, game_id: Uuid, event: ServerEvent) {
        if let Some(hub) = self.hubs.get(&game_id) {
            hub.broadcast(event);
        }
    }

    /// Drop the hub of a finished game once it has no listeners left.
    pub fn release_if_idle(&self, game_id: Uuid) {
        self.hubs
            .remove_if(&game_id, |_, hub| hub.receiver_count() == 0);
    }
}

/// Simple broadcast hub wrapper used by the SSE and WebSocket services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
