use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::{
    GameStatus,
    catalog::Alignment,
    game::EndReason,
    ledger::VoteKind,
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE and WebSocket channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to a client when it subscribes to a game.
pub struct Handshake {
    pub game_id: Uuid,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Envelope of every game notification, identical on SSE, WebSocket and in the audit log.
pub struct GameEventEnvelope {
    pub event_type: String,
    pub game_id: Uuid,
    pub day_number: u32,
    pub phase: u32,
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    /// RFC 3339 timestamp.
    pub timestamp: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GameCreatedEvent {
    pub host_id: Uuid,
    pub join_code: String,
    pub script_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerJoinedEvent {
    pub player_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub position: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerLeftEvent {
    pub user_id: Uuid,
    /// Vacated seat, absent when the host left a started game.
    pub player_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerReadyChangedEvent {
    pub player_id: Uuid,
    pub is_ready: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HostTransferredEvent {
    pub previous_host_id: Uuid,
    pub new_host_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScriptChangedEvent {
    pub script_id: String,
    pub script_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GameStartedEvent {
    pub player_count: usize,
    pub script_id: String,
    pub script_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast whenever the game moves between night and day.
pub struct PhaseChangedEvent {
    pub status: GameStatus,
    pub phase: u32,
    pub day_number: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerNominatedEvent {
    pub nominator_id: Uuid,
    pub nominee_id: Uuid,
    pub day_number: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VoteCastEvent {
    pub voter_id: Uuid,
    pub target_id: Option<Uuid>,
    pub kind: VoteKind,
    pub day_number: u32,
    /// Votes the target received today, only when the table shows vote counts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_votes: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerDiedEvent {
    pub player_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerResurrectedEvent {
    pub player_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
/// The ability itself stays with the host; only the fact that it was used is broadcast.
pub struct AbilityUsedEvent {
    pub player_id: Uuid,
    pub night: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusEffectChangedEvent {
    pub player_id: Uuid,
    pub name: String,
    /// `true` when added, `false` when removed.
    pub applied: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GameEndedEvent {
    pub winner: Option<Alignment>,
    pub reason: EndReason,
}

#[derive(Debug, Serialize, ToSchema)]
/// Emitted for both saved and loaded snapshots.
pub struct SnapshotEvent {
    pub snapshot_id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActionUndoneEvent {
    pub action_id: Uuid,
    pub action_type: String,
    pub reason: String,
}
