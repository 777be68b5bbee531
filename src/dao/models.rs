use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::state::{
    catalog::Alignment,
    game::{AbilityUse, EndReason, GameSettings, StatusEffect},
    ledger::{Nomination, Vote},
    state_machine::GameStatus,
};

/// Registered user of the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// Stable identifier for the user.
    pub id: Uuid,
    /// Unique display name.
    pub username: String,
    /// Number of finished games the user took part in.
    pub games_played: u32,
    /// When the user registered.
    pub created_at: SystemTime,
}

/// Seat persisted as part of a game document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Seat identifier, distinct from the user id.
    pub id: Uuid,
    /// User sitting in this seat.
    pub user_id: Uuid,
    /// Username at the time of joining.
    pub username: String,
    /// Seat order around the table, starting at 0.
    pub position: u32,
    /// Whether the player is still alive.
    pub is_alive: bool,
    /// Ready flag used in the lobby.
    pub is_ready: bool,
    /// Votes left, a dead player keeps one.
    pub votes_remaining: u8,
    /// When the player took the seat.
    pub joined_at: SystemTime,
    /// When the player died, if dead.
    pub died_at: Option<SystemTime>,
    /// Character id of the assigned role, resolved through the catalog on load.
    pub role_id: Option<String>,
    /// Night abilities the host recorded.
    #[serde(default)]
    pub abilities_used: Vec<AbilityUse>,
    /// Effects such as poisoned or drunk.
    #[serde(default)]
    pub status_effects: Vec<StatusEffect>,
    /// Private host notes.
    #[serde(default)]
    pub notes: String,
}

/// Aggregate game entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Uppercase code players use to join.
    pub join_code: String,
    /// User id of the host.
    pub host_id: Uuid,
    /// Script picked for the game.
    pub script_id: Option<String>,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Phase counter, one per night or day.
    pub phase: u32,
    /// Current day, 0 before the first day.
    pub day_number: u32,
    /// Winning team once decided.
    pub winner: Option<Alignment>,
    /// Why the game ended.
    #[serde(default)]
    pub end_reason: Option<EndReason>,
    /// Settings fixed at creation.
    pub settings: GameSettings,
    /// Open nominations for the current day.
    #[serde(default)]
    pub nominations: Vec<Nomination>,
    /// Every vote cast in this game.
    #[serde(default)]
    pub votes: Vec<Vote>,
    /// Seated players.
    pub players: Vec<PlayerEntity>,
    /// When the lobby was opened.
    pub created_at: SystemTime,
    /// When roles were dealt.
    pub started_at: Option<SystemTime>,
    /// When the game ended.
    pub ended_at: Option<SystemTime>,
    /// Last time the game entity was updated.
    pub updated_at: SystemTime,
}

/// Audit log line recorded for every notification a game emits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameLogEntity {
    /// Primary key of the entry.
    pub id: Uuid,
    /// Game the entry belongs to.
    pub game_id: Uuid,
    /// Event vocabulary name, e.g. `phase_changed`.
    pub event_type: String,
    /// Event body as published.
    pub payload: serde_json::Value,
    /// Day at the time of the event.
    pub day_number: u32,
    /// Phase at the time of the event.
    pub phase: u32,
    /// When the event was recorded.
    pub created_at: SystemTime,
}

/// Named, independent copy of a game at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotEntity {
    /// Primary key of the snapshot.
    pub id: Uuid,
    /// Game the snapshot was taken from.
    pub game_id: Uuid,
    /// Label chosen by the host.
    pub name: String,
    /// User id of whoever saved the snapshot.
    pub saved_by: Uuid,
    /// When the snapshot was saved.
    pub created_at: SystemTime,
    /// Full copy of the game.
    pub game: GameEntity,
}

/// Snapshot metadata without the game copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotSummaryEntity {
    /// Primary key of the snapshot.
    pub id: Uuid,
    /// Game the snapshot was taken from.
    pub game_id: Uuid,
    /// Label chosen by the host.
    pub name: String,
    /// User id of whoever saved the snapshot.
    pub saved_by: Uuid,
    /// When the snapshot was saved.
    pub created_at: SystemTime,
    /// Status of the saved game.
    pub status: GameStatus,
    /// Day of the saved game.
    pub day_number: u32,
    /// Phase of the saved game.
    pub phase: u32,
}

impl From<&SnapshotEntity> for SnapshotSummaryEntity {
    fn from(entity: &SnapshotEntity) -> Self {
        Self {
            id: entity.id,
            game_id: entity.game_id,
            name: entity.name.clone(),
            saved_by: entity.saved_by,
            created_at: entity.created_at,
            status: entity.game.status,
            day_number: entity.game.day_number,
            phase: entity.game.phase,
        }
    }
}

/// Custom script persisted so it survives restarts. Official scripts are never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScriptEntity {
    /// Slug derived from the name when the script was created. Never changes.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Username of the author at creation time.
    pub author: String,
    /// Owner of the script.
    pub author_id: Option<Uuid>,
    /// Free text shown in listings.
    pub description: String,
    /// Smallest supported table.
    pub player_count_min: usize,
    /// Largest supported table.
    pub player_count_max: usize,
    /// Character ids in display order.
    pub roles: Vec<String>,
    /// Last time the script was written.
    pub updated_at: SystemTime,
}

/// Host-visible record of a game-changing action, kept so it can be reviewed and undone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameActionEntity {
    /// Primary key of the action.
    pub id: Uuid,
    /// Game the action belongs to.
    pub game_id: Uuid,
    /// Action vocabulary name, e.g. `execute`.
    pub action_type: String,
    /// Request details of the action.
    pub action_data: serde_json::Value,
    /// User id of whoever performed the action.
    pub performed_by: Uuid,
    /// When the action was committed.
    pub performed_at: SystemTime,
    /// Set once the host undoes the action.
    pub is_undone: bool,
    /// Why the action was undone.
    #[serde(default)]
    pub undo_reason: Option<String>,
    /// Game status after the action.
    pub status: GameStatus,
    /// Phase after the action.
    pub phase: u32,
    /// Day after the action.
    pub day_number: u32,
}

/// Seat as it stood when the game ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinalSeatEntity {
    /// User who held the seat.
    pub user_id: Uuid,
    /// Username at the time of the game.
    pub username: String,
    /// Seat order around the table.
    pub position: u32,
    /// Character id the player held at the end.
    pub role_id: Option<String>,
    /// Whether the player survived.
    pub is_alive: bool,
}

/// Record written once when a game ends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSummaryEntity {
    /// Id of the finished game, also the key of the summary.
    pub game_id: Uuid,
    /// User id of the host.
    pub host_id: Uuid,
    /// Script the game was played with.
    pub script_id: Option<String>,
    /// Winning team, if any.
    pub winner: Option<Alignment>,
    /// Why the game ended.
    pub end_reason: Option<EndReason>,
    /// When roles were dealt, `None` for games ended in the lobby.
    pub started_at: Option<SystemTime>,
    /// When the game ended.
    pub ended_at: SystemTime,
    /// Seconds between start and end, `None` for games ended in the lobby.
    pub duration_seconds: Option<u64>,
    /// Day the game ended on.
    pub total_days: u32,
    /// Executions recorded in the action log and not undone.
    pub total_executions: u64,
    /// User ids of the host and every seated player.
    pub participants: Vec<Uuid>,
    /// Final seats in table order.
    pub seats: Vec<FinalSeatEntity>,
    /// Complete game as it stood at the end.
    pub final_state: GameEntity,
}
