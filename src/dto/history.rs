use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{FinalSeatEntity, GameActionEntity, GameLogEntity, GameSummaryEntity},
    dto::{format_system_time, game::GameView},
    state::{GameStatus, catalog::Alignment, game::EndReason},
};

/// Audit log line of a game.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameLogView {
    pub id: Uuid,
    pub event_type: String,
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    pub day_number: u32,
    pub phase: u32,
    pub created_at: String,
}

impl From<GameLogEntity> for GameLogView {
    fn from(entry: GameLogEntity) -> Self {
        Self {
            id: entry.id,
            event_type: entry.event_type,
            payload: entry.payload,
            day_number: entry.day_number,
            phase: entry.phase,
            created_at: format_system_time(entry.created_at),
        }
    }
}

/// Filters of the action log listing.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActionQuery {
    /// Calling user, the host or a seated player.
    pub user_id: Uuid,
    /// Most recent actions to return, 50 by default.
    pub limit: Option<usize>,
}

/// Body of an undo request.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UndoActionRequest {
    /// Calling user, must be the host.
    pub user_id: Uuid,
    #[validate(length(max = 200))]
    pub reason: Option<String>,
}

/// Entry of the action log.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameActionView {
    pub id: Uuid,
    pub action_type: String,
    #[schema(value_type = Object)]
    pub action_data: serde_json::Value,
    pub performed_by: Uuid,
    pub performed_at: String,
    pub is_undone: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undo_reason: Option<String>,
    pub status: GameStatus,
    pub phase: u32,
    pub day_number: u32,
}

impl From<GameActionEntity> for GameActionView {
    fn from(action: GameActionEntity) -> Self {
        Self {
            id: action.id,
            action_type: action.action_type,
            action_data: action.action_data,
            performed_by: action.performed_by,
            performed_at: format_system_time(action.performed_at),
            is_undone: action.is_undone,
            undo_reason: action.undo_reason,
            status: action.status,
            phase: action.phase,
            day_number: action.day_number,
        }
    }
}

/// Seat of a finished game.
#[derive(Debug, Serialize, ToSchema)]
pub struct FinalSeatView {
    pub user_id: Uuid,
    pub username: String,
    pub position: u32,
    pub role_id: Option<String>,
    pub is_alive: bool,
}

impl From<FinalSeatEntity> for FinalSeatView {
    fn from(seat: FinalSeatEntity) -> Self {
        Self {
            user_id: seat.user_id,
            username: seat.username,
            position: seat.position,
            role_id: seat.role_id,
            is_alive: seat.is_alive,
        }
    }
}

/// Outcome of a finished game.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameSummaryView {
    pub game_id: Uuid,
    pub host_id: Uuid,
    pub script_id: Option<String>,
    pub winner: Option<Alignment>,
    pub end_reason: Option<EndReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    pub ended_at: String,
    /// Seconds from start to end, absent for games ended in the lobby.
    pub duration_seconds: Option<u64>,
    pub total_days: u32,
    pub total_executions: u64,
    pub seats: Vec<FinalSeatView>,
    /// The whole game with every role revealed.
    pub final_state: GameView,
}

impl GameSummaryView {
    /// Pair a stored summary with the rendered final state.
    pub fn new(summary: GameSummaryEntity, final_state: GameView) -> Self {
        Self {
            game_id: summary.game_id,
            host_id: summary.host_id,
            script_id: summary.script_id,
            winner: summary.winner,
            end_reason: summary.end_reason,
            started_at: summary.started_at.map(format_system_time),
            ended_at: format_system_time(summary.ended_at),
            duration_seconds: summary.duration_seconds,
            total_days: summary.total_days,
            total_executions: summary.total_executions,
            seats: summary.seats.into_iter().map(Into::into).collect(),
            final_state,
        }
    }
}
