use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::SnapshotSummaryEntity, dto::format_system_time, state::GameStatus,
};

/// Host request to save the current game under a name.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SaveSnapshotRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 64))]
    pub name: String,
}

/// Saved game state without the game copy itself.
#[derive(Debug, Serialize, ToSchema)]
pub struct SnapshotSummary {
    pub id: Uuid,
    pub game_id: Uuid,
    pub name: String,
    pub saved_by: Uuid,
    pub created_at: String,
    pub status: GameStatus,
    pub day_number: u32,
    pub phase: u32,
}

impl From<SnapshotSummaryEntity> for SnapshotSummary {
    fn from(entity: SnapshotSummaryEntity) -> Self {
        Self {
            id: entity.id,
            game_id: entity.game_id,
            name: entity.name,
            saved_by: entity.saved_by,
            created_at: format_system_time(entity.created_at),
            status: entity.status,
            day_number: entity.day_number,
            phase: entity.phase,
        }
    }
}
