use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{dao::models::UserEntity, dto::format_system_time};

/// Payload used to register a new user.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateUserRequest {
    /// Display name, unique across the service. Surrounding whitespace is ignored.
    #[validate(length(min = 1, max = 32))]
    pub username: String,
}

/// Public profile of a user.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub games_played: u32,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

impl From<UserEntity> for UserSummary {
    fn from(user: UserEntity) -> Self {
        Self {
            id: user.id,
            username: user.username,
            games_played: user.games_played,
            created_at: format_system_time(user.created_at),
        }
    }
}
