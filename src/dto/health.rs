use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Games currently held in memory.
    pub active_games: usize,
}

impl HealthResponse {
    pub fn ok(active_games: usize) -> Self {
        Self {
            status: "ok".to_string(),
            active_games,
        }
    }

    /// Storage is unreachable; requests touching it answer 503.
    pub fn degraded(active_games: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            active_games,
        }
    }
}
