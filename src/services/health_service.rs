use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether storage is reachable, logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_game_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    let active_games = state.active_games();
    if state.is_degraded().await {
        HealthResponse::degraded(active_games)
    } else {
        HealthResponse::ok(active_games)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{config::AppConfig, dao::game_store::memory::MemoryGameStore, state::AppState};

    #[tokio::test]
    async fn degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        assert_eq!(health_status(&state).await.status, "degraded");

        state.set_game_store(Arc::new(MemoryGameStore::new())).await;
        assert_eq!(health_status(&state).await.status, "ok");
    }
}
