use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::UserEntity,
    dto::user::{CreateUserRequest, UserSummary},
    error::ServiceError,
    state::SharedState,
};

/// Register a user under a unique, trimmed username.
pub async fn register(
    state: &SharedState,
    request: CreateUserRequest,
) -> Result<UserSummary, ServiceError> {
    let username = request.username.trim().to_string();
    if username.is_empty() {
        return Err(ServiceError::InvalidInput("username must not be blank".into()));
    }

    let store = state.require_game_store().await?;
    let user = UserEntity {
        id: Uuid::new_v4(),
        username,
        games_played: 0,
        created_at: SystemTime::now(),
    };
    store.create_user(user.clone()).await?;
    info!(user_id = %user.id, username = %user.username, "registered user");
    Ok(user.into())
}

/// Fetch a user profile.
pub async fn get_user(state: &SharedState, user_id: Uuid) -> Result<UserSummary, ServiceError> {
    Ok(require_user(state, user_id).await?.into())
}

/// Load `user_id` or fail with [`ServiceError::NotFound`].
pub(crate) async fn require_user(
    state: &SharedState,
    user_id: Uuid,
) -> Result<UserEntity, ServiceError> {
    let store = state.require_game_store().await?;
    store
        .find_user(user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user `{user_id}` not found")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{config::AppConfig, dao::game_store::memory::MemoryGameStore, state::AppState};

    async fn state() -> SharedState {
        AppState::with_store(AppConfig::default(), Arc::new(MemoryGameStore::new())).await
    }

    fn request(username: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.into(),
        }
    }

    #[tokio::test]
    async fn usernames_are_trimmed_and_unique() {
        let state = state().await;
        let user = register(&state, request("  alice ")).await.unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.games_played, 0);

        let err = register(&state, request("alice")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        let err = register(&state, request("   ")).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn unknown_users_are_not_found() {
        let state = state().await;
        let err = get_user(&state, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn registration_needs_storage() {
        let state = AppState::new(AppConfig::default());
        let err = register(&state, request("bob")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
    }
}
