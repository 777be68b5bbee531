use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{models::GameEntity, storage::StorageError},
    dto::{
        game::{Audience, CreateGameRequest, GameView, JoinGameRequest, SetScriptRequest},
        sse::{
            GameCreatedEvent, GameEndedEvent, HostTransferredEvent, PlayerJoinedEvent,
            PlayerLeftEvent, PlayerReadyChangedEvent, ScriptChangedEvent,
        },
    },
    error::ServiceError,
    services::{catalog_service, game_service::ensure_host, sse_events, user_service},
    state::{
        SharedState,
        events::{EventKind, Outbox},
        game::{EndReason, GameSession, generate_join_code, normalize_join_code},
        transitions::run_game_mutation,
    },
};

/// Join codes are random; a collision with a stored game simply draws again.
const JOIN_CODE_ATTEMPTS: usize = 8;

/// Open a lobby hosted by `request.host_id`, who takes the first seat.
pub async fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<GameView, ServiceError> {
    let host = user_service::require_user(state, request.host_id).await?;
    let script_id = request
        .script_id
        .as_deref()
        .map(|key| catalog_service::require_script(state, key).map(|script| script.id.clone()))
        .transpose()?;
    let settings = request
        .settings
        .merge_into(state.config().default_settings);
    let store = state.require_game_store().await?;

    let mut created = None;
    for attempt in 1..=JOIN_CODE_ATTEMPTS {
        let join_code = generate_join_code(&mut rand::rng());
        let game = GameSession::new(
            host.id,
            host.username.clone(),
            join_code,
            script_id.clone(),
            settings,
        );
        let save = store.save_game(GameEntity::from(&game));
        let saved = match state.mutation_timeout() {
            Some(limit) => timeout(limit, save)
                .await
                .map_err(|_| ServiceError::Timeout)?,
            None => save.await,
        };
        match saved {
            Ok(()) => {
                created = Some(game);
                break;
            }
            Err(StorageError::Conflict(_)) => {
                warn!(attempt, "join code collision; drawing another one");
            }
            Err(err) => return Err(err.into()),
        }
    }
    let game = created
        .ok_or_else(|| ServiceError::Conflict("could not allocate a unique join code".into()))?;

    let game_id = game.id;
    state.insert_game(game);
    let guard = state.lock_game(game_id).await?;
    let mut outbox = Outbox::new();
    outbox.push(
        EventKind::GameCreated,
        &GameCreatedEvent {
            host_id: guard.host_id,
            join_code: guard.join_code.clone(),
            script_id: guard.script_id.clone(),
        },
    );
    sse_events::publish_notifications(state, &store, &guard, outbox.into_inner()).await;
    info!(%game_id, host_id = %guard.host_id, join_code = %guard.join_code, "game created");
    Ok(GameView::host(&guard))
}

/// Take a seat in the lobby identified by `request.join_code`.
pub async fn join_game(
    state: &SharedState,
    request: JoinGameRequest,
) -> Result<GameView, ServiceError> {
    let user = user_service::require_user(state, request.user_id).await?;
    let code = normalize_join_code(&request.join_code);
    let store = state.require_game_store().await?;
    let game_id = store
        .find_game_by_code(code.clone())
        .await?
        .map(|entity| entity.id)
        .ok_or_else(|| ServiceError::NotFound(format!("no game with join code `{code}`")))?;

    run_game_mutation(state, game_id, |game, outbox| {
        let player = game.seat(user.id, user.username)?;
        outbox.push(
            EventKind::PlayerJoined,
            &PlayerJoinedEvent {
                player_id: player.id,
                user_id: player.user_id,
                username: player.username.clone(),
                position: player.position,
            },
        );
        info!(%game_id, player_id = %player.id, "player joined");
        Ok(GameView::build(game, Audience::Player(user.id)))
    })
    .await
}

/// Leave a game. In a started game only the host may leave, which ends it.
pub async fn leave_game(
    state: &SharedState,
    game_id: Uuid,
    user_id: Uuid,
) -> Result<GameView, ServiceError> {
    run_game_mutation(state, game_id, |game, outbox| {
        let previous_host_id = game.host_id;
        let outcome = game.unseat(user_id)?;
        outbox.push(
            EventKind::PlayerLeft,
            &PlayerLeftEvent {
                user_id,
                player_id: outcome.removed.as_ref().map(|player| player.id),
            },
        );
        if let Some(new_host_id) = outcome.new_host {
            outbox.push(
                EventKind::HostTransferred,
                &HostTransferredEvent {
                    previous_host_id,
                    new_host_id,
                },
            );
            info!(%game_id, %new_host_id, "host transferred");
        }
        if outcome.ends_game {
            game.end(None, EndReason::HostLeft)?;
            outbox.push(
                EventKind::GameEnded,
                &GameEndedEvent {
                    winner: None,
                    reason: EndReason::HostLeft,
                },
            );
            info!(%game_id, "host left; game ended");
        }
        Ok(GameView::build(game, Audience::Public))
    })
    .await
}

/// Flip the caller's ready flag.
pub async fn toggle_ready(
    state: &SharedState,
    game_id: Uuid,
    user_id: Uuid,
) -> Result<GameView, ServiceError> {
    run_game_mutation(state, game_id, |game, outbox| {
        let is_ready = game.toggle_ready(user_id)?;
        if let Some(player) = game.player_by_user(user_id) {
            outbox.push(
                EventKind::PlayerReadyChanged,
                &PlayerReadyChangedEvent {
                    player_id: player.id,
                    is_ready,
                },
            );
        }
        Ok(GameView::build(game, Audience::of(game, Some(user_id))))
    })
    .await
}

/// Choose the script the lobby will play.
pub async fn set_script(
    state: &SharedState,
    game_id: Uuid,
    request: SetScriptRequest,
) -> Result<GameView, ServiceError> {
    let script = catalog_service::require_script(state, &request.script_id)?;
    run_game_mutation(state, game_id, |game, outbox| {
        ensure_host(game, request.user_id, "choose the script")?;
        game.set_script(&script)?;
        outbox.push(
            EventKind::ScriptChanged,
            &ScriptChangedEvent {
                script_id: script.id.clone(),
                script_name: script.name.clone(),
            },
        );
        Ok(GameView::host(game))
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::game_store::{GameStore, memory::MemoryGameStore},
        dto::{game::SettingsOverrides, user::CreateUserRequest},
        state::{AppState, GameStatus},
    };

    async fn setup() -> (SharedState, Arc<MemoryGameStore>) {
        let store = Arc::new(MemoryGameStore::new());
        let state = AppState::with_store(AppConfig::default(), store.clone()).await;
        (state, store)
    }

    async fn user(state: &SharedState, name: &str) -> Uuid {
        user_service::register(
            state,
            CreateUserRequest {
                username: name.into(),
            },
        )
        .await
        .unwrap()
        .id
    }

    async fn lobby(state: &SharedState, host: Uuid) -> GameView {
        create_game(
            state,
            CreateGameRequest {
                host_id: host,
                script_id: Some("Trouble Brewing".into()),
                settings: SettingsOverrides {
                    max_players: Some(5),
                    ..Default::default()
                },
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn created_game_seats_the_host() {
        let (state, store) = setup().await;
        let host = user(&state, "host").await;
        let game = lobby(&state, host).await;

        assert_eq!(game.status, GameStatus::Lobby);
        assert_eq!(game.join_code.len(), 6);
        assert_eq!(game.script_id.as_deref(), Some("trouble-brewing"));
        assert_eq!(game.settings.max_players, 5);
        assert_eq!(game.players.len(), 1);
        assert!(game.players[0].is_ready);

        let logs = store.list_logs(game.id).await.unwrap();
        assert_eq!(logs[0].event_type, "game_created");
    }

    #[tokio::test]
    async fn unknown_script_is_rejected() {
        let (state, _) = setup().await;
        let host = user(&state, "host").await;
        let err = create_game(
            &state,
            CreateGameRequest {
                host_id: host,
                script_id: Some("no-such-script".into()),
                settings: SettingsOverrides::default(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn join_codes_ignore_case_and_whitespace() {
        let (state, _) = setup().await;
        let host = user(&state, "host").await;
        let guest = user(&state, "guest").await;
        let game = lobby(&state, host).await;

        let view = join_game(
            &state,
            JoinGameRequest {
                join_code: format!("  {} ", game.join_code.to_lowercase()),
                user_id: guest,
            },
        )
        .await
        .unwrap();
        assert_eq!(view.players.len(), 2);
        assert_eq!(view.players[1].position, 1);
        assert!(!view.players[1].is_ready);

        let err = join_game(
            &state,
            JoinGameRequest {
                join_code: game.join_code.clone(),
                user_id: guest,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn full_lobbies_reject_players() {
        let (state, _) = setup().await;
        let host = user(&state, "host").await;
        let game = lobby(&state, host).await;
        for index in 0..4 {
            let guest = user(&state, &format!("guest-{index}")).await;
            join_game(
                &state,
                JoinGameRequest {
                    join_code: game.join_code.clone(),
                    user_id: guest,
                },
            )
            .await
            .unwrap();
        }

        let late = user(&state, "late").await;
        let err = join_game(
            &state,
            JoinGameRequest {
                join_code: game.join_code.clone(),
                user_id: late,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn host_leaving_the_lobby_hands_over() {
        let (state, store) = setup().await;
        let host = user(&state, "host").await;
        let guest = user(&state, "guest").await;
        let game = lobby(&state, host).await;
        join_game(
            &state,
            JoinGameRequest {
                join_code: game.join_code.clone(),
                user_id: guest,
            },
        )
        .await
        .unwrap();

        let view = leave_game(&state, game.id, host).await.unwrap();
        assert_eq!(view.host_id, guest);
        assert_eq!(view.players.len(), 1);
        assert_eq!(view.players[0].position, 0);

        let view = leave_game(&state, game.id, guest).await.unwrap();
        assert_eq!(view.status, GameStatus::Ended);
        let kinds: Vec<String> = store
            .list_logs(game.id)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.event_type)
            .collect();
        assert!(kinds.contains(&"host_transferred".to_string()));
        assert_eq!(kinds.last().map(String::as_str), Some("game_ended"));
    }

    #[tokio::test]
    async fn only_the_host_picks_the_script() {
        let (state, _) = setup().await;
        let host = user(&state, "host").await;
        let guest = user(&state, "guest").await;
        let game = lobby(&state, host).await;
        join_game(
            &state,
            JoinGameRequest {
                join_code: game.join_code.clone(),
                user_id: guest,
            },
        )
        .await
        .unwrap();

        let err = set_script(
            &state,
            game.id,
            SetScriptRequest {
                user_id: guest,
                script_id: "trouble-brewing".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let view = toggle_ready(&state, game.id, guest).await.unwrap();
        assert!(view.players[1].is_ready);
    }
}
