use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    dto::{
        game::{
            AbilityUseView, ActionRequest, Audience, EndGameRequest, EffectRemovedResponse,
            GameView, KillRequest, KillResponse, NeighborsResponse, NominateRequest, NominationView,
            NotesRequest, StatusEffectRequest, StatusEffectView, VoteRequest, VoteView,
        },
        sse::{
            AbilityUsedEvent, GameEndedEvent, GameStartedEvent, PhaseChangedEvent,
            PlayerDiedEvent, PlayerNominatedEvent, PlayerResurrectedEvent,
            StatusEffectChangedEvent, VoteCastEvent,
        },
    },
    error::ServiceError,
    services::catalog_service,
    state::{
        EngineError, SharedState,
        assignment::RoleAssigner,
        events::{ActionKind, EventKind, Outbox},
        game::{EndReason, GameSession},
        transitions::run_game_mutation,
    },
};

/// Fail with [`ServiceError::Forbidden`] unless `user_id` hosts `game`.
pub(crate) fn ensure_host(
    game: &GameSession,
    user_id: Uuid,
    action: &str,
) -> Result<(), ServiceError> {
    if game.is_host(user_id) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!("only the host can {action}")))
    }
}

/// Player id of the seat `user_id` occupies.
fn seat_of(game: &GameSession, user_id: Uuid) -> Result<Uuid, ServiceError> {
    game.player_by_user(user_id)
        .map(|player| player.id)
        .ok_or_else(|| ServiceError::Forbidden(format!("user `{user_id}` is not seated")))
}

/// Game as seen by `viewer`.
pub async fn get_game(
    state: &SharedState,
    game_id: Uuid,
    viewer: Option<Uuid>,
) -> Result<GameView, ServiceError> {
    let game = state.read_game(game_id).await?;
    Ok(GameView::build(&game, Audience::of(&game, viewer)))
}

/// Assign roles and move to the first night.
pub async fn start_game(
    state: &SharedState,
    game_id: Uuid,
    user_id: Uuid,
) -> Result<GameView, ServiceError> {
    run_game_mutation(state, game_id, |game, outbox| {
        ensure_host(game, user_id, "start the game")?;
        game.ensure_not_ended()?;
        let key = game.script_id.clone().ok_or(EngineError::NoScript)?;
        let script = catalog_service::require_script(state, &key)?;
        game.start(&script, &mut RoleAssigner::from_os_rng())?;

        outbox.record(ActionKind::StartGame, user_id, &json!({ "script_id": script.id }));
        outbox.push(
            EventKind::GameStarted,
            &GameStartedEvent {
                player_count: game.players().len(),
                script_id: script.id.clone(),
                script_name: script.name.clone(),
            },
        );
        info!(%game_id, players = game.players().len(), script = %script.id, "game started");
        Ok(GameView::host(game))
    })
    .await
}

/// Move from night to day or from day to night.
pub async fn advance_phase(
    state: &SharedState,
    game_id: Uuid,
    user_id: Uuid,
) -> Result<GameView, ServiceError> {
    run_game_mutation(state, game_id, |game, outbox| {
        ensure_host(game, user_id, "advance the phase")?;
        let status = game.advance()?;
        outbox.record(
            ActionKind::AdvancePhase,
            user_id,
            &json!({ "status": status, "day_number": game.day_number() }),
        );
        outbox.push(
            EventKind::PhaseChanged,
            &PhaseChangedEvent {
                status,
                phase: game.phase(),
                day_number: game.day_number(),
            },
        );
        info!(%game_id, ?status, phase = game.phase(), day = game.day_number(), "phase advanced");
        Ok(GameView::host(game))
    })
    .await
}

/// End the game on the host's call.
pub async fn end_game(
    state: &SharedState,
    game_id: Uuid,
    request: EndGameRequest,
) -> Result<GameView, ServiceError> {
    run_game_mutation(state, game_id, |game, outbox| {
        ensure_host(game, request.user_id, "end the game")?;
        game.end(request.winner, EndReason::HostDecision)?;
        outbox.record(
            ActionKind::FinishGame,
            request.user_id,
            &json!({ "winner": request.winner }),
        );
        push_game_ended(outbox, game);
        info!(%game_id, winner = ?request.winner, "game ended by host");
        Ok(GameView::host(game))
    })
    .await
}

/// The caller nominates another player for execution.
pub async fn nominate(
    state: &SharedState,
    game_id: Uuid,
    request: NominateRequest,
) -> Result<NominationView, ServiceError> {
    run_game_mutation(state, game_id, |game, outbox| {
        let nominator_id = seat_of(game, request.user_id)?;
        let nomination = game.nominate(nominator_id, request.nominee_id)?;
        outbox.record(
            ActionKind::Nominate,
            request.user_id,
            &json!({ "nominator_id": nominator_id, "nominee_id": nomination.nominee_id }),
        );
        outbox.push(
            EventKind::PlayerNominated,
            &PlayerNominatedEvent {
                nominator_id: nomination.nominator_id,
                nominee_id: nomination.nominee_id,
                day_number: nomination.day_number,
            },
        );
        Ok(NominationView::from(&nomination))
    })
    .await
}

/// The caller spends their vote, or abstains with no target.
pub async fn cast_vote(
    state: &SharedState,
    game_id: Uuid,
    request: VoteRequest,
) -> Result<VoteView, ServiceError> {
    run_game_mutation(state, game_id, |game, outbox| {
        let voter_id = seat_of(game, request.user_id)?;
        let vote = game.cast_vote(voter_id, request.target_id, request.kind)?;
        let target_votes = match vote.target_id {
            Some(target) if game.settings.house_rules.show_vote_counts => Some(
                game.vote_ledger()
                    .tally(vote.day_number)
                    .get(&target)
                    .copied()
                    .unwrap_or_default(),
            ),
            _ => None,
        };
        outbox.record(
            ActionKind::Vote,
            request.user_id,
            &json!({ "voter_id": voter_id, "target_id": vote.target_id, "kind": vote.kind }),
        );
        outbox.push(
            EventKind::VoteCast,
            &VoteCastEvent {
                voter_id: vote.voter_id,
                target_id: vote.target_id,
                kind: vote.kind,
                day_number: vote.day_number,
                target_votes,
            },
        );
        Ok(VoteView::from(&vote))
    })
    .await
}

/// Kill a player. A kill that decides the game ends it immediately.
pub async fn kill_player(
    state: &SharedState,
    game_id: Uuid,
    player_id: Uuid,
    request: KillRequest,
) -> Result<KillResponse, ServiceError> {
    run_game_mutation(state, game_id, |game, outbox| {
        ensure_host(game, request.user_id, "kill players")?;
        let winner = game.kill(player_id)?;
        let kind = match request.cause.as_deref() {
            Some(cause) if cause.eq_ignore_ascii_case("execution") => ActionKind::Execute,
            _ => ActionKind::Kill,
        };
        outbox.record(
            kind,
            request.user_id,
            &json!({ "player_id": player_id, "cause": request.cause }),
        );
        outbox.push(
            EventKind::PlayerDied,
            &PlayerDiedEvent {
                player_id,
                cause: request.cause,
            },
        );
        info!(%game_id, %player_id, "player died");

        if let Some(winner) = winner {
            game.end(Some(winner), EndReason::WinCondition)?;
            push_game_ended(outbox, game);
            info!(%game_id, ?winner, "win condition reached");
        }
        Ok(KillResponse {
            player_id,
            winner,
            status: game.status(),
        })
    })
    .await
}

/// Bring a dead player back.
pub async fn resurrect_player(
    state: &SharedState,
    game_id: Uuid,
    player_id: Uuid,
    user_id: Uuid,
) -> Result<GameView, ServiceError> {
    run_game_mutation(state, game_id, |game, outbox| {
        ensure_host(game, user_id, "resurrect players")?;
        game.resurrect(player_id)?;
        outbox.record(ActionKind::Resurrect, user_id, &json!({ "player_id": player_id }));
        outbox.push(
            EventKind::PlayerResurrected,
            &PlayerResurrectedEvent { player_id },
        );
        Ok(GameView::host(game))
    })
    .await
}

/// Record a night ability use for a player.
pub async fn record_action(
    state: &SharedState,
    game_id: Uuid,
    player_id: Uuid,
    request: ActionRequest,
) -> Result<AbilityUseView, ServiceError> {
    run_game_mutation(state, game_id, |game, outbox| {
        ensure_host(game, request.user_id, "record abilities")?;
        let record = game.record_action(player_id, request.ability, request.target_id)?;
        outbox.record(
            ActionKind::UseAbility,
            request.user_id,
            &json!({
                "player_id": player_id,
                "ability": record.ability,
                "target_id": record.target_id,
                "night": record.night,
            }),
        );
        outbox.push(
            EventKind::AbilityUsed,
            &AbilityUsedEvent {
                player_id,
                night: record.night,
            },
        );
        Ok(AbilityUseView::from(&record))
    })
    .await
}

/// Place a status effect on a player.
pub async fn add_status_effect(
    state: &SharedState,
    game_id: Uuid,
    player_id: Uuid,
    request: StatusEffectRequest,
) -> Result<StatusEffectView, ServiceError> {
    run_game_mutation(state, game_id, |game, outbox| {
        ensure_host(game, request.user_id, "apply status effects")?;
        let effect =
            game.add_status_effect(player_id, request.name, request.duration, request.source)?;
        outbox.record(
            ActionKind::AddStatusEffect,
            request.user_id,
            &json!({ "player_id": player_id, "name": effect.name, "duration": effect.duration }),
        );
        outbox.push(
            EventKind::StatusEffectChanged,
            &StatusEffectChangedEvent {
                player_id,
                name: effect.name.clone(),
                applied: true,
            },
        );
        Ok(StatusEffectView::from(&effect))
    })
    .await
}

/// Take a status effect off a player, reporting whether it was there.
pub async fn remove_status_effect(
    state: &SharedState,
    game_id: Uuid,
    player_id: Uuid,
    name: String,
    user_id: Uuid,
) -> Result<EffectRemovedResponse, ServiceError> {
    run_game_mutation(state, game_id, |game, outbox| {
        ensure_host(game, user_id, "remove status effects")?;
        let removed = game.remove_status_effect(player_id, &name)?;
        if removed {
            outbox.record(
                ActionKind::RemoveStatusEffect,
                user_id,
                &json!({ "player_id": player_id, "name": name }),
            );
            outbox.push(
                EventKind::StatusEffectChanged,
                &StatusEffectChangedEvent {
                    player_id,
                    name,
                    applied: false,
                },
            );
        }
        Ok(EffectRemovedResponse { removed })
    })
    .await
}

/// Replace the host's private notes about a player. Nothing is broadcast.
pub async fn set_notes(
    state: &SharedState,
    game_id: Uuid,
    player_id: Uuid,
    request: NotesRequest,
) -> Result<GameView, ServiceError> {
    run_game_mutation(state, game_id, |game, _outbox| {
        ensure_host(game, request.user_id, "write notes")?;
        game.set_notes(player_id, request.notes)?;
        Ok(GameView::host(game))
    })
    .await
}

/// Seating neighbours of a player, all seats and alive seats.
pub async fn neighbors(
    state: &SharedState,
    game_id: Uuid,
    player_id: Uuid,
) -> Result<NeighborsResponse, ServiceError> {
    let game = state.read_game(game_id).await?;
    let around = game.neighbors(player_id)?;
    let alive = game.alive_neighbors(player_id)?;
    Ok(NeighborsResponse {
        player_id,
        left: around.map(|pair| pair.left.id),
        right: around.map(|pair| pair.right.id),
        alive_left: alive.map(|pair| pair.left.id),
        alive_right: alive.map(|pair| pair.right.id),
    })
}

fn push_game_ended(outbox: &mut Outbox, game: &GameSession) {
    outbox.push(
        EventKind::GameEnded,
        &GameEndedEvent {
            winner: game.winner,
            reason: game.end_reason.unwrap_or(EndReason::HostDecision),
        },
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::game_store::{GameStore, memory::MemoryGameStore},
        dto::{
            game::{CreateGameRequest, JoinGameRequest, SettingsOverrides},
            user::CreateUserRequest,
        },
        services::{lobby_service, user_service},
        state::{AppState, GameStatus, catalog::Alignment, catalog::Team, ledger::VoteKind},
    };

    struct Table {
        state: SharedState,
        store: Arc<MemoryGameStore>,
        game_id: Uuid,
        host: Uuid,
        guests: Vec<Uuid>,
    }

    async fn register(state: &SharedState, name: String) -> Uuid {
        user_service::register(state, CreateUserRequest { username: name })
            .await
            .unwrap()
            .id
    }

    /// Lobby with a host and `guests` ready players.
    async fn table(guests: usize) -> Table {
        let store = Arc::new(MemoryGameStore::new());
        let state = AppState::with_store(AppConfig::default(), store.clone()).await;
        let host = register(&state, "host".into()).await;
        let game = lobby_service::create_game(
            &state,
            CreateGameRequest {
                host_id: host,
                script_id: Some("trouble-brewing".into()),
                settings: SettingsOverrides::default(),
            },
        )
        .await
        .unwrap();

        let mut ids = Vec::new();
        for index in 0..guests {
            let guest = register(&state, format!("guest-{index}")).await;
            lobby_service::join_game(
                &state,
                JoinGameRequest {
                    join_code: game.join_code.clone(),
                    user_id: guest,
                },
            )
            .await
            .unwrap();
            lobby_service::toggle_ready(&state, game.id, guest).await.unwrap();
            ids.push(guest);
        }

        Table {
            state,
            store,
            game_id: game.id,
            host,
            guests: ids,
        }
    }

    async fn player_of(table: &Table, user_id: Uuid) -> Uuid {
        let game = table.state.read_game(table.game_id).await.unwrap();
        game.player_by_user(user_id).unwrap().id
    }

    #[tokio::test]
    async fn seven_players_start_with_the_standard_split() {
        let table = table(6).await;
        let view = start_game(&table.state, table.game_id, table.host)
            .await
            .unwrap();

        assert_eq!(view.status, GameStatus::Night);
        assert_eq!(view.phase, 1);
        assert_eq!(view.day_number, 0);
        let count = |team: Team| {
            view.players
                .iter()
                .filter(|player| player.role.as_ref().map(|role| role.team) == Some(team))
                .count()
        };
        assert_eq!(count(Team::Townsfolk), 5);
        assert_eq!(count(Team::Outsider), 0);
        assert_eq!(count(Team::Minion), 1);
        assert_eq!(count(Team::Demon), 1);
    }

    #[tokio::test]
    async fn start_is_host_only_and_needs_ready_players() {
        let table = table(3).await;
        let err = start_game(&table.state, table.game_id, table.guests[0])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = start_game(&table.state, table.game_id, table.host)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        let game = table.state.read_game(table.game_id).await.unwrap();
        assert_eq!(game.status(), GameStatus::Lobby);
        assert!(game.players().iter().all(|player| player.role.is_none()));
    }

    #[tokio::test]
    async fn nominations_and_votes_follow_the_day() {
        let table = table(6).await;
        start_game(&table.state, table.game_id, table.host).await.unwrap();
        let nominee = player_of(&table, table.guests[1]).await;

        let err = nominate(
            &table.state,
            table.game_id,
            NominateRequest {
                user_id: table.guests[0],
                nominee_id: nominee,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        advance_phase(&table.state, table.game_id, table.host).await.unwrap();
        let request = || NominateRequest {
            user_id: table.guests[0],
            nominee_id: nominee,
        };
        nominate(&table.state, table.game_id, request()).await.unwrap();
        let err = nominate(&table.state, table.game_id, request())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let vote = || VoteRequest {
            user_id: table.guests[2],
            target_id: Some(nominee),
            kind: VoteKind::Execution,
        };
        let cast = cast_vote(&table.state, table.game_id, vote()).await.unwrap();
        assert_eq!(cast.day_number, 1);
        let err = cast_vote(&table.state, table.game_id, vote()).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        // a new day clears nominations and restores votes
        advance_phase(&table.state, table.game_id, table.host).await.unwrap();
        let view = advance_phase(&table.state, table.game_id, table.host).await.unwrap();
        assert_eq!(view.day_number, 2);
        assert!(view.nominations.is_empty());
        nominate(&table.state, table.game_id, request()).await.unwrap();
        cast_vote(&table.state, table.game_id, vote()).await.unwrap();
    }

    #[tokio::test]
    async fn killing_the_demon_ends_the_game() {
        let table = table(6).await;
        start_game(&table.state, table.game_id, table.host).await.unwrap();
        let game = table.state.read_game(table.game_id).await.unwrap();
        let demon = game
            .players()
            .iter()
            .find(|player| player.role.as_ref().map(|role| role.team) == Some(Team::Demon))
            .unwrap()
            .id;

        let outcome = kill_player(
            &table.state,
            table.game_id,
            demon,
            KillRequest {
                user_id: table.host,
                cause: Some("execution".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(outcome.winner, Some(Alignment::Good));
        assert_eq!(outcome.status, GameStatus::Ended);

        let err = advance_phase(&table.state, table.game_id, table.host)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let host = table.store.find_user(table.host).await.unwrap().unwrap();
        assert_eq!(host.games_played, 1);
        let logs = table.store.list_logs(table.game_id).await.unwrap();
        let kinds: Vec<&str> = logs.iter().map(|entry| entry.event_type.as_str()).collect();
        assert_eq!(kinds[kinds.len() - 2..], ["player_died", "game_ended"]);
    }

    #[tokio::test]
    async fn ended_games_leave_memory_with_a_summary() {
        let table = table(6).await;
        start_game(&table.state, table.game_id, table.host).await.unwrap();
        assert_eq!(table.state.active_games(), 1);
        let game = table.state.read_game(table.game_id).await.unwrap();
        let victim = game
            .players()
            .iter()
            .find(|player| player.role.as_ref().map(|role| role.team) == Some(Team::Townsfolk))
            .unwrap()
            .id;
        kill_player(
            &table.state,
            table.game_id,
            victim,
            KillRequest {
                user_id: table.host,
                cause: Some("Execution".into()),
            },
        )
        .await
        .unwrap();

        end_game(
            &table.state,
            table.game_id,
            EndGameRequest {
                user_id: table.host,
                winner: Some(Alignment::Evil),
            },
        )
        .await
        .unwrap();
        assert_eq!(table.state.active_games(), 0);

        // reads of an ended game are served without caching it again
        let view = get_game(&table.state, table.game_id, None).await.unwrap();
        assert_eq!(view.status, GameStatus::Ended);
        let err = advance_phase(&table.state, table.game_id, table.host)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        assert_eq!(table.state.active_games(), 0);

        let summary = table.store.find_summary(table.game_id).await.unwrap().unwrap();
        assert_eq!(summary.winner, Some(Alignment::Evil));
        assert_eq!(summary.total_executions, 1);
        assert_eq!(summary.total_days, 0);
        assert_eq!(summary.participants.len(), 7);
        assert_eq!(summary.seats.iter().filter(|seat| !seat.is_alive).count(), 1);
        assert!(summary.duration_seconds.is_some());

        let actions = table.store.list_actions(table.game_id, 10).await.unwrap();
        let types: Vec<&str> = actions.iter().map(|action| action.action_type.as_str()).collect();
        assert_eq!(types, ["finish_game", "execute", "start_game"]);
    }

    #[tokio::test]
    async fn repeated_kills_and_living_resurrections_are_refused() {
        let table = table(6).await;
        start_game(&table.state, table.game_id, table.host).await.unwrap();
        let game = table.state.read_game(table.game_id).await.unwrap();
        let townsfolk = game
            .players()
            .iter()
            .find(|player| player.role.as_ref().map(|role| role.team) == Some(Team::Townsfolk))
            .unwrap()
            .id;
        let living = game
            .players()
            .iter()
            .find(|player| player.id != townsfolk)
            .unwrap()
            .id;
        let kill = || KillRequest {
            user_id: table.host,
            cause: None,
        };

        kill_player(&table.state, table.game_id, townsfolk, kill())
            .await
            .unwrap();
        let err = kill_player(&table.state, table.game_id, townsfolk, kill())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        let err = resurrect_player(&table.state, table.game_id, living, table.host)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let logs = table.store.list_logs(table.game_id).await.unwrap();
        let deaths = logs
            .iter()
            .filter(|entry| entry.event_type == "player_died")
            .count();
        assert_eq!(deaths, 1);
        assert!(logs.iter().all(|entry| entry.event_type != "player_resurrected"));
    }

    #[tokio::test]
    async fn host_tools_stay_with_the_host() {
        let table = table(6).await;
        start_game(&table.state, table.game_id, table.host).await.unwrap();
        let target = player_of(&table, table.guests[3]).await;

        let action = record_action(
            &table.state,
            table.game_id,
            target,
            ActionRequest {
                user_id: table.host,
                ability: "poison".into(),
                target_id: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(action.night, 1);

        add_status_effect(
            &table.state,
            table.game_id,
            target,
            StatusEffectRequest {
                user_id: table.host,
                name: "poisoned".into(),
                duration: Some(1),
                source: Some("poisoner".into()),
            },
        )
        .await
        .unwrap();
        let err = remove_status_effect(
            &table.state,
            table.game_id,
            target,
            "poisoned".into(),
            table.guests[0],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        let removed = remove_status_effect(
            &table.state,
            table.game_id,
            target,
            "poisoned".into(),
            table.host,
        )
        .await
        .unwrap();
        assert!(removed.removed);

        let view = set_notes(
            &table.state,
            table.game_id,
            target,
            NotesRequest {
                user_id: table.host,
                notes: "claims chef".into(),
            },
        )
        .await
        .unwrap();
        let seat = view.players.iter().find(|player| player.id == target).unwrap();
        assert_eq!(seat.notes.as_deref(), Some("claims chef"));

        let public = get_game(&table.state, table.game_id, Some(table.guests[0]))
            .await
            .unwrap();
        assert!(public.players.iter().all(|player| player.notes.is_none()));
    }

    #[tokio::test]
    async fn neighbours_wrap_around_the_table() {
        let table = table(4).await;
        let game = table.state.read_game(table.game_id).await.unwrap();
        let seats: Vec<Uuid> = game.players().iter().map(|player| player.id).collect();

        let around = neighbors(&table.state, table.game_id, seats[0]).await.unwrap();
        assert_eq!(around.left, Some(seats[4]));
        assert_eq!(around.right, Some(seats[1]));
        assert_eq!(around.alive_left, Some(seats[4]));
    }
}
