use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Clocktower Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::users::create_user,
        crate::routes::users::get_user,
        crate::routes::catalog::list_roles,
        crate::routes::catalog::get_role,
        crate::routes::catalog::list_scripts,
        crate::routes::catalog::get_script,
        crate::routes::catalog::create_script,
        crate::routes::catalog::update_script,
        crate::routes::catalog::delete_script,
        crate::routes::catalog::distribution,
        crate::routes::game::create_game,
        crate::routes::game::join_game,
        crate::routes::game::get_game,
        crate::routes::game::leave_game,
        crate::routes::game::toggle_ready,
        crate::routes::game::set_script,
        crate::routes::game::start_game,
        crate::routes::game::advance_phase,
        crate::routes::game::end_game,
        crate::routes::game::nominate,
        crate::routes::game::cast_vote,
        crate::routes::game::kill_player,
        crate::routes::game::resurrect_player,
        crate::routes::game::record_action,
        crate::routes::game::add_status_effect,
        crate::routes::game::remove_status_effect,
        crate::routes::game::set_notes,
        crate::routes::game::neighbors,
        crate::routes::history::history,
        crate::routes::history::save_state,
        crate::routes::history::list_states,
        crate::routes::history::load_state,
        crate::routes::history::summary,
        crate::routes::history::user_history,
        crate::routes::history::list_actions,
        crate::routes::history::undo_action,
        crate::routes::sse::game_stream,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::user::CreateUserRequest,
            crate::dto::user::UserSummary,
            crate::dto::catalog::RoleSummary,
            crate::dto::catalog::ScriptSummary,
            crate::dto::catalog::TeamRoles,
            crate::dto::catalog::ScriptDetail,
            crate::dto::catalog::DistributionResponse,
            crate::dto::catalog::CreateScriptRequest,
            crate::dto::catalog::UpdateScriptRequest,
            crate::dto::game::CallerRequest,
            crate::dto::game::HouseRulesOverrides,
            crate::dto::game::SettingsOverrides,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::JoinGameRequest,
            crate::dto::game::SetScriptRequest,
            crate::dto::game::EndGameRequest,
            crate::dto::game::NominateRequest,
            crate::dto::game::VoteRequest,
            crate::dto::game::KillRequest,
            crate::dto::game::ActionRequest,
            crate::dto::game::StatusEffectRequest,
            crate::dto::game::NotesRequest,
            crate::dto::game::RevealedRole,
            crate::dto::game::AbilityUseView,
            crate::dto::game::StatusEffectView,
            crate::dto::game::PlayerView,
            crate::dto::game::NominationView,
            crate::dto::game::VoteView,
            crate::dto::game::GameView,
            crate::dto::game::KillResponse,
            crate::dto::game::EffectRemovedResponse,
            crate::dto::game::NeighborsResponse,
            crate::dto::history::GameLogView,
            crate::dto::history::UndoActionRequest,
            crate::dto::history::GameActionView,
            crate::dto::history::FinalSeatView,
            crate::dto::history::GameSummaryView,
            crate::dto::snapshot::SaveSnapshotRequest,
            crate::dto::snapshot::SnapshotSummary,
            crate::dto::sse::Handshake,
            crate::dto::sse::GameEventEnvelope,
            crate::dto::sse::GameCreatedEvent,
            crate::dto::sse::PlayerJoinedEvent,
            crate::dto::sse::PlayerLeftEvent,
            crate::dto::sse::PlayerReadyChangedEvent,
            crate::dto::sse::HostTransferredEvent,
            crate::dto::sse::ScriptChangedEvent,
            crate::dto::sse::GameStartedEvent,
            crate::dto::sse::PhaseChangedEvent,
            crate::dto::sse::PlayerNominatedEvent,
            crate::dto::sse::VoteCastEvent,
            crate::dto::sse::PlayerDiedEvent,
            crate::dto::sse::PlayerResurrectedEvent,
            crate::dto::sse::AbilityUsedEvent,
            crate::dto::sse::StatusEffectChangedEvent,
            crate::dto::sse::GameEndedEvent,
            crate::dto::sse::SnapshotEvent,
            crate::dto::sse::ActionUndoneEvent,
            crate::state::catalog::Team,
            crate::state::catalog::Alignment,
            crate::state::catalog::Edition,
            crate::state::distribution::TeamCounts,
            crate::state::game::HouseRules,
            crate::state::game::GameSettings,
            crate::state::game::EndReason,
            crate::state::ledger::VoteKind,
            crate::state::state_machine::GameStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "User registration"),
        (name = "catalog", description = "Roles, scripts, custom scripts and team distribution"),
        (name = "lobby", description = "Creating, joining and configuring games"),
        (name = "game", description = "Phase flow, nominations and votes"),
        (name = "players", description = "Storyteller tools acting on one player"),
        (name = "history", description = "Audit and action logs, saved states and summaries"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "websocket", description = "WebSocket event streams"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_game_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/games",
            "/games/{id}/vote",
            "/games/{id}/players/{player_id}/effects/{name}",
            "/games/{id}/states/{state_id}/load",
            "/scripts/{id}/distribution/{player_count}",
            "/games/{id}/actions/{action_id}/undo",
            "/users/{id}/game-history",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
    }
}
