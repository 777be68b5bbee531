use std::{sync::Arc, time::SystemTime};

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::ScriptEntity,
    dto::catalog::{
        CreateScriptRequest, DistributionResponse, RoleQuery, RoleSummary, ScriptDetail,
        ScriptSummary, UpdateScriptRequest,
    },
    error::ServiceError,
    services::user_service,
    state::{
        EngineError, SharedState,
        catalog::{Script, ScriptDefinition, script_slug},
        distribution::{DistributionTable, MAX_PLAYERS, MIN_PLAYERS},
    },
};

/// List roles, optionally filtered by edition and team.
pub fn list_roles(state: &SharedState, query: &RoleQuery) -> Vec<RoleSummary> {
    state
        .catalog()
        .roles()
        .filter(|role| query.edition.is_none_or(|edition| role.edition == edition))
        .filter(|role| query.team.is_none_or(|team| role.team == team))
        .map(RoleSummary::from)
        .collect()
}

/// Reference data of one character.
pub fn get_role(state: &SharedState, character_id: &str) -> Result<RoleSummary, ServiceError> {
    state
        .catalog()
        .role(character_id)
        .map(RoleSummary::from)
        .ok_or_else(|| EngineError::UnknownRole(character_id.to_string()).into())
}

/// Every script, official ones first.
pub fn list_scripts(state: &SharedState) -> Vec<ScriptSummary> {
    state
        .catalog()
        .scripts()
        .iter()
        .map(|script| ScriptSummary::from(script.as_ref()))
        .collect()
}

/// Script with its roles grouped by team.
pub fn get_script(state: &SharedState, key: &str) -> Result<ScriptDetail, ServiceError> {
    Ok(require_script(state, key)?.as_ref().into())
}

/// Team counts for `player_count` and whether the script can supply them.
pub fn distribution(
    state: &SharedState,
    key: &str,
    player_count: usize,
) -> Result<DistributionResponse, ServiceError> {
    let script = require_script(state, key)?;
    let counts = DistributionTable::lookup(player_count)?;
    Ok(DistributionResponse {
        script_id: script.id.clone(),
        player_count,
        counts,
        supported: script.supports(player_count),
    })
}

/// Create a custom script owned by `request.user_id`. Its id is the slug of its name.
pub async fn create_script(
    state: &SharedState,
    request: CreateScriptRequest,
) -> Result<ScriptDetail, ServiceError> {
    let author = user_service::require_user(state, request.user_id).await?;
    let id = script_slug(&request.name);
    if id.is_empty() {
        return Err(EngineError::InvalidScript("name needs a letter or a digit".into()).into());
    }

    let _writes = state.lock_scripts().await;
    if state.catalog().script(&id).is_some() {
        return Err(EngineError::ScriptNameTaken(request.name).into());
    }
    let script = state.catalog().prepare_script(ScriptDefinition {
        id,
        name: request.name,
        author: author.username,
        author_id: Some(author.id),
        description: request.description,
        player_count_min: request.player_count_min.unwrap_or(MIN_PLAYERS),
        player_count_max: request.player_count_max.unwrap_or(MAX_PLAYERS),
        roles: request.roles,
    })?;

    let script = store_script(state, script).await?;
    info!(script = %script.id, author = %author.id, roles = script.role_count(), "script created");
    Ok(script.as_ref().into())
}

/// Edit a custom script. Only its author may do so.
pub async fn update_script(
    state: &SharedState,
    key: &str,
    request: UpdateScriptRequest,
) -> Result<ScriptDetail, ServiceError> {
    let _writes = state.lock_scripts().await;
    let current = owned_script(state, key, request.user_id, "edit")?;
    let script = state.catalog().prepare_script(ScriptDefinition {
        id: current.id.clone(),
        name: request.name.unwrap_or_else(|| current.name.clone()),
        author: current.author.clone(),
        author_id: current.author_id,
        description: request
            .description
            .unwrap_or_else(|| current.description.clone()),
        player_count_min: request.player_count_min.unwrap_or(current.player_count_min),
        player_count_max: request.player_count_max.unwrap_or(current.player_count_max),
        roles: request.roles.unwrap_or_else(|| current.role_ids()),
    })?;

    let script = store_script(state, script).await?;
    info!(script = %script.id, roles = script.role_count(), "script updated");
    Ok(script.as_ref().into())
}

/// Delete a custom script that no running game uses. Only its author may do so.
pub async fn delete_script(
    state: &SharedState,
    key: &str,
    user_id: Uuid,
) -> Result<(), ServiceError> {
    let _writes = state.lock_scripts().await;
    let script = owned_script(state, key, user_id, "delete")?;
    let store = state.require_game_store().await?;
    if store.script_in_use(script.id.clone()).await? {
        return Err(ServiceError::InvalidState(format!(
            "script `{}` is used by a game that has not ended",
            script.id
        )));
    }

    store.delete_script(script.id.clone()).await?;
    state.catalog().remove_script(&script.id);
    info!(script = %script.id, "script deleted");
    Ok(())
}

/// Resolve a script by id or name.
pub(crate) fn require_script(state: &SharedState, key: &str) -> Result<Arc<Script>, ServiceError> {
    state
        .catalog()
        .script(key)
        .ok_or_else(|| EngineError::UnknownScript(key.to_string()).into())
}

/// Resolve a custom script `user_id` is allowed to `action`.
fn owned_script(
    state: &SharedState,
    key: &str,
    user_id: Uuid,
    action: &str,
) -> Result<Arc<Script>, ServiceError> {
    let script = require_script(state, key)?;
    match script.author_id {
        _ if script.is_official => {
            Err(ServiceError::Forbidden("official scripts are read-only".into()))
        }
        Some(author) if author == user_id => Ok(script),
        Some(_) => Err(ServiceError::Forbidden(format!(
            "only the author can {action} this script"
        ))),
        None => Err(ServiceError::Forbidden("configured scripts are read-only".into())),
    }
}

/// Persist `script`, then register it in the catalog.
async fn store_script(state: &SharedState, script: Script) -> Result<Arc<Script>, ServiceError> {
    let store = state.require_game_store().await?;
    store
        .save_script(ScriptEntity {
            id: script.id.clone(),
            name: script.name.clone(),
            author: script.author.clone(),
            author_id: script.author_id,
            description: script.description.clone(),
            player_count_min: script.player_count_min,
            player_count_max: script.player_count_max,
            roles: script.role_ids(),
            updated_at: SystemTime::now(),
        })
        .await?;
    Ok(state.catalog().insert_script(script))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::game_store::{GameStore, memory::MemoryGameStore},
        dto::{
            game::{CreateGameRequest, SettingsOverrides},
            user::CreateUserRequest,
        },
        services::lobby_service,
        state::{
            AppState,
            catalog::{Edition, Team},
        },
    };

    async fn with_users() -> (SharedState, Arc<MemoryGameStore>, Uuid, Uuid) {
        let store = Arc::new(MemoryGameStore::new());
        let state = AppState::with_store(AppConfig::default(), store.clone()).await;
        let mut ids = Vec::new();
        for name in ["alice", "bob"] {
            let user = user_service::register(
                &state,
                CreateUserRequest {
                    username: name.into(),
                },
            )
            .await
            .unwrap();
            ids.push(user.id);
        }
        (state, store, ids[0], ids[1])
    }

    fn create(user_id: Uuid, name: &str, roles: &[&str]) -> CreateScriptRequest {
        CreateScriptRequest {
            user_id,
            name: name.into(),
            description: String::new(),
            roles: roles.iter().map(|role| role.to_string()).collect(),
            player_count_min: None,
            player_count_max: Some(7),
        }
    }

    fn edit(user_id: Uuid) -> UpdateScriptRequest {
        UpdateScriptRequest {
            user_id,
            name: None,
            description: None,
            roles: None,
            player_count_min: None,
            player_count_max: None,
        }
    }

    const SMALL: [&str; 5] = ["chef", "empath", "saint", "imp", "spy"];

    #[test]
    fn roles_can_be_filtered_by_team() {
        let state = AppState::new(AppConfig::default());
        let demons = list_roles(
            &state,
            &RoleQuery {
                team: Some(Team::Demon),
                ..Default::default()
            },
        );
        assert_eq!(demons.len(), 1);
        assert_eq!(demons[0].character_id, "imp");

        let all = list_roles(
            &state,
            &RoleQuery {
                edition: Some(Edition::TroubleBrewing),
                team: None,
            },
        );
        assert_eq!(all.len(), 22);
    }

    #[test]
    fn unknown_lookups_are_not_found() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(get_role(&state, "nobody"), Err(ServiceError::NotFound(_))));
        assert!(matches!(get_script(&state, "nope"), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn script_detail_groups_roles_by_team() {
        let state = AppState::new(AppConfig::default());
        let detail = get_script(&state, "Trouble Brewing").unwrap();
        let shape: Vec<(Team, usize)> = detail
            .teams
            .iter()
            .map(|group| (group.team, group.roles.len()))
            .collect();
        assert_eq!(
            shape,
            [
                (Team::Townsfolk, 13),
                (Team::Outsider, 4),
                (Team::Minion, 4),
                (Team::Demon, 1)
            ]
        );
    }

    #[test]
    fn distribution_reports_counts_and_support() {
        let state = AppState::new(AppConfig::default());
        let response = distribution(&state, "trouble-brewing", 9).unwrap();
        assert_eq!(response.counts.outsider, 2);
        assert!(response.supported);
        assert!(matches!(
            distribution(&state, "trouble-brewing", 16),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn authors_manage_their_own_scripts() {
        let (state, store, alice, bob) = with_users().await;
        let created = create_script(&state, create(alice, "Chef Night", &SMALL))
            .await
            .unwrap();
        assert_eq!(created.summary.id, "chef-night");
        assert_eq!(created.summary.author, "alice");
        assert_eq!(created.summary.author_id, Some(alice));
        assert!(!created.summary.is_official);
        let ids: Vec<String> = list_scripts(&state).into_iter().map(|script| script.id).collect();
        assert_eq!(ids, ["trouble-brewing", "chef-night"]);

        let err = create_script(&state, create(bob, "chef night", &SMALL))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let err = update_script(&state, "chef-night", edit(bob)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        let err = update_script(&state, "trouble-brewing", edit(alice))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let mut request = edit(alice);
        request.name = Some("Chef Nights".into());
        request.roles = Some(
            ["washerwoman", "chef", "empath", "saint", "imp", "spy"]
                .map(String::from)
                .to_vec(),
        );
        let updated = update_script(&state, "chef-night", request).await.unwrap();
        assert_eq!(updated.summary.id, "chef-night");
        assert_eq!(updated.summary.name, "Chef Nights");
        assert_eq!(updated.summary.role_count, 6);
        assert_eq!(updated.summary.player_count_max, 7);

        let err = delete_script(&state, "chef-night", bob).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        delete_script(&state, "Chef Nights", alice).await.unwrap();
        assert!(matches!(
            get_script(&state, "chef-night"),
            Err(ServiceError::NotFound(_))
        ));
        assert!(store.list_scripts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn script_composition_is_checked() {
        let (state, _store, alice, _bob) = with_users().await;
        let no_demon = ["chef", "empath", "saint", "spy", "poisoner"];
        let err = create_script(&state, create(alice, "Calm", &no_demon))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let few_good = ["chef", "empath", "spy", "poisoner", "imp"];
        let err = create_script(&state, create(alice, "Grim", &few_good))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let unknown = ["chef", "empath", "saint", "imp", "vortox"];
        let err = create_script(&state, create(alice, "Odd", &unknown))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = create_script(&state, create(alice, "!!!", &SMALL))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let err = create_script(&state, create(Uuid::new_v4(), "Ghost", &SMALL))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert_eq!(list_scripts(&state).len(), 1);
    }

    #[tokio::test]
    async fn scripts_in_use_are_kept() {
        let (state, _store, alice, _bob) = with_users().await;
        create_script(&state, create(alice, "Chef Night", &SMALL))
            .await
            .unwrap();
        lobby_service::create_game(
            &state,
            CreateGameRequest {
                host_id: alice,
                script_id: Some("chef-night".into()),
                settings: SettingsOverrides::default(),
            },
        )
        .await
        .unwrap();

        let err = delete_script(&state, "chef-night", alice).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        assert!(get_script(&state, "chef-night").is_ok());
    }

    #[tokio::test]
    async fn stored_scripts_are_loaded_with_the_store() {
        let (state, store, alice, _bob) = with_users().await;
        create_script(&state, create(alice, "Chef Night", &SMALL))
            .await
            .unwrap();

        let restarted = AppState::with_store(AppConfig::default(), store).await;
        let detail = get_script(&restarted, "Chef Night").unwrap();
        assert_eq!(detail.summary.id, "chef-night");
        assert_eq!(detail.summary.author_id, Some(alice));
    }
}
