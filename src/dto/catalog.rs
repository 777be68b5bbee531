use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::state::{
    catalog::{Edition, Role, Script, Team},
    distribution::TeamCounts,
};

/// Filters accepted by the role listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RoleQuery {
    /// Only roles from this edition.
    pub edition: Option<Edition>,
    /// Only roles of this team.
    pub team: Option<Team>,
}

/// Reference data for one character.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoleSummary {
    pub character_id: String,
    pub name: String,
    pub edition: Edition,
    pub team: Team,
    pub ability: String,
    /// Wake order on the first night, 0 when the role does not wake.
    pub first_night: u8,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub first_night_reminder: String,
    /// Wake order on later nights, 0 when the role does not wake.
    pub other_night: u8,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub other_night_reminder: String,
    pub reminders: Vec<String>,
    /// The role changes the game setup (e.g. the Baron).
    pub setup: bool,
}

impl From<&Role> for RoleSummary {
    fn from(role: &Role) -> Self {
        Self {
            character_id: role.character_id.clone(),
            name: role.name.clone(),
            edition: role.edition,
            team: role.team,
            ability: role.ability.clone(),
            first_night: role.first_night,
            first_night_reminder: role.first_night_reminder.clone(),
            other_night: role.other_night,
            other_night_reminder: role.other_night_reminder.clone(),
            reminders: role.reminders.clone(),
            setup: role.setup,
        }
    }
}

/// Script entry in listings.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScriptSummary {
    pub id: String,
    pub name: String,
    pub author: String,
    /// Owner of a custom script, absent for official and configured scripts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<Uuid>,
    pub description: String,
    pub is_official: bool,
    pub player_count_min: usize,
    pub player_count_max: usize,
    pub role_count: usize,
}

impl From<&Script> for ScriptSummary {
    fn from(script: &Script) -> Self {
        Self {
            id: script.id.clone(),
            name: script.name.clone(),
            author: script.author.clone(),
            author_id: script.author_id,
            description: script.description.clone(),
            is_official: script.is_official,
            player_count_min: script.player_count_min,
            player_count_max: script.player_count_max,
            role_count: script.role_count(),
        }
    }
}

/// Roles of one team within a script.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamRoles {
    pub team: Team,
    pub roles: Vec<RoleSummary>,
}

/// Script with its roles grouped by team.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScriptDetail {
    #[serde(flatten)]
    pub summary: ScriptSummary,
    /// Only teams the script actually contains, in team order.
    pub teams: Vec<TeamRoles>,
}

impl From<&Script> for ScriptDetail {
    fn from(script: &Script) -> Self {
        let mut teams: Vec<TeamRoles> = Vec::new();
        let mut roles: Vec<&Role> = script.roles().collect();
        roles.sort_by_key(|role| role.team);
        for role in roles {
            match teams.last_mut() {
                Some(group) if group.team == role.team => group.roles.push(role.into()),
                _ => teams.push(TeamRoles {
                    team: role.team,
                    roles: vec![role.into()],
                }),
            }
        }

        Self {
            summary: script.into(),
            teams,
        }
    }
}

/// Required team counts for a table size, and whether a script can cover them.
#[derive(Debug, Serialize, ToSchema)]
pub struct DistributionResponse {
    pub script_id: String,
    pub player_count: usize,
    pub counts: TeamCounts,
    pub supported: bool,
}

/// Payload used to create a custom script.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateScriptRequest {
    /// Author of the script, the only user allowed to change it later.
    pub user_id: Uuid,
    /// Unique name. The script id is derived from it.
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,
    /// Character ids: at least one demon and three good roles.
    #[validate(length(min = 1, max = 64))]
    pub roles: Vec<String>,
    /// Defaults to 5.
    pub player_count_min: Option<usize>,
    /// Defaults to 15.
    pub player_count_max: Option<usize>,
}

/// Changes to a custom script. Missing fields keep their value and the id never changes.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateScriptRequest {
    /// Calling user, must be the author.
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub roles: Option<Vec<String>>,
    pub player_count_min: Option<usize>,
    pub player_count_max: Option<usize>,
}
