use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::format_system_time,
    state::{
        catalog::{Alignment, Team},
        game::{AbilityUse, EndReason, GameSession, GameSettings, HouseRules, Player, StatusEffect},
        ledger::{Nomination, Vote, VoteKind},
        state_machine::GameStatus,
    },
};

/// Body of every request that only needs to know who is calling.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CallerRequest {
    pub user_id: Uuid,
}

/// Identify the caller on read-only routes.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ViewerQuery {
    /// The host gets the full view, seated players their own view, anyone else the public one.
    pub user_id: Option<Uuid>,
}

/// House rule overrides applied on top of the server defaults.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct HouseRulesOverrides {
    pub allow_dead_vote: Option<bool>,
    pub show_vote_counts: Option<bool>,
    pub allow_whispers: Option<bool>,
    pub auto_advance_phases: Option<bool>,
}

impl HouseRulesOverrides {
    fn apply(&self, rules: &mut HouseRules) {
        if let Some(value) = self.allow_dead_vote {
            rules.allow_dead_vote = value;
        }
        if let Some(value) = self.show_vote_counts {
            rules.show_vote_counts = value;
        }
        if let Some(value) = self.allow_whispers {
            rules.allow_whispers = value;
        }
        if let Some(value) = self.auto_advance_phases {
            rules.auto_advance_phases = value;
        }
    }
}

/// Partial game settings; missing fields keep the server defaults.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct SettingsOverrides {
    #[validate(range(min = 5, max = 15))]
    pub max_players: Option<usize>,
    #[validate(range(max = 7200))]
    pub discussion_time: Option<u32>,
    #[validate(range(max = 3600))]
    pub voting_time: Option<u32>,
    #[validate(range(max = 3600))]
    pub nomination_time: Option<u32>,
    #[serde(default)]
    pub house_rules: HouseRulesOverrides,
}

impl SettingsOverrides {
    /// Merge the overrides over `defaults`.
    pub fn merge_into(&self, mut defaults: GameSettings) -> GameSettings {
        if let Some(value) = self.max_players {
            defaults.max_players = value;
        }
        if let Some(value) = self.discussion_time {
            defaults.discussion_time = value;
        }
        if let Some(value) = self.voting_time {
            defaults.voting_time = value;
        }
        if let Some(value) = self.nomination_time {
            defaults.nomination_time = value;
        }
        self.house_rules.apply(&mut defaults.house_rules);
        defaults.normalized()
    }
}

/// Payload used to open a new lobby.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    /// User hosting the game. They are seated first.
    pub host_id: Uuid,
    /// Script id or name. Can also be chosen later in the lobby.
    pub script_id: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub settings: SettingsOverrides,
}

/// Payload used to join a lobby by code.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinGameRequest {
    /// Case-insensitive join code.
    #[validate(length(min = 1, max = 16))]
    pub join_code: String,
    pub user_id: Uuid,
}

/// Select the script of a lobby.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SetScriptRequest {
    pub user_id: Uuid,
    /// Script id or name.
    #[validate(length(min = 1))]
    pub script_id: String,
}

/// Host request to end the game.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EndGameRequest {
    pub user_id: Uuid,
    /// Declared winner, `null` for a game without one.
    pub winner: Option<Alignment>,
}

/// A seated player nominates another player.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NominateRequest {
    /// User making the nomination. Their seat is the nominator.
    pub user_id: Uuid,
    /// Player id of the nominee.
    pub nominee_id: Uuid,
}

/// A seated player spends their vote.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VoteRequest {
    pub user_id: Uuid,
    /// Player voted on, `null` to abstain.
    pub target_id: Option<Uuid>,
    #[serde(default)]
    pub kind: VoteKind,
}

/// Host request to kill a player.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct KillRequest {
    pub user_id: Uuid,
    /// Free-text cause (execution, demon, slayer...).
    #[validate(length(max = 64))]
    pub cause: Option<String>,
}

/// Host records a night ability use.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ActionRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 64))]
    pub ability: String,
    pub target_id: Option<Uuid>,
}

/// Host places a status effect on a player.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct StatusEffectRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    /// Remaining phases, open ended when missing.
    pub duration: Option<u32>,
    pub source: Option<String>,
}

/// Host notes about a player.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct NotesRequest {
    pub user_id: Uuid,
    #[validate(length(max = 4000))]
    pub notes: String,
}

/// Role revealed in a view.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RevealedRole {
    pub character_id: String,
    pub name: String,
    pub team: Team,
}

/// Night ability use as shown to the host.
#[derive(Debug, Serialize, ToSchema)]
pub struct AbilityUseView {
    pub ability: String,
    pub target_id: Option<Uuid>,
    pub night: u32,
    pub used_at: String,
}

impl From<&AbilityUse> for AbilityUseView {
    fn from(record: &AbilityUse) -> Self {
        Self {
            ability: record.ability.clone(),
            target_id: record.target_id,
            night: record.night,
            used_at: format_system_time(record.used_at),
        }
    }
}

/// Status effect as shown to the host.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusEffectView {
    pub name: String,
    pub duration: Option<u32>,
    pub source: Option<String>,
    pub applied_at: String,
}

impl From<&StatusEffect> for StatusEffectView {
    fn from(effect: &StatusEffect) -> Self {
        Self {
            name: effect.name.clone(),
            duration: effect.duration,
            source: effect.source.clone(),
            applied_at: format_system_time(effect.applied_at),
        }
    }
}

/// A seat as seen by a given viewer.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub position: u32,
    pub is_alive: bool,
    pub is_ready: bool,
    pub votes_remaining: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub died_at: Option<String>,
    /// Present for the host, for the viewer's own seat and for dead players.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<RevealedRole>,
    /// Host only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abilities_used: Option<Vec<AbilityUseView>>,
    /// Host only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_effects: Option<Vec<StatusEffectView>>,
    /// Host only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PlayerView {
    fn build(player: &Player, full: bool, reveal_role: bool) -> Self {
        let role = player
            .role
            .as_ref()
            .filter(|_| full || reveal_role || !player.is_alive)
            .map(|role| RevealedRole {
                character_id: role.character_id.clone(),
                name: role.name.clone(),
                team: role.team,
            });

        Self {
            id: player.id,
            user_id: player.user_id,
            username: player.username.clone(),
            position: player.position,
            is_alive: player.is_alive,
            is_ready: player.is_ready,
            votes_remaining: player.votes_remaining,
            died_at: player.died_at.map(format_system_time),
            role,
            abilities_used: full
                .then(|| player.abilities_used.iter().map(Into::into).collect()),
            status_effects: full
                .then(|| player.status_effects.iter().map(Into::into).collect()),
            notes: full.then(|| player.notes.clone()),
        }
    }
}

/// Open nomination of the current day.
#[derive(Debug, Serialize, ToSchema)]
pub struct NominationView {
    pub nominator_id: Uuid,
    pub nominee_id: Uuid,
    pub day_number: u32,
    pub timestamp: String,
}

impl From<&Nomination> for NominationView {
    fn from(nomination: &Nomination) -> Self {
        Self {
            nominator_id: nomination.nominator_id,
            nominee_id: nomination.nominee_id,
            day_number: nomination.day_number,
            timestamp: format_system_time(nomination.timestamp),
        }
    }
}

/// A recorded vote.
#[derive(Debug, Serialize, ToSchema)]
pub struct VoteView {
    pub id: Uuid,
    pub voter_id: Uuid,
    pub target_id: Option<Uuid>,
    pub kind: VoteKind,
    pub day_number: u32,
    pub cast_at: String,
}

impl From<&Vote> for VoteView {
    fn from(vote: &Vote) -> Self {
        Self {
            id: vote.id,
            voter_id: vote.voter_id,
            target_id: vote.target_id,
            kind: vote.kind,
            day_number: vote.day_number,
            cast_at: format_system_time(vote.cast_at),
        }
    }
}

/// Which view of a game a caller is entitled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Host,
    /// A seated player, identified by user id.
    Player(Uuid),
    Public,
}

impl Audience {
    /// Resolve the audience of `viewer` for `game`.
    pub fn of(game: &GameSession, viewer: Option<Uuid>) -> Self {
        match viewer {
            Some(user_id) if game.is_host(user_id) => Audience::Host,
            Some(user_id) if game.player_by_user(user_id).is_some() => Audience::Player(user_id),
            _ => Audience::Public,
        }
    }
}

/// Game state as exposed over the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameView {
    pub id: Uuid,
    pub join_code: String,
    pub host_id: Uuid,
    pub script_id: Option<String>,
    pub status: GameStatus,
    pub phase: u32,
    pub day_number: u32,
    pub winner: Option<Alignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_reason: Option<EndReason>,
    pub settings: GameSettings,
    pub can_start: bool,
    pub players: Vec<PlayerView>,
    pub nominations: Vec<NominationView>,
    /// Votes of the current day. Host only unless `show_vote_counts` is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub votes: Option<Vec<VoteView>>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,
}

impl GameView {
    pub fn build(game: &GameSession, audience: Audience) -> Self {
        let full = audience == Audience::Host;
        let players = game
            .players()
            .iter()
            .map(|player| {
                let own = audience == Audience::Player(player.user_id);
                PlayerView::build(player, full, own)
            })
            .collect();
        let show_votes = full || game.settings.house_rules.show_vote_counts;
        let votes = show_votes.then(|| {
            game.vote_ledger()
                .votes_on(game.day_number())
                .map(Into::into)
                .collect()
        });

        Self {
            id: game.id,
            join_code: game.join_code.clone(),
            host_id: game.host_id,
            script_id: game.script_id.clone(),
            status: game.status(),
            phase: game.phase(),
            day_number: game.day_number(),
            winner: game.winner,
            end_reason: game.end_reason,
            settings: game.settings,
            can_start: game.can_start(),
            players,
            nominations: game.nominations().iter().map(Into::into).collect(),
            votes,
            created_at: format_system_time(game.created_at),
            started_at: game.started_at.map(format_system_time),
            ended_at: game.ended_at.map(format_system_time),
        }
    }

    /// Everything, including hidden roles and host notes.
    pub fn host(game: &GameSession) -> Self {
        Self::build(game, Audience::Host)
    }
}

/// Result of a kill.
#[derive(Debug, Serialize, ToSchema)]
pub struct KillResponse {
    pub player_id: Uuid,
    /// Set when the kill decided the game, which is then over.
    pub winner: Option<Alignment>,
    pub status: GameStatus,
}

/// Result of removing a status effect.
#[derive(Debug, Serialize, ToSchema)]
pub struct EffectRemovedResponse {
    pub removed: bool,
}

/// Seats next to a player.
#[derive(Debug, Serialize, ToSchema)]
pub struct NeighborsResponse {
    pub player_id: Uuid,
    /// Players on either side, wrapping around the table.
    pub left: Option<Uuid>,
    pub right: Option<Uuid>,
    /// Nearest alive players on either side, empty when the player is dead.
    pub alive_left: Option<Uuid>,
    pub alive_right: Option<Uuid>,
}
