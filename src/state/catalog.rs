//! Role and script reference data.
//!
//! Roles are immutable once the catalog is built. Scripts reference roles by
//! character id and keep them as an ordered set. Custom scripts can be added,
//! replaced and removed while the server runs.

use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::ScriptEntity,
    state::{
        distribution::{DistributionTable, MAX_PLAYERS, MIN_PLAYERS},
        error::EngineError,
    },
};

/// Identifier of the built-in Trouble Brewing script.
pub const TROUBLE_BREWING_ID: &str = "trouble-brewing";
/// Fewest distinct roles a custom script may hold.
pub const MIN_SCRIPT_ROLES: usize = 5;
/// Fewest good (townsfolk and outsider) roles a custom script may hold.
pub const MIN_GOOD_ROLES: usize = 3;

/// Character type of a role.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// Good characters with helpful abilities.
    Townsfolk,
    /// Good characters whose abilities tend to hurt their own side.
    Outsider,
    /// Evil helpers of the demon.
    Minion,
    /// The evil player good must execute.
    Demon,
    /// Players joining mid-game, outside the distribution.
    Traveller,
    /// Storyteller-only rule modifiers.
    Fabled,
}

/// Side a player wins or loses with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Townsfolk and outsiders.
    Good,
    /// Minions and demons.
    Evil,
}

impl Team {
    /// Teams drawn from a script when distributing roles, in draw order.
    pub const DRAFTED: [Team; 4] = [Team::Townsfolk, Team::Outsider, Team::Minion, Team::Demon];

    /// Single source of truth for team membership.
    ///
    /// Travellers and fabled characters never count towards either side.
    pub fn alignment(self) -> Option<Alignment> {
        match self {
            Team::Townsfolk | Team::Outsider => Some(Alignment::Good),
            Team::Minion | Team::Demon => Some(Alignment::Evil),
            Team::Traveller | Team::Fabled => None,
        }
    }

    /// Townsfolk or outsider.
    pub fn is_good(self) -> bool {
        self.alignment() == Some(Alignment::Good)
    }

    /// Minion or demon.
    pub fn is_evil(self) -> bool {
        self.alignment() == Some(Alignment::Evil)
    }
}

/// Release a role belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Edition {
    /// The beginner base set.
    TroubleBrewing,
    /// The madness-themed base set.
    SectsAndViolets,
    /// The death-heavy base set.
    BadMoonRising,
    /// Characters published outside the base sets.
    Experimental,
}

/// Reference definition of a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Official character id (e.g. `fortune_teller`).
    pub character_id: String,
    /// Display name.
    pub name: String,
    /// Release the role comes from.
    pub edition: Edition,
    /// Character type, which also fixes the alignment.
    pub team: Team,
    /// Ability text as printed on the token.
    pub ability: String,
    /// Wake order on the first night, 0 when the role does not wake.
    pub first_night: u8,
    /// Storyteller prompt for the first night.
    pub first_night_reminder: String,
    /// Wake order on other nights, 0 when the role does not wake.
    pub other_night: u8,
    /// Storyteller prompt for later nights.
    pub other_night_reminder: String,
    /// Reminder tokens the role uses.
    pub reminders: Vec<String>,
    /// Whether the role modifies game setup.
    pub setup: bool,
}

impl Role {
    /// Side of the role's team.
    pub fn alignment(&self) -> Option<Alignment> {
        self.team.alignment()
    }

    /// Whether the storyteller wakes the role on the first night.
    pub fn wakes_first_night(&self) -> bool {
        self.first_night > 0
    }

    /// Whether the storyteller wakes the role on later nights.
    pub fn wakes_other_nights(&self) -> bool {
        self.other_night > 0
    }
}

/// Named, ordered set of roles that can be played together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    /// Stable identifier, the slug of the name for custom scripts.
    pub id: String,
    /// Display name, unique across the catalog regardless of case.
    pub name: String,
    /// Author name shown in listings.
    pub author: String,
    /// User who created the script. `None` for official and configured scripts.
    pub author_id: Option<Uuid>,
    /// Free text shown in listings.
    pub description: String,
    /// Published scripts cannot be edited or deleted.
    pub is_official: bool,
    /// Smallest supported table.
    pub player_count_min: usize,
    /// Largest supported table.
    pub player_count_max: usize,
    roles: IndexMap<String, Role>,
}

impl Script {
    /// All roles in script order.
    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    /// Role of the script with this character id.
    pub fn role(&self, character_id: &str) -> Option<&Role> {
        self.roles.get(character_id)
    }

    /// Roles of a single team, in script order.
    pub fn roles_of(&self, team: Team) -> Vec<&Role> {
        self.roles.values().filter(|role| role.team == team).collect()
    }

    /// Number of distinct roles.
    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    /// Character ids in script order.
    pub fn role_ids(&self) -> Vec<String> {
        self.roles.keys().cloned().collect()
    }

    /// Check the composition rules every custom script must follow.
    fn check_composition(&self) -> Result<(), EngineError> {
        if self.name.trim().is_empty() {
            return Err(EngineError::InvalidScript("name must not be blank".into()));
        }
        if self.role_count() < MIN_SCRIPT_ROLES {
            return Err(EngineError::InvalidScript(format!(
                "at least {MIN_SCRIPT_ROLES} roles are required"
            )));
        }
        if self.roles_of(Team::Demon).is_empty() {
            return Err(EngineError::InvalidScript(
                "at least one demon is required".into(),
            ));
        }
        let good = self.roles().filter(|role| role.team.is_good()).count();
        if good < MIN_GOOD_ROLES {
            return Err(EngineError::InvalidScript(format!(
                "at least {MIN_GOOD_ROLES} townsfolk or outsider roles are required"
            )));
        }
        if self.player_count_min > self.player_count_max {
            return Err(EngineError::InvalidScript(
                "player_count_min exceeds player_count_max".into(),
            ));
        }
        Ok(())
    }

    /// Whether the script can seat `player_count` players with a legal distribution.
    pub fn supports(&self, player_count: usize) -> bool {
        if player_count < self.player_count_min || player_count > self.player_count_max {
            return false;
        }
        let Ok(counts) = DistributionTable::lookup(player_count) else {
            return false;
        };
        Team::DRAFTED
            .iter()
            .all(|team| self.roles_of(*team).len() >= usize::from(counts.get(*team)))
    }
}

/// Serializable script description used by the configuration file and custom scripts.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptDefinition {
    /// Identifier the script is registered under.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Author name shown in listings.
    #[serde(default)]
    pub author: String,
    /// Owning user, set for scripts created over the API.
    #[serde(default)]
    pub author_id: Option<Uuid>,
    /// Free text shown in listings.
    #[serde(default)]
    pub description: String,
    /// Smallest supported table, raised to the global minimum.
    #[serde(default = "default_min_players")]
    pub player_count_min: usize,
    /// Largest supported table, lowered to the global maximum.
    #[serde(default = "default_max_players")]
    pub player_count_max: usize,
    /// Character ids, in display order.
    pub roles: Vec<String>,
}

impl From<ScriptEntity> for ScriptDefinition {
    fn from(entity: ScriptEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            author: entity.author,
            author_id: entity.author_id,
            description: entity.description,
            player_count_min: entity.player_count_min,
            player_count_max: entity.player_count_max,
            roles: entity.roles,
        }
    }
}

fn default_min_players() -> usize {
    MIN_PLAYERS
}

fn default_max_players() -> usize {
    MAX_PLAYERS
}

/// Turn a script name into its identifier: lowercase ASCII words joined by dashes.
pub fn script_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_owned()
}

/// Queryable table of every known role and script.
#[derive(Debug, Clone)]
pub struct RoleCatalog {
    roles: IndexMap<String, Role>,
    scripts: DashMap<String, Arc<Script>>,
}

impl Default for RoleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RoleCatalog {
    /// Catalog holding the Trouble Brewing roles and script.
    pub fn builtin() -> Self {
        let roles: IndexMap<String, Role> = TROUBLE_BREWING_ROLES
            .iter()
            .map(|seed| (seed.character_id.to_owned(), seed.to_role()))
            .collect();

        let catalog = Self {
            roles,
            scripts: DashMap::new(),
        };

        let trouble_brewing = ScriptDefinition {
            id: TROUBLE_BREWING_ID.to_owned(),
            name: "Trouble Brewing".to_owned(),
            author: "The Pandemonium Institute".to_owned(),
            author_id: None,
            description: "The original Blood on the Clocktower script. A perfect introduction \
                          to the game with straightforward roles and clear interactions."
                .to_owned(),
            player_count_min: MIN_PLAYERS,
            player_count_max: MAX_PLAYERS,
            roles: TROUBLE_BREWING_ROLES
                .iter()
                .map(|seed| seed.character_id.to_owned())
                .collect(),
        };
        // Every id above comes from the role table itself.
        if let Ok(script) = catalog.build_script(trouble_brewing, true) {
            catalog.insert_script(script);
        }

        catalog
    }

    /// Validate and register a custom script, replacing any script with the same id.
    pub fn add_script(&self, definition: ScriptDefinition) -> Result<Arc<Script>, EngineError> {
        let script = self.prepare_script(definition)?;
        Ok(self.insert_script(script))
    }

    /// Build a custom script without registering it.
    ///
    /// Roles are deduplicated keeping their first position. The script must follow the
    /// composition rules and its name must not be used by a script with another id.
    pub fn prepare_script(&self, definition: ScriptDefinition) -> Result<Script, EngineError> {
        let script = self.build_script(definition, false)?;
        script.check_composition()?;
        let taken = self.scripts.iter().any(|entry| {
            entry.key() != &script.id && entry.value().name.eq_ignore_ascii_case(&script.name)
        });
        if taken {
            return Err(EngineError::ScriptNameTaken(script.name));
        }
        Ok(script)
    }

    /// Register an already validated script.
    pub fn insert_script(&self, script: Script) -> Arc<Script> {
        let script = Arc::new(script);
        self.scripts.insert(script.id.clone(), script.clone());
        script
    }

    /// Unregister a script, returning it when it existed.
    pub fn remove_script(&self, id: &str) -> Option<Arc<Script>> {
        self.scripts.remove(id).map(|(_, script)| script)
    }

    fn build_script(
        &self,
        definition: ScriptDefinition,
        is_official: bool,
    ) -> Result<Script, EngineError> {
        let mut roles = IndexMap::with_capacity(definition.roles.len());
        for character_id in definition.roles {
            let role = self
                .roles
                .get(&character_id)
                .ok_or_else(|| EngineError::UnknownRole(character_id.clone()))?;
            roles.entry(character_id).or_insert_with(|| role.clone());
        }

        Ok(Script {
            id: definition.id,
            name: definition.name.trim().to_owned(),
            author: definition.author,
            author_id: definition.author_id,
            description: definition.description,
            is_official,
            player_count_min: definition.player_count_min.max(MIN_PLAYERS),
            player_count_max: definition.player_count_max.min(MAX_PLAYERS),
            roles,
        })
    }

    /// Role with this character id.
    pub fn role(&self, character_id: &str) -> Option<&Role> {
        self.roles.get(character_id)
    }

    /// Every known role, in catalog order.
    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    /// Look a script up by id, falling back to a case-insensitive name match.
    pub fn script(&self, key: &str) -> Option<Arc<Script>> {
        if let Some(script) = self.scripts.get(key) {
            return Some(script.value().clone());
        }
        self.scripts
            .iter()
            .find(|entry| entry.value().name.eq_ignore_ascii_case(key.trim()))
            .map(|entry| entry.value().clone())
    }

    /// Every script, official ones first, then by name.
    pub fn scripts(&self) -> Vec<Arc<Script>> {
        let mut scripts: Vec<Arc<Script>> = self
            .scripts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        scripts.sort_by_key(|script| (!script.is_official, script.name.to_ascii_lowercase()));
        scripts
    }
}

struct RoleSeed {
    character_id: &'static str,
    name: &'static str,
    team: Team,
    ability: &'static str,
    first_night: u8,
    first_night_reminder: &'static str,
    other_night: u8,
    other_night_reminder: &'static str,
    reminders: &'static [&'static str],
    setup: bool,
}

impl RoleSeed {
    fn to_role(&self) -> Role {
        Role {
            character_id: self.character_id.to_owned(),
            name: self.name.to_owned(),
            edition: Edition::TroubleBrewing,
            team: self.team,
            ability: self.ability.to_owned(),
            first_night: self.first_night,
            first_night_reminder: self.first_night_reminder.to_owned(),
            other_night: self.other_night,
            other_night_reminder: self.other_night_reminder.to_owned(),
            reminders: self.reminders.iter().map(|r| (*r).to_owned()).collect(),
            setup: self.setup,
        }
    }
}

const TROUBLE_BREWING_ROLES: &[RoleSeed] = &[
    RoleSeed {
        character_id: "washerwoman",
        name: "Washerwoman",
        team: Team::Townsfolk,
        ability: "You start knowing that 1 of 2 players is a particular Townsfolk.",
        first_night: 1,
        first_night_reminder: "Show the character token of a Townsfolk in play. Point to two players, one of which is that character.",
        other_night: 0,
        other_night_reminder: "",
        reminders: &["Townsfolk", "Wrong"],
        setup: false,
    },
    RoleSeed {
        character_id: "librarian",
        name: "Librarian",
        team: Team::Townsfolk,
        ability: "You start knowing that 1 of 2 players is a particular Outsider. (Or that zero are in play.)",
        first_night: 2,
        first_night_reminder: "Show the character token of an Outsider in play. Point to two players, one of which is that character. Or, if no Outsider is in play, show the \"No Outsider\" token and shake your head.",
        other_night: 0,
        other_night_reminder: "",
        reminders: &["Outsider", "Wrong"],
        setup: false,
    },
    RoleSeed {
        character_id: "investigator",
        name: "Investigator",
        team: Team::Townsfolk,
        ability: "You start knowing that 1 of 2 players is a particular Minion.",
        first_night: 3,
        first_night_reminder: "Show the character token of a Minion in play. Point to two players, one of which is that character.",
        other_night: 0,
        other_night_reminder: "",
        reminders: &["Minion", "Wrong"],
        setup: false,
    },
    RoleSeed {
        character_id: "chef",
        name: "Chef",
        team: Team::Townsfolk,
        ability: "You start knowing how many pairs of evil players there are.",
        first_night: 4,
        first_night_reminder: "Show the finger signal (0, 1, 2, etc.) for the number of pairs of evil players.",
        other_night: 0,
        other_night_reminder: "",
        reminders: &[],
        setup: false,
    },
    RoleSeed {
        character_id: "empath",
        name: "Empath",
        team: Team::Townsfolk,
        ability: "Each night, you learn how many of your 2 alive neighbours are evil.",
        first_night: 5,
        first_night_reminder: "Show the finger signal (0, 1, 2) for the number of evil alive neighbours of the Empath.",
        other_night: 1,
        other_night_reminder: "Show the finger signal (0, 1, 2) for the number of evil alive neighbours of the Empath.",
        reminders: &[],
        setup: false,
    },
    RoleSeed {
        character_id: "fortune_teller",
        name: "Fortune Teller",
        team: Team::Townsfolk,
        ability: "Each night, choose 2 players: you learn if either is a Demon. There is a good player that registers as a Demon to you.",
        first_night: 6,
        first_night_reminder: "The Fortune Teller points to two players. Give a thumbs up if either is a Demon. Give a thumbs down if neither is a Demon.",
        other_night: 2,
        other_night_reminder: "The Fortune Teller points to two players. Give a thumbs up if either is a Demon. Give a thumbs down if neither is a Demon.",
        reminders: &["Red herring"],
        setup: false,
    },
    RoleSeed {
        character_id: "undertaker",
        name: "Undertaker",
        team: Team::Townsfolk,
        ability: "Each night*, you learn which character died by execution today.",
        first_night: 0,
        first_night_reminder: "",
        other_night: 3,
        other_night_reminder: "If a player was executed today: Show that player's character token.",
        reminders: &["Died today"],
        setup: false,
    },
    RoleSeed {
        character_id: "monk",
        name: "Monk",
        team: Team::Townsfolk,
        ability: "Each night*, choose a player (not yourself): they are safe from the Demon tonight.",
        first_night: 0,
        first_night_reminder: "",
        other_night: 4,
        other_night_reminder: "The Monk points to a player (not themselves). That player is safe from the Demon tonight.",
        reminders: &["Safe"],
        setup: false,
    },
    RoleSeed {
        character_id: "ravenkeeper",
        name: "Ravenkeeper",
        team: Team::Townsfolk,
        ability: "If you die at night, you are woken to choose a player: you learn their character.",
        first_night: 0,
        first_night_reminder: "",
        other_night: 0,
        other_night_reminder: "If the Ravenkeeper died tonight: The Ravenkeeper points to a player. Show that player's character token.",
        reminders: &[],
        setup: false,
    },
    RoleSeed {
        character_id: "virgin",
        name: "Virgin",
        team: Team::Townsfolk,
        ability: "The 1st time you are nominated, if the nominator is a Townsfolk, they are executed immediately.",
        first_night: 0,
        first_night_reminder: "",
        other_night: 0,
        other_night_reminder: "",
        reminders: &["No ability"],
        setup: false,
    },
    RoleSeed {
        character_id: "slayer",
        name: "Slayer",
        team: Team::Townsfolk,
        ability: "Once per game, during the day, publicly choose a player: if they are the Demon, they die.",
        first_night: 0,
        first_night_reminder: "",
        other_night: 0,
        other_night_reminder: "",
        reminders: &["No ability"],
        setup: false,
    },
    RoleSeed {
        character_id: "soldier",
        name: "Soldier",
        team: Team::Townsfolk,
        ability: "You are safe from the Demon.",
        first_night: 0,
        first_night_reminder: "",
        other_night: 0,
        other_night_reminder: "",
        reminders: &[],
        setup: false,
    },
    RoleSeed {
        character_id: "mayor",
        name: "Mayor",
        team: Team::Townsfolk,
        ability: "If only 3 players live & no execution occurs, your team wins. If you die at night, another player might die instead.",
        first_night: 0,
        first_night_reminder: "",
        other_night: 0,
        other_night_reminder: "",
        reminders: &[],
        setup: false,
    },
    RoleSeed {
        character_id: "drunk",
        name: "Drunk",
        team: Team::Outsider,
        ability: "You do not know you are the Drunk. You think you are a Townsfolk character, but you are not.",
        first_night: 0,
        first_night_reminder: "",
        other_night: 0,
        other_night_reminder: "",
        reminders: &[],
        setup: true,
    },
    RoleSeed {
        character_id: "recluse",
        name: "Recluse",
        team: Team::Outsider,
        ability: "You might register as evil & as a Minion or Demon, even if dead.",
        first_night: 0,
        first_night_reminder: "",
        other_night: 0,
        other_night_reminder: "",
        reminders: &[],
        setup: false,
    },
    RoleSeed {
        character_id: "saint",
        name: "Saint",
        team: Team::Outsider,
        ability: "If you die by execution, your team loses.",
        first_night: 0,
        first_night_reminder: "",
        other_night: 0,
        other_night_reminder: "",
        reminders: &[],
        setup: false,
    },
    RoleSeed {
        character_id: "butler",
        name: "Butler",
        team: Team::Outsider,
        ability: "Each night, choose a player (not yourself): tomorrow, you may only vote if they are voting too.",
        first_night: 9,
        first_night_reminder: "The Butler points to a player. That player is their master.",
        other_night: 8,
        other_night_reminder: "The Butler points to a player. That player is their master.",
        reminders: &["Master"],
        setup: false,
    },
    RoleSeed {
        character_id: "poisoner",
        name: "Poisoner",
        team: Team::Minion,
        ability: "Each night, choose a player: they are poisoned tonight and tomorrow day.",
        first_night: 7,
        first_night_reminder: "The Poisoner points to a player. That player is poisoned.",
        other_night: 5,
        other_night_reminder: "The Poisoner points to a player. That player is poisoned.",
        reminders: &["Poisoned"],
        setup: false,
    },
    RoleSeed {
        character_id: "spy",
        name: "Spy",
        team: Team::Minion,
        ability: "Each night, you see the Grimoire. You might register as good & as a Townsfolk or Outsider, even if dead.",
        first_night: 8,
        first_night_reminder: "Show the Grimoire to the Spy for as long as they need.",
        other_night: 6,
        other_night_reminder: "Show the Grimoire to the Spy for as long as they need.",
        reminders: &[],
        setup: false,
    },
    RoleSeed {
        character_id: "scarlet_woman",
        name: "Scarlet Woman",
        team: Team::Minion,
        ability: "If there are 5 or more players alive & the Demon dies, you become the Demon.",
        first_night: 0,
        first_night_reminder: "",
        other_night: 0,
        other_night_reminder: "",
        reminders: &[],
        setup: false,
    },
    RoleSeed {
        character_id: "baron",
        name: "Baron",
        team: Team::Minion,
        ability: "There are extra Outsiders in play. [+2 Outsiders]",
        first_night: 0,
        first_night_reminder: "",
        other_night: 0,
        other_night_reminder: "",
        reminders: &[],
        setup: true,
    },
    RoleSeed {
        character_id: "imp",
        name: "Imp",
        team: Team::Demon,
        ability: "Each night*, choose a player: they die. If you kill yourself this way, a Minion becomes the Imp.",
        first_night: 0,
        first_night_reminder: "",
        other_night: 7,
        other_night_reminder: "The Imp points to a player. That player dies.",
        reminders: &["Dead"],
        setup: false,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_contains_trouble_brewing() {
        let catalog = RoleCatalog::builtin();
        let script = catalog.script(TROUBLE_BREWING_ID).unwrap();

        assert_eq!(script.role_count(), 22);
        assert_eq!(script.roles_of(Team::Townsfolk).len(), 13);
        assert_eq!(script.roles_of(Team::Outsider).len(), 4);
        assert_eq!(script.roles_of(Team::Minion).len(), 4);
        assert_eq!(script.roles_of(Team::Demon).len(), 1);
        assert!(script.is_official);
    }

    #[test]
    fn script_lookup_falls_back_to_name() {
        let catalog = RoleCatalog::builtin();
        let script = catalog.script("trouble brewing").unwrap();
        assert_eq!(script.id, TROUBLE_BREWING_ID);
        assert!(catalog.script("sects-and-violets").is_none());
    }

    #[test]
    fn alignment_is_derived_from_team() {
        assert_eq!(Team::Townsfolk.alignment(), Some(Alignment::Good));
        assert_eq!(Team::Outsider.alignment(), Some(Alignment::Good));
        assert_eq!(Team::Minion.alignment(), Some(Alignment::Evil));
        assert_eq!(Team::Demon.alignment(), Some(Alignment::Evil));
        assert_eq!(Team::Traveller.alignment(), None);
        assert_eq!(Team::Fabled.alignment(), None);
        assert!(!Team::Fabled.is_good() && !Team::Fabled.is_evil());
    }

    #[test]
    fn wake_orders_are_reported() {
        let catalog = RoleCatalog::builtin();
        let imp = catalog.role("imp").unwrap();
        assert!(!imp.wakes_first_night());
        assert!(imp.wakes_other_nights());

        let washerwoman = catalog.role("washerwoman").unwrap();
        assert!(washerwoman.wakes_first_night());
        assert!(!washerwoman.wakes_other_nights());
    }

    fn definition(id: &str, name: &str, roles: &[&str]) -> ScriptDefinition {
        ScriptDefinition {
            id: id.into(),
            name: name.into(),
            author: String::new(),
            author_id: None,
            description: String::new(),
            player_count_min: 1,
            player_count_max: 30,
            roles: roles.iter().map(|role| (*role).to_owned()).collect(),
        }
    }

    #[test]
    fn custom_script_deduplicates_and_rejects_unknown_roles() {
        let catalog = RoleCatalog::builtin();
        let script = catalog
            .add_script(definition(
                "tiny",
                "Tiny",
                &["chef", "empath", "saint", "imp", "chef", "spy"],
            ))
            .unwrap();
        assert_eq!(script.role_count(), 5);
        assert_eq!(script.player_count_min, MIN_PLAYERS);
        assert_eq!(script.player_count_max, MAX_PLAYERS);
        assert!(!script.supports(5));

        let err = catalog
            .add_script(definition("broken", "Broken", &["pit_hag"]))
            .unwrap_err();
        assert_eq!(err, EngineError::UnknownRole("pit_hag".into()));
    }

    #[test]
    fn custom_scripts_follow_composition_rules() {
        let catalog = RoleCatalog::builtin();
        let no_demon = catalog
            .prepare_script(definition(
                "calm",
                "Calm",
                &["chef", "empath", "monk", "saint", "spy"],
            ))
            .unwrap_err();
        assert!(matches!(no_demon, EngineError::InvalidScript(_)));

        let few_good = catalog
            .prepare_script(definition(
                "grim",
                "Grim",
                &["chef", "saint", "spy", "baron", "imp"],
            ))
            .unwrap_err();
        assert!(matches!(few_good, EngineError::InvalidScript(_)));

        let short = catalog
            .prepare_script(definition("short", "Short", &["chef", "monk", "saint", "imp"]))
            .unwrap_err();
        assert!(matches!(short, EngineError::InvalidScript(_)));
    }

    #[test]
    fn script_names_are_unique_regardless_of_case() {
        let catalog = RoleCatalog::builtin();
        let roles = ["chef", "empath", "monk", "spy", "imp"];
        let err = catalog
            .prepare_script(definition("copy", "TROUBLE BREWING", &roles))
            .unwrap_err();
        assert_eq!(err, EngineError::ScriptNameTaken("TROUBLE BREWING".into()));

        catalog.add_script(definition("mine", "Mine", &roles)).unwrap();
        assert!(catalog.prepare_script(definition("mine", "MINE", &roles)).is_ok());
        assert!(catalog.remove_script("mine").is_some());
        assert!(catalog.script("mine").is_none());
    }

    #[test]
    fn slugs_collapse_punctuation() {
        assert_eq!(script_slug("  Sects & Violets! "), "sects-violets");
        assert_eq!(script_slug("Bad Moon Rising 2"), "bad-moon-rising-2");
        assert_eq!(script_slug("!!!"), "");
    }

    #[test]
    fn official_scripts_are_listed_first() {
        let catalog = RoleCatalog::builtin();
        catalog
            .add_script(definition("aaa", "Aaa", &["chef", "empath", "monk", "spy", "imp"]))
            .unwrap();
        let ids: Vec<String> = catalog
            .scripts()
            .iter()
            .map(|script| script.id.clone())
            .collect();
        assert_eq!(ids, [TROUBLE_BREWING_ID, "aaa"]);
    }

    #[test]
    fn trouble_brewing_supports_every_table_size() {
        let catalog = RoleCatalog::builtin();
        let script = catalog.script(TROUBLE_BREWING_ID).unwrap();
        for count in MIN_PLAYERS..=MAX_PLAYERS {
            assert!(script.supports(count), "{count} players should be supported");
        }
        assert!(!script.supports(4));
        assert!(!script.supports(16));
    }
}
