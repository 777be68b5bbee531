use std::time::SystemTime;

use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{GameEntity, PlayerEntity},
    state::{
        assignment::RoleAssigner,
        catalog::{Alignment, Role, RoleCatalog, Script},
        distribution::{MAX_PLAYERS, MIN_PLAYERS},
        error::EngineError,
        ledger::{self, Nomination, NominationLedger, Vote, VoteKind, VoteLedger},
        state_machine::{GameStatus, PhaseEngine, PhaseEvent},
        win,
    },
};

const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// Number of characters in a join code.
pub const JOIN_CODE_LEN: usize = 6;

/// Draw a random join code made of uppercase letters and digits.
pub fn generate_join_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..JOIN_CODE_LEN)
        .map(|_| char::from(JOIN_CODE_ALPHABET[rng.random_range(0..JOIN_CODE_ALPHABET.len())]))
        .collect()
}

/// Normalise user input before comparing it against stored join codes.
pub fn normalize_join_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Optional table rules agreed by the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct HouseRules {
    /// Dead players keep a single vote.
    pub allow_dead_vote: bool,
    /// Vote counts are shown to everyone, not only the host.
    pub show_vote_counts: bool,
    /// Players may whisper privately.
    pub allow_whispers: bool,
    /// Phases advance when timers run out.
    pub auto_advance_phases: bool,
}

impl Default for HouseRules {
    fn default() -> Self {
        Self {
            allow_dead_vote: true,
            show_vote_counts: false,
            allow_whispers: true,
            auto_advance_phases: true,
        }
    }
}

/// Per-game configuration. Timers are informational and expressed in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(default)]
pub struct GameSettings {
    /// Seats available, 5 to 15.
    #[validate(range(min = 5, max = 15))]
    pub max_players: usize,
    /// Discussion timer.
    #[validate(range(max = 7200))]
    pub discussion_time: u32,
    /// Voting timer.
    #[validate(range(max = 3600))]
    pub voting_time: u32,
    /// Nomination timer.
    #[validate(range(max = 3600))]
    pub nomination_time: u32,
    /// Optional table rules.
    pub house_rules: HouseRules,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            max_players: MAX_PLAYERS,
            discussion_time: 600,
            voting_time: 120,
            nomination_time: 60,
            house_rules: HouseRules::default(),
        }
    }
}

impl GameSettings {
    /// Clamp values that came from outside into the supported range.
    pub fn normalized(mut self) -> Self {
        self.max_players = self.max_players.clamp(MIN_PLAYERS, MAX_PLAYERS);
        self
    }
}

/// One use of a night ability, as recorded by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityUse {
    /// Ability name, usually the character.
    pub ability: String,
    /// Player the ability targeted.
    pub target_id: Option<Uuid>,
    /// Night (phase) on which the ability was used.
    pub night: u32,
    /// When the use was recorded.
    pub used_at: SystemTime,
}

/// Marker the host places on a player (poisoned, drunk, protected...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    /// Effect name.
    pub name: String,
    /// Remaining duration in phases, `None` when open ended.
    pub duration: Option<u32>,
    /// What applied the effect, usually a character id.
    pub source: Option<String>,
    /// When the effect was placed.
    pub applied_at: SystemTime,
}

/// Why a game reached the ended state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// A kill left the table in a decided state.
    WinCondition,
    /// The host ended the game.
    HostDecision,
    /// The host walked away.
    HostLeft,
}

/// A seat at the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Seat identifier, distinct from the user id.
    pub id: Uuid,
    /// User sitting in this seat.
    pub user_id: Uuid,
    /// Username at the time of joining.
    pub username: String,
    /// Seating position. Positions in a game are always `0..n` without gaps.
    pub position: u32,
    /// Whether the player is still alive.
    pub is_alive: bool,
    /// Ready flag used in the lobby.
    pub is_ready: bool,
    /// Votes left, a dead player keeps one.
    pub votes_remaining: u8,
    /// When the player took the seat.
    pub joined_at: SystemTime,
    /// When the player died, if dead.
    pub died_at: Option<SystemTime>,
    /// Assigned once when the game starts.
    pub role: Option<Role>,
    /// Night abilities the host recorded.
    pub abilities_used: Vec<AbilityUse>,
    /// Active status effects.
    pub status_effects: Vec<StatusEffect>,
    /// Free text only the host can read.
    pub notes: String,
}

impl Player {
    /// Fresh, not-ready seat for `user_id`.
    pub fn new(user_id: Uuid, username: String, position: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            username,
            position,
            is_alive: true,
            is_ready: false,
            votes_remaining: 1,
            joined_at: SystemTime::now(),
            died_at: None,
            role: None,
            abilities_used: Vec::new(),
            status_effects: Vec::new(),
            notes: String::new(),
        }
    }

    /// Team alignment of the assigned role.
    pub fn alignment(&self) -> Option<Alignment> {
        self.role.as_ref().and_then(Role::alignment)
    }

    /// Whether an effect named `name` is active.
    pub fn has_status_effect(&self, name: &str) -> bool {
        self.status_effects.iter().any(|effect| effect.name == name)
    }
}

/// Result of a user leaving the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// Seat that was vacated, when the game was still in the lobby.
    pub removed: Option<Player>,
    /// New host user id when hosting moved to another player.
    pub new_host: Option<Uuid>,
    /// The departure ends the game.
    pub ends_game: bool,
}

/// Players on either side of a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbors<'a> {
    /// Seat to the left.
    pub left: &'a Player,
    /// Seat to the right.
    pub right: &'a Player,
}

/// Aggregate root for a single game.
#[derive(Debug, Clone)]
pub struct GameSession {
    /// Primary key of the game.
    pub id: Uuid,
    /// Uppercase code players use to join.
    pub join_code: String,
    /// User id of the storyteller running the game.
    pub host_id: Uuid,
    /// Script picked for the game.
    pub script_id: Option<String>,
    /// Settings fixed at creation.
    pub settings: GameSettings,
    /// Winning team once decided.
    pub winner: Option<Alignment>,
    /// Why the game ended.
    pub end_reason: Option<EndReason>,
    clock: PhaseEngine,
    nominations: NominationLedger,
    votes: VoteLedger,
    /// Kept sorted by position.
    players: Vec<Player>,
    /// When the lobby was opened.
    pub created_at: SystemTime,
    /// When roles were dealt.
    pub started_at: Option<SystemTime>,
    /// When the game ended.
    pub ended_at: Option<SystemTime>,
    /// Last change.
    pub updated_at: SystemTime,
}

impl GameSession {
    /// Create a lobby with the host already seated and ready.
    pub fn new(
        host_id: Uuid,
        host_name: String,
        join_code: String,
        script_id: Option<String>,
        settings: GameSettings,
    ) -> Self {
        let now = SystemTime::now();
        let mut host = Player::new(host_id, host_name, 0);
        host.is_ready = true;

        Self {
            id: Uuid::new_v4(),
            join_code,
            host_id,
            script_id,
            settings: settings.normalized(),
            winner: None,
            end_reason: None,
            clock: PhaseEngine::new(),
            nominations: NominationLedger::new(),
            votes: VoteLedger::new(),
            players: vec![host],
            created_at: now,
            started_at: None,
            ended_at: None,
            updated_at: now,
        }
    }

    /// Current lifecycle status.
    pub fn status(&self) -> GameStatus {
        self.clock.status()
    }

    /// Phase counter, one per night or day.
    pub fn phase(&self) -> u32 {
        self.clock.phase()
    }

    /// Current day, 0 before the first day.
    pub fn day_number(&self) -> u32 {
        self.clock.day_number()
    }

    /// Seats in table order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Seats of living players in table order.
    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|player| player.is_alive)
    }

    /// Open nominations of the current day.
    pub fn nominations(&self) -> &[Nomination] {
        self.nominations.entries()
    }

    /// Every vote cast in the game.
    pub fn votes(&self) -> &[Vote] {
        self.votes.votes()
    }

    /// Vote ledger, for tallies.
    pub fn vote_ledger(&self) -> &VoteLedger {
        &self.votes
    }

    /// Whether `user_id` hosts the game.
    pub fn is_host(&self, user_id: Uuid) -> bool {
        self.host_id == user_id
    }

    /// Seat with this player id.
    pub fn player(&self, player_id: Uuid) -> Result<&Player, EngineError> {
        find_player(&self.players, player_id)
    }

    fn player_mut(&mut self, player_id: Uuid) -> Result<&mut Player, EngineError> {
        self.players
            .iter_mut()
            .find(|player| player.id == player_id)
            .ok_or(EngineError::UnknownPlayer(player_id))
    }

    /// Seat `user_id` occupies, if any.
    pub fn player_by_user(&self, user_id: Uuid) -> Option<&Player> {
        self.players.iter().find(|player| player.user_id == user_id)
    }

    /// User ids of everyone seated.
    pub fn participant_ids(&self) -> Vec<Uuid> {
        self.players.iter().map(|player| player.user_id).collect()
    }

    /// Fail with [`EngineError::GameEnded`] once the game is over.
    pub fn ensure_not_ended(&self) -> Result<(), EngineError> {
        if self.status() == GameStatus::Ended {
            return Err(EngineError::GameEnded);
        }
        Ok(())
    }

    fn ensure_lobby(&self) -> Result<(), EngineError> {
        self.ensure_not_ended()?;
        if self.status() != GameStatus::Lobby {
            return Err(EngineError::LobbyClosed);
        }
        Ok(())
    }

    fn ensure_running(&self) -> Result<(), EngineError> {
        match self.status() {
            GameStatus::Lobby => Err(EngineError::GameNotStarted),
            GameStatus::Ended => Err(EngineError::GameEnded),
            GameStatus::Night | GameStatus::Day => Ok(()),
        }
    }

    fn touch(&mut self) {
        self.updated_at = SystemTime::now();
    }

    /// Seat a new player on the lowest free position.
    pub fn seat(&mut self, user_id: Uuid, username: String) -> Result<&Player, EngineError> {
        self.ensure_lobby()?;
        if self.player_by_user(user_id).is_some() {
            return Err(EngineError::AlreadyJoined(user_id));
        }
        if self.players.len() >= self.settings.max_players {
            return Err(EngineError::GameFull(self.settings.max_players));
        }

        let position = (0u32..)
            .find(|candidate| !self.players.iter().any(|p| p.position == *candidate))
            .unwrap_or_default();
        let index = self
            .players
            .iter()
            .position(|player| player.position > position)
            .unwrap_or(self.players.len());
        self.players
            .insert(index, Player::new(user_id, username, position));
        self.touch();
        Ok(&self.players[index])
    }

    /// Remove `user_id` from the table.
    ///
    /// Once the game has started only the host may leave, which ends the game. The caller is
    /// responsible for calling [`GameSession::end`] when `ends_game` is set.
    pub fn unseat(&mut self, user_id: Uuid) -> Result<LeaveOutcome, EngineError> {
        self.ensure_not_ended()?;
        let is_host = self.is_host(user_id);
        let index = self
            .players
            .iter()
            .position(|player| player.user_id == user_id);

        if self.status() != GameStatus::Lobby {
            if !is_host {
                return Err(EngineError::LobbyClosed);
            }
            return Ok(LeaveOutcome {
                removed: None,
                new_host: None,
                ends_game: true,
            });
        }

        let removed = match index {
            Some(index) => Some(self.players.remove(index)),
            None if is_host => None,
            None => return Err(EngineError::UnknownPlayer(user_id)),
        };
        for (position, player) in (0u32..).zip(self.players.iter_mut()) {
            player.position = position;
        }
        self.touch();

        let mut outcome = LeaveOutcome {
            removed,
            new_host: None,
            ends_game: false,
        };
        if is_host {
            match self.players.first() {
                Some(successor) => {
                    self.host_id = successor.user_id;
                    outcome.new_host = Some(successor.user_id);
                }
                None => outcome.ends_game = true,
            }
        }
        Ok(outcome)
    }

    /// Flip the ready flag of `user_id`, returning the new value.
    pub fn toggle_ready(&mut self, user_id: Uuid) -> Result<bool, EngineError> {
        self.ensure_lobby()?;
        let player = self
            .players
            .iter_mut()
            .find(|player| player.user_id == user_id)
            .ok_or(EngineError::UnknownPlayer(user_id))?;
        player.is_ready = !player.is_ready;
        let ready = player.is_ready;
        self.touch();
        Ok(ready)
    }

    /// Pick the script while in the lobby.
    pub fn set_script(&mut self, script: &Script) -> Result<(), EngineError> {
        self.ensure_lobby()?;
        self.script_id = Some(script.id.clone());
        self.touch();
        Ok(())
    }

    /// Lobby status, a legal player count and every player ready.
    pub fn can_start(&self) -> bool {
        let count = self.players.len();
        self.status() == GameStatus::Lobby
            && count >= MIN_PLAYERS
            && count <= self.settings.max_players
            && self.players.iter().all(|player| player.is_ready)
    }

    /// Hand out roles and move to the first night.
    ///
    /// The game is left untouched unless every step succeeds.
    pub fn start<R: Rng>(
        &mut self,
        script: &Script,
        assigner: &mut RoleAssigner<R>,
    ) -> Result<(), EngineError> {
        self.ensure_not_ended()?;
        if !self.can_start() {
            return Err(EngineError::PreconditionNotMet);
        }

        let seats: Vec<Uuid> = self.players.iter().map(|player| player.id).collect();
        let mut assignment = assigner.assign(script, &seats)?;
        let mut clock = self.clock;
        clock.apply(PhaseEvent::Start)?;

        for player in &mut self.players {
            player.role = assignment.swap_remove(&player.id);
        }
        ledger::reset_votes(self.players.iter_mut(), self.settings.house_rules.allow_dead_vote);
        self.clock = clock;
        self.script_id = Some(script.id.clone());
        self.nominations.clear();
        let now = SystemTime::now();
        self.started_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Move day to night or night to day, returning the new status.
    pub fn advance(&mut self) -> Result<GameStatus, EngineError> {
        let status = self.clock.apply(PhaseEvent::Advance)?;
        self.nominations.clear();
        if status == GameStatus::Day {
            ledger::reset_votes(
                self.players.iter_mut(),
                self.settings.house_rules.allow_dead_vote,
            );
        }
        self.touch();
        Ok(status)
    }

    /// End the game, returning the user ids whose games-played counter should move.
    pub fn end(
        &mut self,
        winner: Option<Alignment>,
        reason: EndReason,
    ) -> Result<Vec<Uuid>, EngineError> {
        self.clock.apply(PhaseEvent::End)?;
        self.nominations.clear();
        self.winner = winner;
        self.end_reason = Some(reason);
        let now = SystemTime::now();
        self.ended_at = Some(now);
        self.updated_at = now;
        Ok(self.participant_ids())
    }

    /// Record a nomination for today.
    pub fn nominate(
        &mut self,
        nominator_id: Uuid,
        nominee_id: Uuid,
    ) -> Result<Nomination, EngineError> {
        self.ensure_not_ended()?;
        if self.status() != GameStatus::Day {
            return Err(EngineError::NoNominationsAllowed(self.status()));
        }
        let day_number = self.day_number();
        let nominator = find_player(&self.players, nominator_id)?;
        let nominee = find_player(&self.players, nominee_id)?;
        let nomination =
            self.nominations
                .nominate(nominator, nominee, day_number, SystemTime::now())?;
        self.touch();
        Ok(nomination)
    }

    /// Spend a vote, or abstain with no target.
    pub fn cast_vote(
        &mut self,
        voter_id: Uuid,
        target_id: Option<Uuid>,
        kind: VoteKind,
    ) -> Result<Vote, EngineError> {
        if let Some(target_id) = target_id {
            self.player(target_id)?;
        }
        let status = self.status();
        let day_number = self.day_number();
        let voter = self
            .players
            .iter_mut()
            .find(|player| player.id == voter_id)
            .ok_or(EngineError::UnknownPlayer(voter_id))?;
        let vote = self.votes.cast(
            status,
            voter,
            target_id,
            kind,
            day_number,
            SystemTime::now(),
        )?;
        self.touch();
        Ok(vote)
    }

    /// Kill a player and report whether the table is now decided.
    pub fn kill(&mut self, player_id: Uuid) -> Result<Option<Alignment>, EngineError> {
        self.ensure_running()?;
        let allow_dead_vote = self.settings.house_rules.allow_dead_vote;
        let player = self.player_mut(player_id)?;
        if !player.is_alive {
            return Err(EngineError::AlreadyDead(player_id));
        }
        player.is_alive = false;
        player.died_at = Some(SystemTime::now());
        // A vote already spent today stays spent.
        if !allow_dead_vote {
            player.votes_remaining = 0;
        }
        self.touch();
        Ok(self.check_win_condition())
    }

    /// Bring a dead player back. Their vote only returns if they have not voted today.
    pub fn resurrect(&mut self, player_id: Uuid) -> Result<(), EngineError> {
        self.ensure_running()?;
        let voted_today = self.votes.has_voted(player_id, self.day_number());
        let player = self.player_mut(player_id)?;
        if player.is_alive {
            return Err(EngineError::NotDead(player_id));
        }
        player.is_alive = true;
        player.died_at = None;
        player.votes_remaining = u8::from(!voted_today);
        self.touch();
        Ok(())
    }

    /// Append a night ability use to the player's history.
    pub fn record_action(
        &mut self,
        player_id: Uuid,
        ability: String,
        target_id: Option<Uuid>,
    ) -> Result<AbilityUse, EngineError> {
        self.ensure_not_ended()?;
        if self.status() != GameStatus::Night {
            return Err(EngineError::NoActionsAllowed(self.status()));
        }
        if let Some(target_id) = target_id {
            self.player(target_id)?;
        }
        let record = AbilityUse {
            ability,
            target_id,
            night: self.phase(),
            used_at: SystemTime::now(),
        };
        self.player_mut(player_id)?
            .abilities_used
            .push(record.clone());
        self.touch();
        Ok(record)
    }

    /// Place a status effect on a player.
    pub fn add_status_effect(
        &mut self,
        player_id: Uuid,
        name: String,
        duration: Option<u32>,
        source: Option<String>,
    ) -> Result<StatusEffect, EngineError> {
        self.ensure_not_ended()?;
        let effect = StatusEffect {
            name,
            duration,
            source,
            applied_at: SystemTime::now(),
        };
        self.player_mut(player_id)?
            .status_effects
            .push(effect.clone());
        self.touch();
        Ok(effect)
    }

    /// Remove every effect called `name`, returning whether anything was removed.
    pub fn remove_status_effect(
        &mut self,
        player_id: Uuid,
        name: &str,
    ) -> Result<bool, EngineError> {
        self.ensure_not_ended()?;
        let player = self.player_mut(player_id)?;
        let before = player.status_effects.len();
        player.status_effects.retain(|effect| effect.name != name);
        let removed = player.status_effects.len() != before;
        self.touch();
        Ok(removed)
    }

    /// Replace the host notes about a player.
    pub fn set_notes(&mut self, player_id: Uuid, notes: String) -> Result<(), EngineError> {
        self.ensure_not_ended()?;
        self.player_mut(player_id)?.notes = notes;
        self.touch();
        Ok(())
    }

    /// Seats on either side of `player_id`, wrapping around the table.
    pub fn neighbors(&self, player_id: Uuid) -> Result<Option<Neighbors<'_>>, EngineError> {
        self.player(player_id)?;
        let seats: Vec<&Player> = self.players.iter().collect();
        Ok(ring_neighbors(&seats, player_id))
    }

    /// Nearest alive seats on either side. `None` for dead players or a lone survivor.
    pub fn alive_neighbors(&self, player_id: Uuid) -> Result<Option<Neighbors<'_>>, EngineError> {
        self.player(player_id)?;
        let seats: Vec<&Player> = self.alive_players().collect();
        Ok(ring_neighbors(&seats, player_id))
    }

    /// Winner decided by the living players, if any.
    pub fn check_win_condition(&self) -> Option<Alignment> {
        win::evaluate(
            self.alive_players()
                .map(|player| player.role.as_ref().map(|role| role.team)),
        )
    }

    /// Rebuild a game from its persisted form, resolving roles through `catalog`.
    pub fn restore(entity: GameEntity, catalog: &RoleCatalog) -> Result<Self, EngineError> {
        let mut players = entity
            .players
            .into_iter()
            .map(|player| Player::restore(player, catalog))
            .collect::<Result<Vec<_>, _>>()?;
        players.sort_by_key(|player| player.position);

        Ok(Self {
            id: entity.id,
            join_code: entity.join_code,
            host_id: entity.host_id,
            script_id: entity.script_id,
            settings: entity.settings,
            winner: entity.winner,
            end_reason: entity.end_reason,
            clock: PhaseEngine::restore(entity.status, entity.phase, entity.day_number),
            nominations: NominationLedger::restore(entity.nominations),
            votes: VoteLedger::restore(entity.votes),
            players,
            created_at: entity.created_at,
            started_at: entity.started_at,
            ended_at: entity.ended_at,
            updated_at: entity.updated_at,
        })
    }
}

fn find_player(players: &[Player], player_id: Uuid) -> Result<&Player, EngineError> {
    players
        .iter()
        .find(|player| player.id == player_id)
        .ok_or(EngineError::UnknownPlayer(player_id))
}

fn ring_neighbors<'a>(seats: &[&'a Player], player_id: Uuid) -> Option<Neighbors<'a>> {
    let count = seats.len();
    if count <= 1 {
        return None;
    }
    let index = seats.iter().position(|player| player.id == player_id)?;
    Some(Neighbors {
        left: seats[(index + count - 1) % count],
        right: seats[(index + 1) % count],
    })
}

impl Player {
    fn restore(entity: PlayerEntity, catalog: &RoleCatalog) -> Result<Self, EngineError> {
        let role = entity
            .role_id
            .map(|id| {
                catalog
                    .role(&id)
                    .cloned()
                    .ok_or(EngineError::UnknownRole(id))
            })
            .transpose()?;

        Ok(Self {
            id: entity.id,
            user_id: entity.user_id,
            username: entity.username,
            position: entity.position,
            is_alive: entity.is_alive,
            is_ready: entity.is_ready,
            votes_remaining: entity.votes_remaining,
            joined_at: entity.joined_at,
            died_at: entity.died_at,
            role,
            abilities_used: entity.abilities_used,
            status_effects: entity.status_effects,
            notes: entity.notes,
        })
    }
}

impl From<&Player> for PlayerEntity {
    fn from(value: &Player) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            username: value.username.clone(),
            position: value.position,
            is_alive: value.is_alive,
            is_ready: value.is_ready,
            votes_remaining: value.votes_remaining,
            joined_at: value.joined_at,
            died_at: value.died_at,
            role_id: value.role.as_ref().map(|role| role.character_id.clone()),
            abilities_used: value.abilities_used.clone(),
            status_effects: value.status_effects.clone(),
            notes: value.notes.clone(),
        }
    }
}

impl From<&GameSession> for GameEntity {
    fn from(value: &GameSession) -> Self {
        Self {
            id: value.id,
            join_code: value.join_code.clone(),
            host_id: value.host_id,
            script_id: value.script_id.clone(),
            status: value.status(),
            phase: value.phase(),
            day_number: value.day_number(),
            winner: value.winner,
            end_reason: value.end_reason,
            settings: value.settings,
            nominations: value.nominations.entries().to_vec(),
            votes: value.votes.votes().to_vec(),
            players: value.players.iter().map(Into::into).collect(),
            created_at: value.created_at,
            started_at: value.started_at,
            ended_at: value.ended_at,
            updated_at: value.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::state::catalog::{TROUBLE_BREWING_ID, Team};

    fn lobby(players: usize) -> GameSession {
        let host = Uuid::new_v4();
        let mut game = GameSession::new(
            host,
            "host".into(),
            "ABC123".into(),
            Some(TROUBLE_BREWING_ID.into()),
            GameSettings::default(),
        );
        for index in 1..players {
            game.seat(Uuid::new_v4(), format!("player-{index}")).unwrap();
        }
        game
    }

    fn ready_all(game: &mut GameSession) {
        let waiting: Vec<Uuid> = game
            .players()
            .iter()
            .filter(|player| !player.is_ready)
            .map(|player| player.user_id)
            .collect();
        for user_id in waiting {
            game.toggle_ready(user_id).unwrap();
        }
    }

    fn started(players: usize, seed: u64) -> GameSession {
        let catalog = RoleCatalog::builtin();
        let script = catalog.script(TROUBLE_BREWING_ID).unwrap();
        let mut game = lobby(players);
        ready_all(&mut game);
        game.start(&script, &mut RoleAssigner::seeded(seed)).unwrap();
        game
    }

    fn player_id_with_team(game: &GameSession, team: Team) -> Uuid {
        game.players()
            .iter()
            .find(|player| player.role.as_ref().map(|role| role.team) == Some(team))
            .map(|player| player.id)
            .unwrap()
    }

    #[test]
    fn join_code_uses_upper_alphanumerics() {
        let mut rng = StdRng::seed_from_u64(9);
        let code = generate_join_code(&mut rng);
        assert_eq!(code.len(), JOIN_CODE_LEN);
        assert!(
            code.chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
        assert_eq!(normalize_join_code("  abc12x "), "ABC12X");
    }

    #[test]
    fn host_is_seated_first_and_ready() {
        let game = lobby(1);
        let host = &game.players()[0];
        assert_eq!(host.user_id, game.host_id);
        assert_eq!(host.position, 0);
        assert!(host.is_ready);
    }

    #[test]
    fn seats_fill_lowest_free_position() {
        let mut game = lobby(4);
        let leaving = game.players()[1].user_id;
        game.unseat(leaving).unwrap();

        let positions: Vec<u32> = game.players().iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);

        let seated = game.seat(Uuid::new_v4(), "late".into()).unwrap();
        assert_eq!(seated.position, 3);
        assert!(!seated.is_ready);
    }

    #[test]
    fn seating_rules_are_enforced() {
        let mut game = lobby(5);
        let host = game.host_id;
        assert_eq!(
            game.seat(host, "again".into()).unwrap_err(),
            EngineError::AlreadyJoined(host)
        );

        game.settings.max_players = 5;
        assert_eq!(
            game.seat(Uuid::new_v4(), "sixth".into()).unwrap_err(),
            EngineError::GameFull(5)
        );
    }

    #[test]
    fn host_leaving_lobby_transfers_hosting() {
        let mut game = lobby(3);
        let old_host = game.host_id;
        let successor = game.players()[1].user_id;

        let outcome = game.unseat(old_host).unwrap();
        assert_eq!(outcome.new_host, Some(successor));
        assert!(!outcome.ends_game);
        assert_eq!(game.host_id, successor);
        assert_eq!(game.players()[0].position, 0);
    }

    #[test]
    fn last_player_leaving_ends_game() {
        let mut game = lobby(1);
        let outcome = game.unseat(game.host_id).unwrap();
        assert!(outcome.ends_game);
    }

    #[test]
    fn only_host_can_leave_started_game() {
        let mut game = started(5, 1);
        let guest = game.players()[2].user_id;
        assert_eq!(game.unseat(guest).unwrap_err(), EngineError::LobbyClosed);

        let outcome = game.unseat(game.host_id).unwrap();
        assert!(outcome.ends_game);
        assert_eq!(game.players().len(), 5);
    }

    #[test]
    fn start_requires_everyone_ready() {
        let catalog = RoleCatalog::builtin();
        let script = catalog.script(TROUBLE_BREWING_ID).unwrap();
        let mut game = lobby(7);

        assert!(!game.can_start());
        assert_eq!(
            game.start(&script, &mut RoleAssigner::seeded(1)).unwrap_err(),
            EngineError::PreconditionNotMet
        );
        assert_eq!(game.status(), GameStatus::Lobby);
        assert!(game.players().iter().all(|p| p.role.is_none()));
    }

    #[test]
    fn start_requires_five_players() {
        let catalog = RoleCatalog::builtin();
        let script = catalog.script(TROUBLE_BREWING_ID).unwrap();
        let mut game = lobby(4);
        ready_all(&mut game);

        assert_eq!(
            game.start(&script, &mut RoleAssigner::seeded(1)).unwrap_err(),
            EngineError::PreconditionNotMet
        );
        assert!(game.started_at.is_none());
    }

    #[test]
    fn seven_player_start_enters_first_night() {
        let game = started(7, 11);

        assert_eq!(game.status(), GameStatus::Night);
        assert_eq!(game.phase(), 1);
        assert_eq!(game.day_number(), 0);
        assert!(game.started_at.is_some());

        let count = |team| {
            game.players()
                .iter()
                .filter(|p| p.role.as_ref().map(|r| r.team) == Some(team))
                .count()
        };
        assert_eq!(count(Team::Townsfolk), 5);
        assert_eq!(count(Team::Outsider), 0);
        assert_eq!(count(Team::Minion), 1);
        assert_eq!(count(Team::Demon), 1);
    }

    #[test]
    fn advance_clears_nominations_and_resets_votes() {
        let mut game = started(6, 2);
        game.advance().unwrap();
        let a = game.players()[0].id;
        let b = game.players()[1].id;
        let c = game.players()[2].id;

        game.nominate(a, b).unwrap();
        assert_eq!(
            game.nominate(a, c).unwrap_err(),
            EngineError::AlreadyNominated(a)
        );
        game.cast_vote(a, Some(b), VoteKind::Execution).unwrap();
        assert_eq!(game.player(a).unwrap().votes_remaining, 0);

        assert_eq!(game.advance().unwrap(), GameStatus::Night);
        assert!(game.nominations().is_empty());
        assert_eq!(
            game.nominate(a, c).unwrap_err(),
            EngineError::NoNominationsAllowed(GameStatus::Night)
        );

        assert_eq!(game.advance().unwrap(), GameStatus::Day);
        assert_eq!(game.day_number(), 2);
        assert_eq!(game.player(a).unwrap().votes_remaining, 1);
        assert!(game.nominate(a, c).is_ok());
    }

    #[test]
    fn votes_are_rejected_at_night() {
        let mut game = started(5, 3);
        let voter = game.players()[0].id;
        assert_eq!(
            game.cast_vote(voter, None, VoteKind::Execution).unwrap_err(),
            EngineError::NoVotingAllowed(GameStatus::Night)
        );
    }

    #[test]
    fn killing_the_demon_hands_good_the_win() {
        let mut game = started(7, 5);
        let demon = player_id_with_team(&game, Team::Demon);

        assert_eq!(game.kill(demon).unwrap(), Some(Alignment::Good));
        let dead = game.player(demon).unwrap();
        assert!(!dead.is_alive);
        assert!(dead.died_at.is_some());
        assert_eq!(dead.votes_remaining, 1);
    }

    #[test]
    fn dead_players_lose_vote_without_house_rule() {
        let mut game = started(7, 6);
        game.settings.house_rules.allow_dead_vote = false;
        let townsfolk = player_id_with_team(&game, Team::Townsfolk);

        assert_eq!(game.kill(townsfolk).unwrap(), None);
        assert_eq!(game.player(townsfolk).unwrap().votes_remaining, 0);

        game.resurrect(townsfolk).unwrap();
        let player = game.player(townsfolk).unwrap();
        assert!(player.is_alive);
        assert_eq!(player.votes_remaining, 1);
    }

    #[test]
    fn killing_a_dead_player_is_rejected() {
        let mut game = started(7, 13);
        let townsfolk = player_id_with_team(&game, Team::Townsfolk);
        game.kill(townsfolk).unwrap();
        let died_at = game.player(townsfolk).unwrap().died_at;

        assert_eq!(
            game.kill(townsfolk).unwrap_err(),
            EngineError::AlreadyDead(townsfolk)
        );
        assert_eq!(game.player(townsfolk).unwrap().died_at, died_at);
    }

    #[test]
    fn resurrecting_a_living_voter_does_not_refund_the_vote() {
        let mut game = started(6, 14);
        game.advance().unwrap();
        let voter = game.players()[1].id;
        let target = game.players()[2].id;
        game.cast_vote(voter, Some(target), VoteKind::Execution)
            .unwrap();

        assert_eq!(
            game.resurrect(voter).unwrap_err(),
            EngineError::NotDead(voter)
        );
        assert_eq!(game.player(voter).unwrap().votes_remaining, 0);
        assert_eq!(
            game.cast_vote(voter, Some(target), VoteKind::Execution)
                .unwrap_err(),
            EngineError::NoVotesRemaining(voter)
        );
    }

    #[test]
    fn dying_and_returning_on_the_same_day_keeps_the_vote_spent() {
        let mut game = started(6, 15);
        game.advance().unwrap();
        let voter = game.players()[1].id;
        let target = game.players()[2].id;
        game.cast_vote(voter, Some(target), VoteKind::Execution)
            .unwrap();

        game.kill(voter).unwrap();
        assert_eq!(game.player(voter).unwrap().votes_remaining, 0);
        game.resurrect(voter).unwrap();
        assert_eq!(game.player(voter).unwrap().votes_remaining, 0);

        game.advance().unwrap();
        game.advance().unwrap();
        assert_eq!(game.player(voter).unwrap().votes_remaining, 1);
    }

    #[test]
    fn abilities_are_night_only() {
        let mut game = started(5, 7);
        let actor = game.players()[1].id;
        let target = game.players()[2].id;

        let record = game
            .record_action(actor, "poison".into(), Some(target))
            .unwrap();
        assert_eq!(record.night, 1);
        assert_eq!(game.player(actor).unwrap().abilities_used.len(), 1);

        game.advance().unwrap();
        assert_eq!(
            game.record_action(actor, "poison".into(), None).unwrap_err(),
            EngineError::NoActionsAllowed(GameStatus::Day)
        );
    }

    #[test]
    fn status_effects_can_be_added_and_removed() {
        let mut game = started(5, 8);
        let target = game.players()[3].id;

        game.add_status_effect(target, "poisoned".into(), Some(1), Some("poisoner".into()))
            .unwrap();
        assert!(game.player(target).unwrap().has_status_effect("poisoned"));

        assert!(game.remove_status_effect(target, "poisoned").unwrap());
        assert!(!game.remove_status_effect(target, "poisoned").unwrap());
        assert!(!game.player(target).unwrap().has_status_effect("poisoned"));
    }

    #[test]
    fn neighbors_wrap_and_skip_the_dead() {
        let mut game = started(5, 9);
        let ids: Vec<Uuid> = game.players().iter().map(|p| p.id).collect();

        let around = game.neighbors(ids[0]).unwrap().unwrap();
        assert_eq!(around.left.id, ids[4]);
        assert_eq!(around.right.id, ids[1]);

        game.kill(ids[1]).unwrap();
        game.kill(ids[4]).unwrap();
        let around = game.alive_neighbors(ids[0]).unwrap().unwrap();
        assert_eq!(around.left.id, ids[3]);
        assert_eq!(around.right.id, ids[2]);
        assert!(game.alive_neighbors(ids[1]).unwrap().is_none());
    }

    #[test]
    fn ended_games_are_read_only() {
        let mut game = started(5, 10);
        let participants = game.end(Some(Alignment::Evil), EndReason::HostDecision).unwrap();
        assert_eq!(participants.len(), 5);
        assert_eq!(game.winner, Some(Alignment::Evil));
        assert!(game.ended_at.is_some());

        assert_eq!(game.advance().unwrap_err(), EngineError::GameEnded);
        assert_eq!(
            game.end(None, EndReason::HostDecision).unwrap_err(),
            EngineError::GameEnded
        );
        let someone = game.players()[0].id;
        assert_eq!(game.kill(someone).unwrap_err(), EngineError::GameEnded);
    }

    #[test]
    fn entity_round_trip_keeps_roles() {
        let catalog = RoleCatalog::builtin();
        let game = started(6, 12);
        let restored = GameSession::restore(GameEntity::from(&game), &catalog).unwrap();

        assert_eq!(restored.status(), game.status());
        assert_eq!(restored.phase(), game.phase());
        assert_eq!(restored.players(), game.players());
    }
}
