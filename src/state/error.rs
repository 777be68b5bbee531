use thiserror::Error;
use uuid::Uuid;

use crate::state::{
    catalog::Team,
    state_machine::{GameStatus, PhaseEvent},
};

/// Validation failures raised by the game engine.
///
/// Every variant is recoverable: the game aggregate is left exactly as it was
/// before the failing call, so callers can surface the error and keep going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The script cannot supply enough roles of a team for the player count.
    #[error("script supplies {available} {team:?} role(s) but {required} are required")]
    InsufficientRoles {
        /// Team that falls short.
        team: Team,
        /// Roles the setup needs.
        required: usize,
        /// Roles the script offers.
        available: usize,
    },
    /// The nominator already has an open nomination today.
    #[error("player `{0}` has already nominated today")]
    AlreadyNominated(Uuid),
    /// Dead players cannot nominate.
    #[error("dead players cannot nominate")]
    DeadNominator,
    /// Dead players cannot be nominated.
    #[error("dead players cannot be nominated")]
    DeadNominee,
    /// A player tried to nominate themselves.
    #[error("players cannot nominate themselves")]
    SelfNomination,
    /// Nominations are only accepted during the day.
    #[error("nominations are only allowed during the day (current status {0:?})")]
    NoNominationsAllowed(GameStatus),
    /// Votes are only accepted during the day.
    #[error("voting is only allowed during the day (current status {0:?})")]
    NoVotingAllowed(GameStatus),
    /// The voter has already spent their vote.
    #[error("player `{0}` has no votes remaining")]
    NoVotesRemaining(Uuid),
    /// Night abilities can only be recorded at night.
    #[error("abilities can only be recorded at night (current status {0:?})")]
    NoActionsAllowed(GameStatus),
    /// No distribution exists for this number of players.
    #[error("unsupported player count {0}")]
    InvalidPlayerCount(usize),
    /// `start` was called while the lobby is not ready.
    #[error("game cannot be started: check status, player count and ready flags")]
    PreconditionNotMet,
    /// The game has ended and is read-only.
    #[error("game has already ended")]
    GameEnded,
    /// The operation needs a started game.
    #[error("game has not started yet")]
    GameNotStarted,
    /// The event is not valid from the current status.
    #[error("invalid transition: {event:?} cannot be applied while {from:?}")]
    InvalidTransition { from: GameStatus, event: PhaseEvent },
    /// Lobby-only operation attempted after the game started.
    #[error("game is no longer accepting lobby changes")]
    LobbyClosed,
    /// The user already has a seat in this game.
    #[error("user `{0}` is already seated in this game")]
    AlreadyJoined(Uuid),
    /// The game reached its configured player limit.
    #[error("game is full ({0} players)")]
    GameFull(usize),
    /// No player with this identifier belongs to the game.
    #[error("unknown player `{0}`")]
    UnknownPlayer(Uuid),
    /// The catalog has no role with this character id.
    #[error("unknown role `{0}`")]
    UnknownRole(String),
    /// The catalog has no script with this identifier.
    #[error("unknown script `{0}`")]
    UnknownScript(String),
    /// The game has no script selected.
    #[error("no script selected for this game")]
    NoScript,
    /// The player is already dead.
    #[error("player `{0}` is already dead")]
    AlreadyDead(Uuid),
    /// Only dead players can be resurrected.
    #[error("player `{0}` is not dead")]
    NotDead(Uuid),
    /// Another script already uses this name.
    #[error("a script named `{0}` already exists")]
    ScriptNameTaken(String),
    /// A custom script breaks a composition rule.
    #[error("invalid script: {0}")]
    InvalidScript(String),
}
