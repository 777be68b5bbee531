use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::error::EngineError;

/// Coarse lifecycle status of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Players are gathering; seats and script can change.
    #[default]
    Lobby,
    /// Night phase; abilities are recorded.
    Night,
    /// Day phase; nominations and votes are accepted.
    Day,
    /// Terminal state. The game is read-only.
    Ended,
}

impl GameStatus {
    /// Whether the game is past the lobby and not yet over.
    pub fn is_running(self) -> bool {
        matches!(self, GameStatus::Night | GameStatus::Day)
    }
}

/// Events that drive the phase engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseEvent {
    /// Host starts the game from the lobby.
    Start,
    /// Host moves to the next half of the day/night cycle.
    Advance,
    /// Game ends, by win condition or host action.
    End,
}

/// Status, night counter and day counter of a single game.
///
/// `phase` counts nights and `day_number` counts days; both only ever increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhaseEngine {
    status: GameStatus,
    phase: u32,
    day_number: u32,
}

impl PhaseEngine {
    /// Engine sitting in the lobby.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an engine from persisted counters.
    pub fn restore(status: GameStatus, phase: u32, day_number: u32) -> Self {
        Self {
            status,
            phase,
            day_number,
        }
    }

    /// Current status.
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Phase counter, one per night or day.
    pub fn phase(&self) -> u32 {
        self.phase
    }

    /// Current day, 0 before the first day.
    pub fn day_number(&self) -> u32 {
        self.day_number
    }

    /// Apply `event`, returning the new status.
    ///
    /// Nothing changes when the event is rejected.
    pub fn apply(&mut self, event: PhaseEvent) -> Result<GameStatus, EngineError> {
        let next = self.compute_transition(event)?;
        *self = next;
        Ok(self.status)
    }

    fn compute_transition(&self, event: PhaseEvent) -> Result<PhaseEngine, EngineError> {
        let next = match (self.status, event) {
            (GameStatus::Ended, _) => return Err(EngineError::GameEnded),
            (GameStatus::Lobby, PhaseEvent::Start) => PhaseEngine {
                status: GameStatus::Night,
                phase: 1,
                day_number: 0,
            },
            (GameStatus::Night, PhaseEvent::Advance) => PhaseEngine {
                status: GameStatus::Day,
                day_number: self.day_number + 1,
                ..*self
            },
            (GameStatus::Day, PhaseEvent::Advance) => PhaseEngine {
                status: GameStatus::Night,
                phase: self.phase + 1,
                ..*self
            },
            (_, PhaseEvent::End) => PhaseEngine {
                status: GameStatus::Ended,
                ..*self
            },
            (from, event) => return Err(EngineError::InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
