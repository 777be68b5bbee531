//! Notifications and action records a game mutation produces before it is committed.

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

/// Vocabulary of notifications a game emits after a successful change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A lobby was opened.
    GameCreated,
    /// A player took a seat.
    PlayerJoined,
    /// A player left the lobby.
    PlayerLeft,
    /// A player toggled ready.
    PlayerReadyChanged,
    /// Another user became host.
    HostTransferred,
    /// The lobby picked a different script.
    ScriptChanged,
    /// Roles were dealt.
    GameStarted,
    /// The game moved to another phase.
    PhaseChanged,
    /// A nomination was made.
    PlayerNominated,
    /// A vote was recorded.
    VoteCast,
    /// A player died.
    PlayerDied,
    /// A dead player returned.
    PlayerResurrected,
    /// An ability use was recorded.
    AbilityUsed,
    /// A status effect was added or removed.
    StatusEffectChanged,
    /// The game finished.
    GameEnded,
    /// A snapshot was saved.
    StateSaved,
    /// A snapshot was restored.
    StateLoaded,
    /// A logged action was marked undone.
    ActionUndone,
}

impl EventKind {
    /// Wire name used for the SSE event field and the audit log.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::GameCreated => "game_created",
            EventKind::PlayerJoined => "player_joined",
            EventKind::PlayerLeft => "player_left",
            EventKind::PlayerReadyChanged => "player_ready_changed",
            EventKind::HostTransferred => "host_transferred",
            EventKind::ScriptChanged => "script_changed",
            EventKind::GameStarted => "game_started",
            EventKind::PhaseChanged => "phase_changed",
            EventKind::PlayerNominated => "player_nominated",
            EventKind::VoteCast => "vote_cast",
            EventKind::PlayerDied => "player_died",
            EventKind::PlayerResurrected => "player_resurrected",
            EventKind::AbilityUsed => "ability_used",
            EventKind::StatusEffectChanged => "status_effect_changed",
            EventKind::GameEnded => "game_ended",
            EventKind::StateSaved => "state_saved",
            EventKind::StateLoaded => "state_loaded",
            EventKind::ActionUndone => "action_undone",
        }
    }
}

/// Host or player operations kept in a game's action log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Roles dealt and first night begun.
    StartGame,
    /// Phase moved on.
    AdvancePhase,
    /// Nomination made.
    Nominate,
    /// Vote cast.
    Vote,
    /// Player killed outside an execution.
    Kill,
    /// Player executed.
    Execute,
    /// Dead player returned.
    Resurrect,
    /// Ability use recorded.
    UseAbility,
    /// Status effect added.
    AddStatusEffect,
    /// Status effect removed.
    RemoveStatusEffect,
    /// Snapshot saved.
    SaveState,
    /// Snapshot restored.
    LoadState,
    /// Another action undone.
    UndoAction,
    /// Game ended by the host.
    FinishGame,
}

impl ActionKind {
    /// Stored `action_type` value.
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::StartGame => "start_game",
            ActionKind::AdvancePhase => "advance_phase",
            ActionKind::Nominate => "nominate",
            ActionKind::Vote => "vote",
            ActionKind::Kill => "kill",
            ActionKind::Execute => "execute",
            ActionKind::Resurrect => "resurrect",
            ActionKind::UseAbility => "use_ability",
            ActionKind::AddStatusEffect => "add_status_effect",
            ActionKind::RemoveStatusEffect => "remove_status_effect",
            ActionKind::SaveState => "save_state",
            ActionKind::LoadState => "load_state",
            ActionKind::UndoAction => "undo_action",
            ActionKind::FinishGame => "finish_game",
        }
    }
}

/// An action waiting to be written to the log once its mutation is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    /// What was done.
    pub kind: ActionKind,
    /// User that asked for it.
    pub performed_by: Uuid,
    /// Request details worth keeping.
    pub data: serde_json::Value,
}

/// A pending notification, published only once the mutation that produced it is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Event name.
    pub kind: EventKind,
    /// Event body, already serialised.
    pub payload: serde_json::Value,
}

/// Notifications and action records collected while a game is being mutated.
#[derive(Debug, Default)]
pub struct Outbox {
    items: Vec<Notification>,
    actions: Vec<PendingAction>,
}

impl Outbox {
    /// Empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `payload` under `kind`. Payloads that fail to serialise are logged and dropped.
    pub fn push<T: Serialize>(&mut self, kind: EventKind, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(payload) => self.items.push(Notification { kind, payload }),
            Err(err) => warn!(
                event = kind.as_str(),
                error = %err,
                "failed to serialise notification payload"
            ),
        }
    }

    /// Log `kind` as performed by `performed_by`. Unserialisable data is stored as null.
    pub fn record<T: Serialize>(&mut self, kind: ActionKind, performed_by: Uuid, data: &T) {
        let data = serde_json::to_value(data).unwrap_or_else(|err| {
            warn!(action = kind.as_str(), error = %err, "failed to serialise action data");
            serde_json::Value::Null
        });
        self.actions.push(PendingAction {
            kind,
            performed_by,
            data,
        });
    }

    /// Whether no notification is queued.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Kinds of the queued notifications, in emission order.
    pub fn kinds(&self) -> impl Iterator<Item = EventKind> + '_ {
        self.items.iter().map(|item| item.kind)
    }

    /// Remove and return the recorded actions.
    pub fn take_actions(&mut self) -> Vec<PendingAction> {
        std::mem::take(&mut self.actions)
    }

    /// The queued notifications, in emission order.
    pub fn into_inner(self) -> Vec<Notification> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn outbox_keeps_emission_order() {
        let mut outbox = Outbox::new();
        outbox.push(EventKind::PhaseChanged, &json!({"status": "day"}));
        outbox.push(EventKind::VoteCast, &json!({"voter": 1}));

        let kinds: Vec<&str> = outbox.kinds().map(EventKind::as_str).collect();
        assert_eq!(kinds, ["phase_changed", "vote_cast"]);
        assert_eq!(outbox.into_inner()[0].payload["status"], "day");
    }

    #[test]
    fn recorded_actions_are_taken_once() {
        let mut outbox = Outbox::new();
        let host = Uuid::new_v4();
        outbox.record(ActionKind::Kill, host, &json!({"player_id": 3}));
        outbox.push(EventKind::PlayerDied, &json!({}));

        let actions = outbox.take_actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind.as_str(), "kill");
        assert_eq!(actions[0].performed_by, host);
        assert_eq!(actions[0].data["player_id"], 3);
        assert!(outbox.take_actions().is_empty());
        assert!(!outbox.is_empty());
    }
}
