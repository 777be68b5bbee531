use std::time::SystemTime;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::{error::EngineError, game::Player, state_machine::GameStatus};

/// A public proposal to execute a player. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nomination {
    /// Player who nominated.
    pub nominator_id: Uuid,
    /// Player put up for execution.
    pub nominee_id: Uuid,
    /// Day of the nomination.
    pub day_number: u32,
    /// When it was recorded.
    pub timestamp: SystemTime,
}

/// Open nominations for the current day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NominationLedger {
    entries: Vec<Nomination>,
}

impl NominationLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted records.
    pub fn restore(entries: Vec<Nomination>) -> Self {
        Self { entries }
    }

    /// Nominations in the order they were made.
    pub fn entries(&self) -> &[Nomination] {
        &self.entries
    }

    /// Whether nobody has been nominated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `nominator_id` already has a nomination on `day_number`.
    pub fn has_nominated(&self, nominator_id: Uuid, day_number: u32) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.nominator_id == nominator_id && entry.day_number == day_number)
    }

    /// Record a nomination after checking liveness and the one-per-day rule.
    pub fn nominate(
        &mut self,
        nominator: &Player,
        nominee: &Player,
        day_number: u32,
        now: SystemTime,
    ) -> Result<Nomination, EngineError> {
        if !nominator.is_alive {
            return Err(EngineError::DeadNominator);
        }
        if !nominee.is_alive {
            return Err(EngineError::DeadNominee);
        }
        if nominator.id == nominee.id {
            return Err(EngineError::SelfNomination);
        }
        if self.has_nominated(nominator.id, day_number) {
            return Err(EngineError::AlreadyNominated(nominator.id));
        }

        let nomination = Nomination {
            nominator_id: nominator.id,
            nominee_id: nominee.id,
            day_number,
            timestamp: now,
        };
        self.entries.push(nomination.clone());
        Ok(nomination)
    }

    /// Drop every open nomination. Called on each phase transition.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// What a vote was cast for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    /// Vote on whether to execute the nominee.
    #[default]
    Execution,
    /// Vote in support of a nomination.
    Nomination,
}

/// A recorded vote. Immutable once cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Primary key of the vote.
    pub id: Uuid,
    /// Player who voted.
    pub voter_id: Uuid,
    /// `None` records an abstention.
    pub target_id: Option<Uuid>,
    /// What the vote was for.
    pub kind: VoteKind,
    /// Day the vote was cast.
    pub day_number: u32,
    /// Cleared when the vote no longer counts.
    pub is_valid: bool,
    /// When the vote was cast.
    pub cast_at: SystemTime,
}

/// Every vote cast during the game, scoped by day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteLedger {
    votes: Vec<Vote>,
}

impl VoteLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted votes.
    pub fn restore(votes: Vec<Vote>) -> Self {
        Self { votes }
    }

    /// Every vote in cast order.
    pub fn votes(&self) -> &[Vote] {
        &self.votes
    }

    /// Votes recorded on a given day, in cast order.
    pub fn votes_on(&self, day_number: u32) -> impl Iterator<Item = &Vote> {
        self.votes
            .iter()
            .filter(move |vote| vote.day_number == day_number)
    }

    /// Whether `voter_id` cast any vote on `day_number`.
    pub fn has_voted(&self, voter_id: Uuid, day_number: u32) -> bool {
        self.votes_on(day_number).any(|vote| vote.voter_id == voter_id)
    }

    /// Spend one of `voter`'s votes and record it.
    pub fn cast(
        &mut self,
        status: GameStatus,
        voter: &mut Player,
        target_id: Option<Uuid>,
        kind: VoteKind,
        day_number: u32,
        now: SystemTime,
    ) -> Result<Vote, EngineError> {
        if status != GameStatus::Day {
            return Err(EngineError::NoVotingAllowed(status));
        }
        let remaining = voter
            .votes_remaining
            .checked_sub(1)
            .ok_or(EngineError::NoVotesRemaining(voter.id))?;

        let vote = Vote {
            id: Uuid::new_v4(),
            voter_id: voter.id,
            target_id,
            kind,
            day_number,
            is_valid: true,
            cast_at: now,
        };
        voter.votes_remaining = remaining;
        self.votes.push(vote.clone());
        Ok(vote)
    }

    /// Count valid votes per target for a day. Abstentions are not counted.
    pub fn tally(&self, day_number: u32) -> IndexMap<Uuid, usize> {
        let mut tally = IndexMap::new();
        for vote in self.votes_on(day_number).filter(|vote| vote.is_valid) {
            if let Some(target) = vote.target_id {
                *tally.entry(target).or_insert(0) += 1;
            }
        }
        tally
    }
}

/// Restore everyone's vote at the start of a new day.
pub fn reset_votes<'a, I>(players: I, allow_dead_vote: bool)
where
    I: IntoIterator<Item = &'a mut Player>,
{
    for player in players {
        player.votes_remaining = u8::from(player.is_alive || allow_dead_vote);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(position: u32) -> Player {
        Player::new(Uuid::new_v4(), format!("player-{position}"), position)
    }

    #[test]
    fn second_nomination_on_same_day_fails() {
        let mut ledger = NominationLedger::new();
        let alice = player(0);
        let bob = player(1);
        let carol = player(2);
        let now = SystemTime::now();

        ledger.nominate(&alice, &bob, 1, now).unwrap();
        assert_eq!(
            ledger.nominate(&alice, &carol, 1, now).unwrap_err(),
            EngineError::AlreadyNominated(alice.id)
        );
        assert_eq!(ledger.entries().len(), 1);

        ledger.clear();
        assert!(ledger.nominate(&alice, &carol, 2, now).is_ok());
    }

    #[test]
    fn dead_and_self_nominations_are_rejected() {
        let mut ledger = NominationLedger::new();
        let alice = player(0);
        let mut bob = player(1);
        let now = SystemTime::now();

        assert_eq!(
            ledger.nominate(&alice, &alice, 1, now).unwrap_err(),
            EngineError::SelfNomination
        );

        bob.is_alive = false;
        assert_eq!(
            ledger.nominate(&bob, &alice, 1, now).unwrap_err(),
            EngineError::DeadNominator
        );
        assert_eq!(
            ledger.nominate(&alice, &bob, 1, now).unwrap_err(),
            EngineError::DeadNominee
        );
        assert!(ledger.is_empty());
    }

    #[test]
    fn votes_only_count_during_the_day() {
        let mut ledger = VoteLedger::new();
        let mut voter = player(0);

        let err = ledger
            .cast(
                GameStatus::Night,
                &mut voter,
                None,
                VoteKind::Execution,
                1,
                SystemTime::now(),
            )
            .unwrap_err();
        assert_eq!(err, EngineError::NoVotingAllowed(GameStatus::Night));
        assert_eq!(voter.votes_remaining, 1);
        assert!(ledger.votes().is_empty());
    }

    #[test]
    fn votes_never_go_negative() {
        let mut ledger = VoteLedger::new();
        let mut voter = player(0);
        let target = Uuid::new_v4();
        let now = SystemTime::now();

        let vote = ledger
            .cast(
                GameStatus::Day,
                &mut voter,
                Some(target),
                VoteKind::Execution,
                1,
                now,
            )
            .unwrap();
        assert_eq!(vote.target_id, Some(target));
        assert_eq!(voter.votes_remaining, 0);

        let err = ledger
            .cast(GameStatus::Day, &mut voter, None, VoteKind::Execution, 1, now)
            .unwrap_err();
        assert_eq!(err, EngineError::NoVotesRemaining(voter.id));
        assert_eq!(voter.votes_remaining, 0);
        assert_eq!(ledger.votes().len(), 1);
    }

    #[test]
    fn tally_ignores_abstentions_and_other_days() {
        let mut ledger = VoteLedger::new();
        let target = Uuid::new_v4();
        let now = SystemTime::now();

        let cast = [
            (1, Some(target)),
            (2, Some(target)),
            (2, None),
            (2, Some(target)),
        ];
        for (day, target_id) in cast {
            let mut voter = player(0);
            ledger
                .cast(GameStatus::Day, &mut voter, target_id, VoteKind::Execution, day, now)
                .unwrap();
        }

        assert_eq!(ledger.tally(2).get(&target), Some(&2));
        assert_eq!(ledger.tally(1).get(&target), Some(&1));
        assert_eq!(ledger.votes_on(2).count(), 3);
    }

    #[test]
    fn reset_respects_dead_vote_rule() {
        let mut players = vec![player(0), player(1)];
        players[0].votes_remaining = 0;
        players[1].votes_remaining = 0;
        players[1].is_alive = false;

        reset_votes(players.iter_mut(), false);
        assert_eq!(players[0].votes_remaining, 1);
        assert_eq!(players[1].votes_remaining, 0);

        reset_votes(players.iter_mut(), true);
        assert_eq!(players[1].votes_remaining, 1);
    }
}
