use serde::Serialize;
use utoipa::ToSchema;

use crate::state::{catalog::Team, error::EngineError};

/// Smallest supported table.
pub const MIN_PLAYERS: usize = 5;
/// Largest supported table, travellers excluded.
pub const MAX_PLAYERS: usize = 15;

/// Number of roles drawn from each team for a given player count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct TeamCounts {
    /// Townsfolk seats.
    pub townsfolk: u8,
    /// Outsider seats.
    pub outsider: u8,
    /// Minion seats.
    pub minion: u8,
    /// Demon seats.
    pub demon: u8,
}

impl TeamCounts {
    const fn new(townsfolk: u8, outsider: u8, minion: u8, demon: u8) -> Self {
        Self {
            townsfolk,
            outsider,
            minion,
            demon,
        }
    }

    /// Total number of seats covered by this distribution.
    pub fn total(&self) -> usize {
        usize::from(self.townsfolk)
            + usize::from(self.outsider)
            + usize::from(self.minion)
            + usize::from(self.demon)
    }

    /// Count for a single team. Non-drafted teams always get zero.
    pub fn get(&self, team: Team) -> u8 {
        match team {
            Team::Townsfolk => self.townsfolk,
            Team::Outsider => self.outsider,
            Team::Minion => self.minion,
            Team::Demon => self.demon,
            Team::Traveller | Team::Fabled => 0,
        }
    }
}

const TABLE: [TeamCounts; MAX_PLAYERS - MIN_PLAYERS + 1] = [
    TeamCounts::new(3, 0, 1, 1),
    TeamCounts::new(3, 1, 1, 1),
    TeamCounts::new(5, 0, 1, 1),
    TeamCounts::new(5, 1, 1, 1),
    TeamCounts::new(5, 2, 1, 1),
    TeamCounts::new(7, 0, 2, 1),
    TeamCounts::new(7, 1, 2, 1),
    TeamCounts::new(7, 2, 2, 1),
    TeamCounts::new(9, 0, 3, 1),
    TeamCounts::new(9, 1, 3, 1),
    TeamCounts::new(9, 2, 3, 1),
];

/// Official team distribution for 5 to 15 players.
pub struct DistributionTable;

impl DistributionTable {
    /// Team counts for `player_count` players.
    pub fn lookup(player_count: usize) -> Result<TeamCounts, EngineError> {
        player_count
            .checked_sub(MIN_PLAYERS)
            .and_then(|index| TABLE.get(index))
            .copied()
            .ok_or(EngineError::InvalidPlayerCount(player_count))
    }

    /// Every supported player count paired with its distribution.
    pub fn entries() -> impl Iterator<Item = (usize, TeamCounts)> {
        TABLE
            .iter()
            .enumerate()
            .map(|(index, counts)| (index + MIN_PLAYERS, *counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_entry_sums_to_player_count() {
        for (players, counts) in DistributionTable::entries() {
            assert_eq!(counts.total(), players);
            assert_eq!(counts.demon, 1);
        }
        assert_eq!(DistributionTable::entries().count(), 11);
    }

    #[test]
    fn known_rows_match_official_table() {
        assert_eq!(
            DistributionTable::lookup(5).unwrap(),
            TeamCounts::new(3, 0, 1, 1)
        );
        assert_eq!(
            DistributionTable::lookup(9).unwrap(),
            TeamCounts::new(5, 2, 1, 1)
        );
        assert_eq!(
            DistributionTable::lookup(15).unwrap(),
            TeamCounts::new(9, 2, 3, 1)
        );
    }

    #[test]
    fn out_of_range_counts_are_rejected() {
        for count in [0, 4, 16, 100] {
            assert_eq!(
                DistributionTable::lookup(count),
                Err(EngineError::InvalidPlayerCount(count))
            );
        }
    }

    #[test]
    fn non_drafted_teams_have_no_seats() {
        let counts = DistributionTable::lookup(12).unwrap();
        assert_eq!(counts.get(Team::Traveller), 0);
        assert_eq!(counts.get(Team::Fabled), 0);
        assert_eq!(counts.get(Team::Outsider), 2);
    }
}
