use indexmap::IndexMap;
use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom, seq::SliceRandom};
use uuid::Uuid;

use crate::state::{
    catalog::{Role, Script, Team},
    distribution::DistributionTable,
    error::EngineError,
};

/// Mapping of player id to the role drawn for them, in seating order of the input.
pub type RoleAssignment = IndexMap<Uuid, Role>;

/// Draws a legal, randomized set of roles for a table of players.
#[derive(Debug)]
pub struct RoleAssigner<R> {
    rng: R,
}

impl RoleAssigner<StdRng> {
    /// Assigner backed by an operating-system seeded generator.
    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    /// Deterministic assigner, mostly useful in tests.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RoleAssigner<R> {
    /// Wrap an explicit random source.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Draw one role per player.
    ///
    /// Each team contributes the number of roles the distribution table asks for, drawn
    /// uniformly without replacement. The resulting pool is shuffled and handed out to a
    /// shuffled copy of `players`.
    pub fn assign(
        &mut self,
        script: &Script,
        players: &[Uuid],
    ) -> Result<RoleAssignment, EngineError> {
        let player_count = players.len();
        if player_count < script.player_count_min || player_count > script.player_count_max {
            return Err(EngineError::InvalidPlayerCount(player_count));
        }
        let counts = DistributionTable::lookup(player_count)?;

        let mut pool: Vec<&Role> = Vec::with_capacity(player_count);
        for team in Team::DRAFTED {
            let required = usize::from(counts.get(team));
            let available = script.roles_of(team);
            if available.len() < required {
                return Err(EngineError::InsufficientRoles {
                    team,
                    required,
                    available: available.len(),
                });
            }
            pool.extend(available.choose_multiple(&mut self.rng, required).copied());
        }
        pool.shuffle(&mut self.rng);

        let mut seats = players.to_vec();
        seats.shuffle(&mut self.rng);

        let drawn: IndexMap<Uuid, Role> = seats
            .into_iter()
            .zip(pool)
            .map(|(player_id, role)| (player_id, role.clone()))
            .collect();

        // Re-key in the caller's order so the mapping reads like the seating chart.
        Ok(players
            .iter()
            .filter_map(|id| drawn.get(id).map(|role| (*id, role.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::state::catalog::{RoleCatalog, ScriptDefinition, TROUBLE_BREWING_ID};

    fn players(count: usize) -> Vec<Uuid> {
        (0..count).map(|_| Uuid::new_v4()).collect()
    }

    fn team_count(assignment: &RoleAssignment, team: Team) -> usize {
        assignment.values().filter(|role| role.team == team).count()
    }

    #[test]
    fn seven_players_follow_distribution() {
        let catalog = RoleCatalog::builtin();
        let script = catalog.script("Trouble Brewing").unwrap();
        let table = players(7);

        let assignment = RoleAssigner::seeded(7).assign(&script, &table).unwrap();

        assert_eq!(assignment.len(), 7);
        assert_eq!(team_count(&assignment, Team::Townsfolk), 5);
        assert_eq!(team_count(&assignment, Team::Outsider), 0);
        assert_eq!(team_count(&assignment, Team::Minion), 1);
        assert_eq!(team_count(&assignment, Team::Demon), 1);
        assert!(table.iter().all(|id| assignment.contains_key(id)));
    }

    #[test]
    fn roles_are_never_handed_out_twice() {
        let catalog = RoleCatalog::builtin();
        let script = catalog.script(TROUBLE_BREWING_ID).unwrap();

        for seed in 0..32 {
            let table = players(15);
            let assignment = RoleAssigner::seeded(seed).assign(&script, &table).unwrap();
            let unique: HashSet<_> = assignment
                .values()
                .map(|role| role.character_id.as_str())
                .collect();
            assert_eq!(unique.len(), 15, "seed {seed} produced duplicates");
        }
    }

    #[test]
    fn same_seed_gives_same_assignment() {
        let catalog = RoleCatalog::builtin();
        let script = catalog.script(TROUBLE_BREWING_ID).unwrap();
        let table = players(10);

        let first = RoleAssigner::seeded(42).assign(&script, &table).unwrap();
        let second = RoleAssigner::seeded(42).assign(&script, &table).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_player_counts_are_rejected() {
        let catalog = RoleCatalog::builtin();
        let script = catalog.script(TROUBLE_BREWING_ID).unwrap();
        let mut assigner = RoleAssigner::seeded(1);

        assert_eq!(
            assigner.assign(&script, &players(4)).unwrap_err(),
            EngineError::InvalidPlayerCount(4)
        );
        assert_eq!(
            assigner.assign(&script, &players(16)).unwrap_err(),
            EngineError::InvalidPlayerCount(16)
        );
    }

    #[test]
    fn short_script_reports_missing_team() {
        let catalog = RoleCatalog::builtin();
        catalog
            .add_script(ScriptDefinition {
                id: "thin".into(),
                name: "Thin".into(),
                author: String::new(),
                author_id: None,
                description: String::new(),
                player_count_min: 5,
                player_count_max: 15,
                roles: vec![
                    "washerwoman".into(),
                    "librarian".into(),
                    "investigator".into(),
                    "chef".into(),
                    "empath".into(),
                    "poisoner".into(),
                    "imp".into(),
                ],
            })
            .unwrap();
        let script = catalog.script("thin").unwrap();
        let mut assigner = RoleAssigner::seeded(3);

        assert!(assigner.assign(&script, &players(7)).is_ok());
        assert_eq!(
            assigner.assign(&script, &players(6)).unwrap_err(),
            EngineError::InsufficientRoles {
                team: Team::Outsider,
                required: 1,
                available: 0,
            }
        );
        assert_eq!(
            assigner.assign(&script, &players(10)).unwrap_err(),
            EngineError::InsufficientRoles {
                team: Team::Townsfolk,
                required: 7,
                available: 5,
            }
        );
    }
}
