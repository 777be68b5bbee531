use crate::state::catalog::{Alignment, Team};

/// Decide whether the alive players have produced a winner.
///
/// `alive_teams` yields the team of every alive player, `None` for players without a role.
/// Parity goes to evil; a table without a living demon goes to good.
pub fn evaluate<I>(alive_teams: I) -> Option<Alignment>
where
    I: IntoIterator<Item = Option<Team>>,
{
    let mut good = 0usize;
    let mut evil = 0usize;
    let mut demons = 0usize;

    for team in alive_teams.into_iter().flatten() {
        match team.alignment() {
            Some(Alignment::Good) => good += 1,
            Some(Alignment::Evil) => evil += 1,
            None => {}
        }
        if team == Team::Demon {
            demons += 1;
        }
    }

    if good <= evil {
        Some(Alignment::Evil)
    } else if demons == 0 {
        Some(Alignment::Good)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teams(table: &[(Team, usize)]) -> Vec<Option<Team>> {
        table
            .iter()
            .flat_map(|(team, count)| std::iter::repeat_n(Some(*team), *count))
            .collect()
    }

    #[test]
    fn parity_goes_to_evil() {
        let alive = teams(&[(Team::Townsfolk, 2), (Team::Minion, 1), (Team::Demon, 1)]);
        assert_eq!(evaluate(alive), Some(Alignment::Evil));
    }

    #[test]
    fn no_demon_means_good_wins() {
        let alive = teams(&[(Team::Townsfolk, 2), (Team::Outsider, 1), (Team::Minion, 1)]);
        assert_eq!(evaluate(alive), Some(Alignment::Good));
    }

    #[test]
    fn game_continues_while_demon_is_outnumbered() {
        let alive = teams(&[(Team::Townsfolk, 5), (Team::Demon, 1)]);
        assert_eq!(evaluate(alive), None);
    }

    #[test]
    fn unassigned_and_neutral_players_are_ignored() {
        let mut alive = teams(&[
            (Team::Townsfolk, 3),
            (Team::Demon, 1),
            (Team::Traveller, 4),
            (Team::Fabled, 1),
        ]);
        alive.extend([None, None, None]);
        assert_eq!(evaluate(alive), None);
    }

    #[test]
    fn empty_table_counts_as_evil_parity() {
        assert_eq!(evaluate(Vec::new()), Some(Alignment::Evil));
    }
}
