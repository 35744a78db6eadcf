// Round-by-round advancement of teams through a bracket.
//
// Every function here is pure: it takes a bracket and returns the next
// version of it. A round can only be played once every node it reads from
// has been resolved.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{matchup, Bracket, BracketNode, NodeId, NodeState, Slot};
use crate::error::EngineError;
use crate::model::{BracketName, Standing, TeamId};
use crate::scores::ScoreBook;

/// A final rank written by a terminal game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketPlacement {
    pub team_id: TeamId,
    pub rank: usize,
    /// Round of the team's last loss in this bracket; `None` if it never lost.
    pub round_eliminated: Option<u8>,
    pub bracket: BracketName,
}

fn stalled(bracket: &Bracket, round: u8, reason: String) -> EngineError {
    EngineError::IncompletePropagation {
        bracket: bracket.name,
        round,
        reason,
    }
}

/// The node a slot reads from. It must belong to an earlier round.
fn feeder(bracket: &Bracket, id: NodeId, round: u8) -> Result<&BracketNode, String> {
    match bracket.node(id) {
        Some(node) if node.round < round => Ok(node),
        Some(node) => Err(format!(
            "node {id} is in round {}, not before round {round}",
            node.round
        )),
        None => Err(format!("node {id} does not exist")),
    }
}

/// The team a slot resolves to, `None` for a bye.
fn side(bracket: &Bracket, slot: Slot, round: u8) -> Result<Option<TeamId>, String> {
    match slot {
        Slot::Seed(seed) => Ok(Some(seed.team_id)),
        Slot::Bye => Ok(None),
        Slot::WinnerOf(id) => feeder(bracket, id, round)?
            .winner()
            .map(Some)
            .ok_or_else(|| format!("node {id} is not resolved")),
        Slot::LoserOf(id) => match feeder(bracket, id, round)?.state {
            NodeState::Resolved(outcome) => Ok(Some(outcome.loser)),
            NodeState::Bye { .. } => Err(format!("node {id} is a bye and has no loser")),
            NodeState::Pending => Err(format!("node {id} is not resolved")),
        },
    }
}

/// Play every pending node of `round`.
///
/// Fails with `IncompletePropagation` if a node it reads from is still
/// pending or a team has no score for one of the round's weeks. Nodes that
/// are already resolved are left as they are.
pub fn propagate_round(
    bracket: &Bracket,
    round: u8,
    scores: &ScoreBook,
    standing: &Standing,
) -> Result<Bracket, EngineError> {
    if round == 0 || round > bracket.rounds {
        return Err(stalled(
            bracket,
            round,
            format!("bracket has {} rounds", bracket.rounds),
        ));
    }

    let mut next = bracket.clone();
    for node in bracket.round_nodes(round).filter(|n| !n.is_resolved()) {
        let a = side(bracket, node.slot_a, round).map_err(|r| stalled(bracket, round, r))?;
        let b = side(bracket, node.slot_b, round).map_err(|r| stalled(bracket, round, r))?;
        let (first, second) = match (a, b) {
            (Some(a), b) => (a, b),
            (None, Some(b)) => (b, None),
            (None, None) => {
                return Err(stalled(
                    bracket,
                    round,
                    format!("node {} has no team on either side", node.id),
                ))
            }
        };

        let state = matchup::resolve_pairing(first, second, &node.weeks, scores, standing)
            .map_err(|missing| {
                stalled(
                    bracket,
                    round,
                    format!("team {} has no score for week {}", missing.team, missing.week),
                )
            })?;

        if let NodeState::Resolved(outcome) = state {
            debug!(
                "{} round {} node {}: {} ({:.2}) beat {} ({:.2})",
                bracket.name,
                round,
                node.id,
                outcome.winner,
                outcome.winner_points,
                outcome.loser,
                outcome.loser_points
            );
        }
        if let Some(slot) = next.nodes.get_mut(node.id) {
            slot.state = state;
        }
    }
    Ok(next)
}

/// Advance through every round whose weeks all have scores, stopping at the
/// first round that is not yet playable.
pub fn propagate_available(
    bracket: &Bracket,
    scores: &ScoreBook,
    standing: &Standing,
) -> Result<Bracket, EngineError> {
    let mut current = bracket.clone();
    for round in 1..=bracket.rounds {
        if current.is_round_resolved(round) {
            continue;
        }
        let weeks = current.round_weeks(round);
        if !weeks.iter().all(|&w| scores.has_week(w)) {
            break;
        }
        current = propagate_round(&current, round, scores, standing)?;
    }
    Ok(current)
}

/// Play every round in order. Fails on the first round that cannot be played.
pub fn propagate_bracket(
    bracket: &Bracket,
    scores: &ScoreBook,
    standing: &Standing,
) -> Result<Bracket, EngineError> {
    let mut current = bracket.clone();
    for round in 1..=bracket.rounds {
        current = propagate_round(&current, round, scores, standing)?;
    }
    Ok(current)
}

/// Final ranks written by the terminal games of a fully resolved bracket,
/// ordered by rank.
pub fn terminal_placements(bracket: &Bracket) -> Result<Vec<BracketPlacement>, EngineError> {
    let mut last_loss: BTreeMap<TeamId, u8> = BTreeMap::new();
    for node in &bracket.nodes {
        if let Some(loser) = node.loser() {
            let round = last_loss.entry(loser).or_insert(node.round);
            *round = (*round).max(node.round);
        }
    }

    let mut placements = Vec::new();
    for node in bracket.nodes.iter() {
        let Some(ranks) = node.terminal else {
            continue;
        };
        let NodeState::Resolved(outcome) = node.state else {
            return Err(stalled(
                bracket,
                node.round,
                format!("terminal node {} has not been played", node.id),
            ));
        };
        for (team_id, rank) in [
            (outcome.winner, ranks.winner_rank),
            (outcome.loser, ranks.loser_rank),
        ] {
            placements.push(BracketPlacement {
                team_id,
                rank,
                round_eliminated: last_loss.get(&team_id).copied(),
                bracket: bracket.name,
            });
        }
    }
    placements.sort_by_key(|p| p.rank);
    Ok(placements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::builder::build_brackets;
    use crate::format::{FormatTable, Season};
    use crate::model::{StandingEntry, WeeklyResult};

    /// Standing where team id == seed and higher seeds scored more.
    fn standing(n: u32) -> Standing {
        Standing::from_ranked(
            (1..=n)
                .map(|i| StandingEntry {
                    team_id: TeamId(i),
                    rank: i as usize,
                    wins: 0,
                    losses: 0,
                    ties: 0,
                    win_pct: 0.0,
                    points_for: f64::from(2000 - i * 10),
                    points_against: 0.0,
                })
                .collect(),
        )
    }

    fn season(year: u16) -> Season {
        FormatTable::builtin().unwrap().resolve(year, 12).unwrap()
    }

    fn book(rows: &[(u32, u8, f64)]) -> ScoreBook {
        let results: Vec<WeeklyResult> = rows
            .iter()
            .map(|&(t, w, p)| WeeklyResult::unopposed(t, w, p))
            .collect();
        ScoreBook::from_results(&results)
    }

    fn ranks(placements: &[BracketPlacement]) -> Vec<(u32, usize)> {
        placements.iter().map(|p| (p.team_id.0, p.rank)).collect()
    }

    #[test]
    fn losers_advance_ladder() {
        // Seeds 9..12 are A=9, C=10, D=11, B=12.
        // Round 1: A 50 beats B 40, D 55 beats C 45.
        let ladder = build_brackets(&season(2019), &standing(12))
            .unwrap()
            .ladder
            .unwrap();
        let (a, c, d, b) = (9, 10, 11, 12);
        let scores = book(&[
            (a, 15, 50.0),
            (b, 15, 40.0),
            (c, 15, 45.0),
            (d, 15, 55.0),
            // Round 2: B v C for 9/10, A v D for 11/12.
            (b, 16, 70.0),
            (c, 16, 60.0),
            (a, 16, 30.0),
            (d, 16, 35.0),
        ]);
        let st = standing(12);

        let after_one = propagate_round(&ladder, 1, &scores, &st).unwrap();
        let r2: Vec<_> = after_one.round_nodes(2).collect();
        assert!(r2.iter().all(|n| !n.is_resolved()));

        let done = propagate_round(&after_one, 2, &scores, &st).unwrap();
        assert!(done.is_complete());
        let placed = terminal_placements(&done).unwrap();
        assert_eq!(ranks(&placed), vec![(b, 9), (c, 10), (d, 11), (a, 12)]);
        assert!(placed.iter().all(|p| p.bracket == BracketName::ToiletBowl));

        // B lost round 1 but moved up; A won round 1 and lost the bottom game.
        assert_eq!(placed[0].round_eliminated, Some(1));
        assert_eq!(placed[3].round_eliminated, Some(2));
    }

    #[test]
    fn round_two_before_round_one_is_incomplete() {
        let ladder = build_brackets(&season(2019), &standing(12))
            .unwrap()
            .ladder
            .unwrap();
        match propagate_round(&ladder, 2, &ScoreBook::default(), &standing(12)).unwrap_err() {
            EngineError::IncompletePropagation { bracket, round, reason } => {
                assert_eq!(bracket, BracketName::ToiletBowl);
                assert_eq!(round, 2);
                assert!(reason.contains("not resolved"), "{reason}");
            }
            other => panic!("expected IncompletePropagation, got: {other}"),
        }
    }

    #[test]
    fn missing_week_score_names_team_and_week() {
        let winners = build_brackets(&season(2019), &standing(12)).unwrap().winners;
        let scores = book(&[(3, 14, 100.0), (6, 14, 90.0), (4, 14, 80.0)]);
        match propagate_round(&winners, 1, &scores, &standing(12)).unwrap_err() {
            EngineError::IncompletePropagation { round, reason, .. } => {
                assert_eq!(round, 1);
                assert_eq!(reason, "team 5 has no score for week 14");
            }
            other => panic!("expected IncompletePropagation, got: {other}"),
        }
    }

    #[test]
    fn six_team_winners_bracket_runs_to_completion() {
        let winners = build_brackets(&season(2019), &standing(12)).unwrap().winners;
        // Lower seeds win every game except the final, which seed 1 takes.
        let scores = book(&[
            (3, 14, 90.0),
            (6, 14, 120.0),
            (4, 14, 95.0),
            (5, 14, 110.0),
            (1, 15, 130.0),
            (5, 15, 100.0),
            (2, 15, 80.0),
            (6, 15, 115.0),
            (1, 16, 140.0),
            (6, 16, 100.0),
            (5, 16, 105.0),
            (2, 16, 99.0),
            (3, 16, 70.0),
            (4, 16, 75.0),
        ]);
        let done = propagate_bracket(&winners, &scores, &standing(12)).unwrap();
        assert_eq!(done.resolved_rounds(), 3);
        let placed = terminal_placements(&done).unwrap();
        assert_eq!(
            ranks(&placed),
            vec![(1, 1), (6, 2), (5, 3), (2, 4), (4, 5), (3, 6)]
        );
        // The champion never lost; seed 4 lost in round 1, then won the fifth-place game.
        assert_eq!(placed[0].round_eliminated, None);
        assert_eq!(placed[1].round_eliminated, Some(3));
        assert_eq!(placed[3].round_eliminated, Some(3));
        assert_eq!(placed[4].round_eliminated, Some(1));
    }

    #[test]
    fn available_rounds_stop_at_missing_week() {
        let winners = build_brackets(&season(2019), &standing(12)).unwrap().winners;
        let scores = book(&[(3, 14, 90.0), (6, 14, 120.0), (4, 14, 95.0), (5, 14, 110.0)]);
        let partial = propagate_available(&winners, &scores, &standing(12)).unwrap();
        assert_eq!(partial.resolved_rounds(), 1);
        assert!(!partial.is_complete());
        assert!(matches!(
            terminal_placements(&partial),
            Err(EngineError::IncompletePropagation { round: 3, .. })
        ));

        // Re-running on the same data changes nothing.
        let again = propagate_available(&partial, &scores, &standing(12)).unwrap();
        assert_eq!(again, partial);
    }

    #[test]
    fn out_of_range_round_is_rejected() {
        let winners = build_brackets(&season(2019), &standing(12)).unwrap().winners;
        assert!(matches!(
            propagate_round(&winners, 4, &ScoreBook::default(), &standing(12)),
            Err(EngineError::IncompletePropagation { round: 4, .. })
        ));
    }
}
