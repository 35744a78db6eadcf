// Final standings: merge bracket, cumulative and regular-season placements
// into one total order and attach labels.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bracket::propagate::BracketPlacement;
use crate::error::EngineError;
use crate::format::{ConsolationRule, Season};
use crate::model::{
    BracketName, CumulativeEntry, Placement, PlacementLabel, PlacementSource, Standing, Team,
    TeamId,
};

/// Everything the postseason decided, as handed to the assembler.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostseasonResults<'a> {
    pub winners: &'a [BracketPlacement],
    /// Empty when the consolation group is not a ladder.
    pub ladder: &'a [BracketPlacement],
    pub mediocre_bowl: Option<&'a [CumulativeEntry]>,
    pub toilet_bowl: Option<&'a [CumulativeEntry]>,
}

/// A placement under construction, before labels are attached.
struct Slotted {
    team_id: TeamId,
    rank: usize,
    source: PlacementSource,
    round_eliminated: Option<u8>,
    bracket_name: Option<BracketName>,
}

fn display_name(teams: &[Team], team_id: TeamId) -> String {
    teams
        .iter()
        .find(|t| t.team_id == team_id)
        .map(|t| t.display_name.clone())
        .unwrap_or_else(|| format!("Team {team_id}"))
}

/// Every team at its regular-season rank. Used before the postseason is
/// complete, so no team is labelled a champion or runner-up yet.
pub fn default_placements(teams: &[Team], standing: &Standing) -> Result<Vec<Placement>, EngineError> {
    let placements: Vec<Placement> = standing
        .entries()
        .iter()
        .map(|e| Placement {
            team_id: e.team_id,
            display_name: display_name(teams, e.team_id),
            final_rank: e.rank,
            label: PlacementLabel::Place(e.rank),
            source: PlacementSource::RegularSeason,
            round_eliminated: None,
            bracket_name: None,
        })
        .collect();
    check_permutation(&placements, teams.len())?;
    Ok(placements)
}

/// Merge the postseason results over the standing into the season's final
/// placements, ordered by rank.
///
/// Bracket terminal games fix their ranks directly. A rank-deciding
/// cumulative contest orders its group by total; otherwise the group keeps
/// regular-season order. Any team left over keeps its regular-season rank.
pub fn assemble_placements(
    season: &Season,
    teams: &[Team],
    standing: &Standing,
    results: &PostseasonResults<'_>,
) -> Result<Vec<Placement>, EngineError> {
    let mut slotted: Vec<Slotted> = Vec::with_capacity(season.team_count);

    for p in results.winners.iter().chain(results.ladder) {
        slotted.push(Slotted {
            team_id: p.team_id,
            rank: p.rank,
            source: PlacementSource::Bracket,
            round_eliminated: p.round_eliminated,
            bracket_name: Some(p.bracket),
        });
    }

    if let (Some(rule), Some(range)) = (season.mediocre_bowl, season.mediocre_seeds()) {
        let first = *range.start();
        if rule.decides_rank {
            for e in results.mediocre_bowl.unwrap_or_default() {
                slotted.push(Slotted {
                    team_id: e.team_id,
                    rank: first + e.rank - 1,
                    source: PlacementSource::Cumulative,
                    round_eliminated: None,
                    bracket_name: Some(BracketName::MediocreBowl),
                });
            }
        } else {
            for team_id in range.filter_map(|n| standing.team_at(n)) {
                slotted.push(Slotted {
                    team_id,
                    rank: standing.rank_of(team_id).unwrap_or(0),
                    source: PlacementSource::RegularSeason,
                    round_eliminated: None,
                    bracket_name: Some(BracketName::MediocreBowl),
                });
            }
        }
    }

    if let ConsolationRule::Cumulative { .. } = season.consolation {
        let first = *season.consolation_seeds().start();
        for e in results.toilet_bowl.unwrap_or_default() {
            slotted.push(Slotted {
                team_id: e.team_id,
                rank: first + e.rank - 1,
                source: PlacementSource::Cumulative,
                round_eliminated: None,
                bracket_name: Some(BracketName::ToiletBowl),
            });
        }
    }

    let placed: BTreeSet<TeamId> = slotted.iter().map(|s| s.team_id).collect();
    let taken: BTreeSet<usize> = slotted.iter().map(|s| s.rank).collect();
    for e in standing.entries() {
        if !placed.contains(&e.team_id) && !taken.contains(&e.rank) {
            slotted.push(Slotted {
                team_id: e.team_id,
                rank: e.rank,
                source: PlacementSource::RegularSeason,
                round_eliminated: None,
                bracket_name: None,
            });
        }
    }

    let mediocre_winner = results
        .mediocre_bowl
        .and_then(|entries| entries.iter().find(|e| e.rank == 1))
        .map(|e| e.team_id);

    let mut placements: Vec<Placement> = slotted
        .into_iter()
        .map(|s| {
            let label = if s.rank <= 2 {
                PlacementLabel::for_rank(s.rank)
            } else if s.rank == season.team_count && s.bracket_name == Some(BracketName::ToiletBowl) {
                PlacementLabel::ToiletBowlLoser
            } else if Some(s.team_id) == mediocre_winner {
                PlacementLabel::MediocreBowlWinner
            } else {
                PlacementLabel::for_rank(s.rank)
            };
            Placement {
                team_id: s.team_id,
                display_name: display_name(teams, s.team_id),
                final_rank: s.rank,
                label,
                source: s.source,
                round_eliminated: s.round_eliminated,
                bracket_name: s.bracket_name,
            }
        })
        .collect();
    placements.sort_by_key(|p| (p.final_rank, p.team_id));

    check_permutation(&placements, season.team_count)?;
    debug!(
        "{} placements assembled, champion {:?}",
        season.year,
        placements.first().map(|p| p.team_id)
    );
    Ok(placements)
}

/// Every rank `1..=team_count` held by exactly one team, every team placed once.
fn check_permutation(placements: &[Placement], team_count: usize) -> Result<(), EngineError> {
    let mut by_rank: BTreeMap<usize, Vec<TeamId>> = BTreeMap::new();
    let mut teams = BTreeSet::new();
    for p in placements {
        if !teams.insert(p.team_id) {
            return Err(EngineError::IncompleteStandings {
                rank: p.final_rank,
                reason: format!("team {} is placed more than once", p.team_id),
            });
        }
        by_rank.entry(p.final_rank).or_default().push(p.team_id);
    }

    for rank in 1..=team_count {
        match by_rank.get(&rank).map(Vec::as_slice) {
            None | Some([]) => {
                return Err(EngineError::IncompleteStandings {
                    rank,
                    reason: "no team holds this rank".into(),
                })
            }
            Some([_]) => {}
            Some(holders) => {
                return Err(EngineError::IncompleteStandings {
                    rank,
                    reason: format!("held by {} teams: {holders:?}", holders.len()),
                })
            }
        }
    }
    if let Some((&rank, _)) = by_rank.range(team_count + 1..).next() {
        return Err(EngineError::IncompleteStandings {
            rank,
            reason: format!("rank is outside 1..={team_count}"),
        });
    }
    if by_rank.contains_key(&0) {
        return Err(EngineError::IncompleteStandings {
            rank: 0,
            reason: "ranks start at 1".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// A team whose final rank differs between two sets of placements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankChange {
    pub team_id: TeamId,
    pub display_name: String,
    pub before: Option<usize>,
    pub after: Option<usize>,
}

/// Teams whose rank in `after` differs from `before`, ordered by team id.
/// A team missing from one side shows `None` there.
pub fn compare_placements(before: &[Placement], after: &[Placement]) -> Vec<RankChange> {
    let mut rows: BTreeMap<TeamId, RankChange> = BTreeMap::new();
    for p in before {
        rows.insert(
            p.team_id,
            RankChange {
                team_id: p.team_id,
                display_name: p.display_name.clone(),
                before: Some(p.final_rank),
                after: None,
            },
        );
    }
    for p in after {
        rows.entry(p.team_id)
            .or_insert_with(|| RankChange {
                team_id: p.team_id,
                display_name: p.display_name.clone(),
                before: None,
                after: None,
            })
            .after = Some(p.final_rank);
    }
    rows.into_values().filter(|r| r.before != r.after).collect()
}
