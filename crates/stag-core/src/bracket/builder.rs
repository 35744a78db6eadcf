// Bracket construction: seed groups and round pairings for each postseason group.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{matchup, Bracket, BracketNode, NodeState, Routing, Slot, TerminalRanks};
use crate::error::EngineError;
use crate::format::{rounds_for_field, ConsolationRule, LadderDescent, Season};
use crate::model::{BracketName, Seed, Standing};

// ---------------------------------------------------------------------------
// Partition
// ---------------------------------------------------------------------------

/// Seeds split into the season's postseason groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonGroups {
    pub winners: Vec<Seed>,
    pub mediocre: Vec<Seed>,
    pub consolation: Vec<Seed>,
}

/// Split the standing into winners field, mediocre bowl group and
/// consolation group, in seed order.
pub fn partition(season: &Season, standing: &Standing) -> Result<SeasonGroups, EngineError> {
    let mediocre_teams = season.mediocre_bowl.map(|m| m.teams).unwrap_or(0);
    let covered = season.playoff_field + mediocre_teams + season.consolation.teams();
    if covered != season.team_count {
        return Err(EngineError::BracketConstruction {
            expected: season.team_count,
            actual: covered,
            detail: format!(
                "{} playoff + {} mediocre + {} consolation",
                season.playoff_field,
                mediocre_teams,
                season.consolation.teams()
            ),
        });
    }
    if standing.len() != season.team_count {
        return Err(EngineError::BracketConstruction {
            expected: season.team_count,
            actual: standing.len(),
            detail: "standing does not list every team".into(),
        });
    }

    let winners = standing.seeds(1, season.playoff_field);
    let mediocre = match season.mediocre_seeds() {
        Some(range) => standing.seeds(*range.start(), *range.end()),
        None => Vec::new(),
    };
    let range = season.consolation_seeds();
    let consolation = standing.seeds(*range.start(), *range.end());

    Ok(SeasonGroups {
        winners,
        mediocre,
        consolation,
    })
}

// ---------------------------------------------------------------------------
// Bracket templates
// ---------------------------------------------------------------------------

/// Where a template game takes each side from, before seeds are attached.
#[derive(Debug, Clone, Copy)]
enum Feed {
    /// Group seed index (0 = top seed of the group).
    Seed(usize),
    /// The side of an earlier game that moves up.
    Up(usize),
    /// The side of an earlier game that drops down.
    Down(usize),
    Bye,
}

struct TemplateGame {
    round: u8,
    a: Feed,
    b: Feed,
    /// Group places for (winner, loser) when the game is terminal.
    places: Option<(usize, usize)>,
}

const fn game(round: u8, a: Feed, b: Feed, places: Option<(usize, usize)>) -> TemplateGame {
    TemplateGame { round, a, b, places }
}

/// Game layout for a group of 2, 4 or 6 teams.
///
/// Top seed plays bottom seed. A 6-team group gives its top two seeds byes
/// and plays placement games for 1/2, 3/4 and 5/6 in the last round.
fn template(size: usize) -> Option<Vec<TemplateGame>> {
    use Feed as F;
    let games = match size {
        2 => vec![game(1, F::Seed(0), F::Seed(1), Some((1, 2)))],
        4 => vec![
            game(1, F::Seed(0), F::Seed(3), None),
            game(1, F::Seed(1), F::Seed(2), None),
            game(2, F::Up(0), F::Up(1), Some((1, 2))),
            game(2, F::Down(0), F::Down(1), Some((3, 4))),
        ],
        6 => vec![
            game(1, F::Seed(0), F::Bye, None),
            game(1, F::Seed(1), F::Bye, None),
            game(1, F::Seed(2), F::Seed(5), None),
            game(1, F::Seed(3), F::Seed(4), None),
            game(2, F::Up(0), F::Up(3), None),
            game(2, F::Up(1), F::Up(2), None),
            game(3, F::Up(4), F::Up(5), Some((1, 2))),
            game(3, F::Down(4), F::Down(5), Some((3, 4))),
            game(3, F::Down(2), F::Down(3), Some((5, 6))),
        ],
        _ => return None,
    };
    Some(games)
}

/// Lay out a bracket over `seeds`, writing final ranks starting at the
/// group's first seed. Round `r` plays in `round_weeks[r - 1]`.
pub fn build_bracket(
    name: BracketName,
    seeds: &[Seed],
    routing: Routing,
    round_weeks: &[Vec<u8>],
) -> Result<Bracket, EngineError> {
    let games = template(seeds.len()).ok_or_else(|| EngineError::BracketConstruction {
        expected: seeds.len(),
        actual: 0,
        detail: format!("no {name} layout for {} teams", seeds.len()),
    })?;
    let rounds = rounds_for_field(seeds.len()).unwrap_or(0);
    if round_weeks.len() != usize::from(rounds) {
        return Err(EngineError::BracketConstruction {
            expected: usize::from(rounds),
            actual: round_weeks.len(),
            detail: format!("{name} needs one week window per round"),
        });
    }
    let first_rank = seeds.first().map(|s| s.seed_number).unwrap_or(1);

    let is_bye = |i: usize| matches!(games[i].b, Feed::Bye);
    let slot = |feed: Feed| match feed {
        Feed::Seed(i) => Slot::Seed(seeds[i]),
        Feed::Bye => Slot::Bye,
        // A bye's only team always moves up.
        Feed::Up(i) if is_bye(i) => Slot::WinnerOf(i),
        Feed::Up(i) => match routing {
            Routing::WinnersAdvance => Slot::WinnerOf(i),
            Routing::LosersAdvance => Slot::LoserOf(i),
        },
        Feed::Down(i) => match routing {
            Routing::WinnersAdvance => Slot::LoserOf(i),
            Routing::LosersAdvance => Slot::WinnerOf(i),
        },
    };

    let nodes = games
        .iter()
        .enumerate()
        .map(|(id, g)| {
            let slot_a = slot(g.a);
            let slot_b = slot(g.b);
            let state = match (slot_a, slot_b) {
                (Slot::Seed(seed), Slot::Bye) => matchup::walkover(seed.team_id),
                _ => NodeState::Pending,
            };
            BracketNode {
                id,
                bracket_name: name,
                round: g.round,
                weeks: round_weeks[usize::from(g.round) - 1].clone(),
                slot_a,
                slot_b,
                terminal: g.places.map(|(w, l)| TerminalRanks {
                    winner_rank: first_rank + w - 1,
                    loser_rank: first_rank + l - 1,
                }),
                state,
            }
        })
        .collect();

    Ok(Bracket {
        name,
        routing,
        rounds,
        seeds: seeds.to_vec(),
        nodes,
    })
}

// ---------------------------------------------------------------------------
// Season brackets
// ---------------------------------------------------------------------------

/// Every head-to-head bracket of a season, with the seed groups they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonBrackets {
    pub groups: SeasonGroups,
    pub winners: Bracket,
    /// Present when the consolation group plays a ladder rather than a
    /// cumulative contest.
    pub ladder: Option<Bracket>,
}

/// One week per round, ending in the season's final week.
fn single_week_rounds(season: &Season, rounds: u8) -> Vec<Vec<u8>> {
    (1..=rounds)
        .map(|r| vec![season.round_week(rounds, r)])
        .collect()
}

/// Partition the standing and lay out the winners bracket and, if the
/// format has one, the consolation ladder. Later rounds start pending.
pub fn build_brackets(season: &Season, standing: &Standing) -> Result<SeasonBrackets, EngineError> {
    let groups = partition(season, standing)?;

    let winners = build_bracket(
        BracketName::Winners,
        &groups.winners,
        Routing::WinnersAdvance,
        &single_week_rounds(season, season.playoff_rounds),
    )?;

    let ladder = match season.consolation {
        ConsolationRule::Ladder { teams, descent } => {
            let rounds = rounds_for_field(teams).unwrap_or(0);
            let routing = match descent {
                LadderDescent::Winners => Routing::LosersAdvance,
                LadderDescent::Losers => Routing::WinnersAdvance,
            };
            Some(build_bracket(
                BracketName::ToiletBowl,
                &groups.consolation,
                routing,
                &single_week_rounds(season, rounds),
            )?)
        }
        ConsolationRule::Cumulative { .. } => None,
    };

    debug!(
        "{} brackets built: {} winners nodes, ladder: {}",
        season.year,
        winners.nodes.len(),
        ladder.as_ref().map(|l| l.nodes.len()).unwrap_or(0)
    );

    Ok(SeasonBrackets {
        groups,
        winners,
        ladder,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
