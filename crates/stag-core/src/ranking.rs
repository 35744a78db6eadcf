// Regular-season ranking: schedule validation and the seeded standing.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::EngineError;
use crate::format::Season;
use crate::model::{Standing, StandingEntry, Team, TeamId, WeeklyResult};

/// Two mirrored scores may differ by float noise from the extraction layer.
const SCORE_EPSILON: f64 = 1e-6;

/// Results indexed by (team, week). Built once the input has been validated.
pub(crate) type ResultIndex<'a> = BTreeMap<(TeamId, u8), &'a WeeklyResult>;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check the internal consistency of a season's weekly results.
///
/// Every result must belong to a rostered team, appear at most once per team
/// and week, and be mirrored by its opponent's result. Every regular-season
/// week that appears at all must have a game for every rostered team, and
/// once any playoff week appears every regular-season week must be there.
pub fn validate_results<'a>(
    season: &Season,
    teams: &[Team],
    results: &'a [WeeklyResult],
) -> Result<ResultIndex<'a>, EngineError> {
    let mut roster = BTreeSet::new();
    for team in teams {
        if !roster.insert(team.team_id) {
            return Err(incomplete(team.team_id, 0, "listed twice in the roster"));
        }
    }

    let mut index: ResultIndex<'a> = BTreeMap::new();
    for r in results {
        if r.week == 0 {
            return Err(incomplete(r.team_id, r.week, "weeks are numbered from 1"));
        }
        if !roster.contains(&r.team_id) {
            return Err(incomplete(r.team_id, r.week, "team is not on the roster"));
        }
        if !r.points_for.is_finite() {
            return Err(incomplete(r.team_id, r.week, "points_for is not a finite number"));
        }
        if let Some(opp) = r.opponent_team_id {
            if opp == r.team_id {
                return Err(incomplete(r.team_id, r.week, "team is listed as its own opponent"));
            }
            if !roster.contains(&opp) {
                return Err(incomplete(
                    r.team_id,
                    r.week,
                    &format!("opponent {opp} is not on the roster"),
                ));
            }
            if !r.points_against.is_some_and(f64::is_finite) {
                return Err(incomplete(r.team_id, r.week, "game has no points_against"));
            }
        }
        if index.insert((r.team_id, r.week), r).is_some() {
            return Err(incomplete(r.team_id, r.week, "more than one result for this week"));
        }
    }

    for r in index.values() {
        let (Some(opp), Some(against)) = (r.opponent_team_id, r.points_against) else {
            continue;
        };
        let mirror = index.get(&(opp, r.week)).ok_or_else(|| {
            incomplete(
                opp,
                r.week,
                &format!("no result mirroring the game against team {}", r.team_id),
            )
        })?;
        let mirrored = mirror.opponent_team_id == Some(r.team_id)
            && (mirror.points_for - against).abs() < SCORE_EPSILON
            && mirror
                .points_against
                .is_some_and(|pa| (pa - r.points_for).abs() < SCORE_EPSILON);
        if !mirrored {
            return Err(incomplete(
                opp,
                r.week,
                &format!("result does not mirror team {}'s game", r.team_id),
            ));
        }
    }

    let regular_weeks: BTreeSet<u8> = index
        .keys()
        .map(|&(_, week)| week)
        .filter(|&week| week <= season.regular_weeks)
        .collect();
    for &week in &regular_weeks {
        for &team in &roster {
            match index.get(&(team, week)) {
                None => return Err(incomplete(team, week, "no result for a played week")),
                Some(r) if r.opponent_team_id.is_none() => {
                    return Err(incomplete(team, week, "regular-season result has no opponent"))
                }
                Some(_) => {}
            }
        }
    }

    // Playoff seeding reads the whole regular season.
    let playoffs_started = index.keys().any(|&(_, week)| week > season.regular_weeks);
    if playoffs_started {
        if let (Some(&team), Some(week)) = (
            roster.iter().next(),
            (1..=season.regular_weeks).find(|w| !regular_weeks.contains(w)),
        ) {
            return Err(incomplete(
                team,
                week,
                "regular-season week has no results but playoff results exist",
            ));
        }
    }

    Ok(index)
}

fn incomplete(team: TeamId, week: u8, reason: &str) -> EngineError {
    EngineError::IncompleteData {
        team,
        week,
        reason: reason.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Tally {
    wins: u32,
    losses: u32,
    ties: u32,
    points_for: f64,
    points_against: f64,
}

/// Validate `results` and rank every rostered team over the regular-season
/// weeks present.
///
/// Order: win percentage, then points for (higher first), then team id
/// (lower first). The result does not depend on the order of `results`.
pub fn rank_regular_season(
    season: &Season,
    teams: &[Team],
    results: &[WeeklyResult],
) -> Result<Standing, EngineError> {
    let index = validate_results(season, teams, results)?;
    Ok(rank_indexed(season, teams, &index))
}

pub(crate) fn rank_indexed(season: &Season, teams: &[Team], index: &ResultIndex<'_>) -> Standing {
    let mut tallies: BTreeMap<TeamId, Tally> =
        teams.iter().map(|t| (t.team_id, Tally::default())).collect();

    // BTreeMap iteration is (team, week) ordered, so sums are order-stable.
    for (&(team, week), r) in index {
        if week > season.regular_weeks {
            continue;
        }
        let Some(against) = r.points_against else {
            continue;
        };
        let Some(tally) = tallies.get_mut(&team) else {
            continue;
        };
        match r.points_for.total_cmp(&against) {
            Ordering::Greater => tally.wins += 1,
            Ordering::Less => tally.losses += 1,
            Ordering::Equal => tally.ties += 1,
        }
        tally.points_for += r.points_for;
        tally.points_against += against;
    }

    let mut rows: Vec<StandingEntry> = tallies
        .into_iter()
        .map(|(team_id, t)| {
            let games = t.wins + t.losses + t.ties;
            let win_pct = if games == 0 {
                0.0
            } else {
                (f64::from(t.wins) + 0.5 * f64::from(t.ties)) / f64::from(games)
            };
            StandingEntry {
                team_id,
                rank: 0,
                wins: t.wins,
                losses: t.losses,
                ties: t.ties,
                win_pct,
                points_for: t.points_for,
                points_against: t.points_against,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.win_pct
            .total_cmp(&a.win_pct)
            .then_with(|| b.points_for.total_cmp(&a.points_for))
            .then_with(|| a.team_id.cmp(&b.team_id))
    });
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i + 1;
    }

    debug!(
        "regular season {} ranked: {} teams, leader {:?}",
        season.year,
        rows.len(),
        rows.first().map(|r| r.team_id)
    );

    Standing::from_ranked(rows)
}

/// Tie rule shared by matches and cumulative contests: higher regular-season
/// points for wins, then the lower team id. A team missing from the standing
/// sorts after every ranked team.
pub(crate) fn tiebreak(standing: &Standing, a: TeamId, b: TeamId) -> Ordering {
    let by_points = match (standing.points_for(a), standing.points_for(b)) {
        (Some(pa), Some(pb)) => pb.total_cmp(&pa),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_points.then_with(|| a.cmp(&b))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
