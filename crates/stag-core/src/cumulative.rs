// Total-points contests: the mediocre bowl and the toilet bowl tally.
//
// These are not head-to-head: every team in the group sums its points over
// the same window of weeks and the group is ranked by total.

use std::cmp::Ordering;

use tracing::debug;

use crate::bracket::builder::SeasonGroups;
use crate::error::EngineError;
use crate::format::{rounds_for_field, ConsolationRule, Season};
use crate::model::{BracketName, CumulativeEntry, Seed, Standing};
use crate::ranking::tiebreak;
use crate::scores::{MissingScore, ScoreBook};

/// Rank `seeds` by points summed over `weeks`, highest first.
///
/// Equal totals fall back to regular-season points for, then team id.
pub fn rank_cumulative(
    seeds: &[Seed],
    weeks: &[u8],
    scores: &ScoreBook,
    standing: &Standing,
) -> Result<Vec<CumulativeEntry>, MissingScore> {
    let mut entries = seeds
        .iter()
        .map(|seed| {
            let per_week_points = scores.window(seed.team_id, weeks)?;
            Ok(CumulativeEntry {
                team_id: seed.team_id,
                rank: 0,
                weeks: weeks.to_vec(),
                total: per_week_points.iter().sum(),
                per_week_points,
            })
        })
        .collect::<Result<Vec<_>, MissingScore>>()?;

    entries.sort_by(|a, b| match b.total.total_cmp(&a.total) {
        Ordering::Equal => tiebreak(standing, a.team_id, b.team_id),
        other => other,
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    Ok(entries)
}

/// Run a contest once every week of its window has been played.
///
/// `Ok(None)` means some week has no scores yet. A week that has scores but
/// not one for every team in the group is an error.
fn contest(
    name: BracketName,
    seeds: &[Seed],
    weeks: &[u8],
    scores: &ScoreBook,
    standing: &Standing,
) -> Result<Option<Vec<CumulativeEntry>>, EngineError> {
    if seeds.is_empty() || !weeks.iter().all(|&w| scores.has_week(w)) {
        return Ok(None);
    }
    let entries =
        rank_cumulative(seeds, weeks, scores, standing).map_err(|missing| {
            EngineError::IncompletePropagation {
                bracket: name,
                round: 1,
                reason: format!(
                    "team {} has no score for week {}",
                    missing.team, missing.week
                ),
            }
        })?;
    debug!(
        "{} over weeks {:?}: leader {:?}",
        name,
        weeks,
        entries.first().map(|e| (e.team_id, e.total))
    );
    Ok(Some(entries))
}

/// Weeks the mediocre bowl group sums over, if the format has one.
pub fn mediocre_window(season: &Season) -> Option<Vec<u8>> {
    season.mediocre_bowl.map(|m| season.window(m.weeks))
}

/// Weeks the consolation group sums over. For a ladder this is the weeks the
/// ladder is played in.
pub fn toilet_window(season: &Season) -> Vec<u8> {
    match season.consolation {
        ConsolationRule::Cumulative { weeks, .. } => season.window(weeks),
        ConsolationRule::Ladder { teams, .. } => season.window(rounds_for_field(teams).unwrap_or(0)),
    }
}

/// The mediocre bowl ranking, once its window is complete.
pub fn mediocre_bowl(
    season: &Season,
    groups: &SeasonGroups,
    scores: &ScoreBook,
    standing: &Standing,
) -> Result<Option<Vec<CumulativeEntry>>, EngineError> {
    match mediocre_window(season) {
        Some(weeks) => contest(BracketName::MediocreBowl, &groups.mediocre, &weeks, scores, standing),
        None => Ok(None),
    }
}

/// The toilet bowl points tally, once its window is complete.
pub fn toilet_bowl(
    season: &Season,
    groups: &SeasonGroups,
    scores: &ScoreBook,
    standing: &Standing,
) -> Result<Option<Vec<CumulativeEntry>>, EngineError> {
    let weeks = toilet_window(season);
    contest(BracketName::ToiletBowl, &groups.consolation, &weeks, scores, standing)
}
