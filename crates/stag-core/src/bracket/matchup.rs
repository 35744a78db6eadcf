// Single-game resolution: summed points over the game's week window.

use std::cmp::Ordering;

use super::{MatchOutcome, NodeState};
use crate::model::{Standing, TeamId};
use crate::ranking::tiebreak;
use crate::scores::{MissingScore, ScoreBook};

/// A bye: the only team advances without a score comparison.
pub fn walkover(team: TeamId) -> NodeState {
    NodeState::Bye { advanced: team }
}

/// Decide a game between `a` and `b`.
///
/// Each side scores its `points_for` summed over `weeks`; the strictly
/// higher total wins. Equal totals fall back to regular-season points for,
/// then the lower team id.
pub fn resolve_match(
    a: TeamId,
    b: TeamId,
    weeks: &[u8],
    scores: &ScoreBook,
    standing: &Standing,
) -> Result<MatchOutcome, MissingScore> {
    let a_points = scores.window_total(a, weeks)?;
    let b_points = scores.window_total(b, weeks)?;

    let a_wins = match a_points.total_cmp(&b_points) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => tiebreak(standing, a, b) != Ordering::Greater,
    };

    Ok(if a_wins {
        MatchOutcome {
            winner: a,
            loser: b,
            winner_points: a_points,
            loser_points: b_points,
        }
    } else {
        MatchOutcome {
            winner: b,
            loser: a,
            winner_points: b_points,
            loser_points: a_points,
        }
    })
}

/// Resolve a pairing that may be missing its second side.
pub fn resolve_pairing(
    a: TeamId,
    b: Option<TeamId>,
    weeks: &[u8],
    scores: &ScoreBook,
    standing: &Standing,
) -> Result<NodeState, MissingScore> {
    match b {
        None => Ok(walkover(a)),
        Some(b) => resolve_match(a, b, weeks, scores, standing).map(NodeState::Resolved),
    }
}
