// Per-team weekly score lookup shared by head-to-head and cumulative contests.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{TeamId, WeeklyResult};

/// A score the engine needed but the input did not contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingScore {
    pub team: TeamId,
    pub week: u8,
}

/// `points_for` keyed by (team, week).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreBook {
    points: BTreeMap<(TeamId, u8), f64>,
}

impl ScoreBook {
    /// Index already-validated results. A later duplicate overwrites an earlier one.
    pub fn from_results(results: &[WeeklyResult]) -> Self {
        let points = results
            .iter()
            .map(|r| ((r.team_id, r.week), r.points_for))
            .collect();
        ScoreBook { points }
    }

    pub fn points(&self, team: TeamId, week: u8) -> Option<f64> {
        self.points.get(&(team, week)).copied()
    }

    /// Per-week points over `weeks`, in the order given.
    pub fn window(&self, team: TeamId, weeks: &[u8]) -> Result<Vec<f64>, MissingScore> {
        weeks
            .iter()
            .map(|&week| self.points(team, week).ok_or(MissingScore { team, week }))
            .collect()
    }

    /// Sum of `points_for` over `weeks`.
    pub fn window_total(&self, team: TeamId, weeks: &[u8]) -> Result<f64, MissingScore> {
        Ok(self.window(team, weeks)?.iter().sum())
    }

    /// Whether any team has a score for `week`.
    pub fn has_week(&self, week: u8) -> bool {
        self.points.keys().any(|&(_, w)| w == week)
    }

    /// All weeks with at least one score, ascending.
    pub fn weeks(&self) -> BTreeSet<u8> {
        self.points.keys().map(|&(_, w)| w).collect()
    }
}
