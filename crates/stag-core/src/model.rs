// Season data model: teams, weekly results, standings, placements.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Teams and weekly facts
// ---------------------------------------------------------------------------

/// League-site team identifier, unique within a season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub u32);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A rostered team for one season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub team_id: TeamId,
    pub display_name: String,
}

impl Team {
    pub fn new(team_id: u32, display_name: impl Into<String>) -> Self {
        Team {
            team_id: TeamId(team_id),
            display_name: display_name.into(),
        }
    }
}

/// One team's score for one week, as extracted from the league site.
///
/// Regular-season results always carry an opponent. Playoff weeks may not
/// (a team on a bye still scores points that cumulative contests read).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyResult {
    pub team_id: TeamId,
    pub week: u8,
    pub points_for: f64,
    pub opponent_team_id: Option<TeamId>,
    pub points_against: Option<f64>,
}

impl WeeklyResult {
    /// A head-to-head result.
    pub fn game(team: u32, week: u8, points_for: f64, opponent: u32, points_against: f64) -> Self {
        WeeklyResult {
            team_id: TeamId(team),
            week,
            points_for,
            opponent_team_id: Some(TeamId(opponent)),
            points_against: Some(points_against),
        }
    }

    /// A score with no opponent (playoff bye week).
    pub fn unopposed(team: u32, week: u8, points_for: f64) -> Self {
        WeeklyResult {
            team_id: TeamId(team),
            week,
            points_for,
            opponent_team_id: None,
            points_against: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Regular-season standing
// ---------------------------------------------------------------------------

/// One row of the regular-season table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingEntry {
    pub team_id: TeamId,
    /// 1-based position; a total order with no shared ranks.
    pub rank: usize,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub win_pct: f64,
    pub points_for: f64,
    pub points_against: f64,
}

impl StandingEntry {
    pub fn record(&self) -> String {
        if self.ties > 0 {
            format!("{}-{}-{}", self.wins, self.losses, self.ties)
        } else {
            format!("{}-{}", self.wins, self.losses)
        }
    }
}

/// Regular-season standing, ordered by rank.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Standing {
    entries: Vec<StandingEntry>,
}

impl Standing {
    /// Wrap rows that are already in rank order (rank `i + 1` at index `i`).
    pub(crate) fn from_ranked(entries: Vec<StandingEntry>) -> Self {
        Standing { entries }
    }

    pub fn entries(&self) -> &[StandingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, team: TeamId) -> Option<&StandingEntry> {
        self.entries.iter().find(|e| e.team_id == team)
    }

    pub fn rank_of(&self, team: TeamId) -> Option<usize> {
        self.get(team).map(|e| e.rank)
    }

    /// Regular-season points for, `None` for a team outside the standing.
    pub fn points_for(&self, team: TeamId) -> Option<f64> {
        self.get(team).map(|e| e.points_for)
    }

    /// The team holding the given 1-based seed.
    pub fn team_at(&self, seed: usize) -> Option<TeamId> {
        seed.checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(|e| e.team_id)
    }

    /// Seeds `first..=last` in order. Seeds past the end are skipped.
    pub fn seeds(&self, first: usize, last: usize) -> Vec<Seed> {
        (first..=last)
            .filter_map(|n| {
                self.team_at(n).map(|team_id| Seed {
                    seed_number: n,
                    team_id,
                })
            })
            .collect()
    }
}

/// A team's entry position into the postseason, taken from the standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seed {
    pub seed_number: usize,
    pub team_id: TeamId,
}

// ---------------------------------------------------------------------------
// Postseason groups and placements
// ---------------------------------------------------------------------------

/// The postseason competitions a team can end its season in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketName {
    Winners,
    MediocreBowl,
    ToiletBowl,
}

impl BracketName {
    pub fn label(&self) -> &'static str {
        match self {
            BracketName::Winners => "Winners Bracket",
            BracketName::MediocreBowl => "Mediocre Bowl",
            BracketName::ToiletBowl => "Toilet Bowl",
        }
    }
}

impl fmt::Display for BracketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Human-readable title attached to a final rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "rank")]
pub enum PlacementLabel {
    Champion,
    RunnerUp,
    MediocreBowlWinner,
    ToiletBowlLoser,
    /// Plain ordinal place ("Fifth Place").
    Place(usize),
}

impl PlacementLabel {
    /// Default label for a rank with no special title.
    pub fn for_rank(rank: usize) -> Self {
        match rank {
            1 => PlacementLabel::Champion,
            2 => PlacementLabel::RunnerUp,
            n => PlacementLabel::Place(n),
        }
    }
}

impl fmt::Display for PlacementLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementLabel::Champion => f.write_str("Champion"),
            PlacementLabel::RunnerUp => f.write_str("Runner-up"),
            PlacementLabel::MediocreBowlWinner => f.write_str("Mediocre Bowl Winner"),
            PlacementLabel::ToiletBowlLoser => f.write_str("Toilet Bowl Loser"),
            PlacementLabel::Place(n) => write!(f, "{}", place_name(*n)),
        }
    }
}

/// "Third Place", "Eleventh Place", falling back to "13th Place".
pub fn place_name(rank: usize) -> String {
    const WORDS: [&str; 12] = [
        "First", "Second", "Third", "Fourth", "Fifth", "Sixth", "Seventh", "Eighth", "Ninth",
        "Tenth", "Eleventh", "Twelfth",
    ];
    match rank.checked_sub(1).and_then(|i| WORDS.get(i)) {
        Some(word) => format!("{word} Place"),
        None => format!("{rank}{} Place", ordinal_suffix(rank)),
    }
}

fn ordinal_suffix(n: usize) -> &'static str {
    match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Which mechanism fixed a team's final rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementSource {
    /// A terminal bracket game.
    Bracket,
    /// A rank-determining cumulative-points contest.
    Cumulative,
    /// Regular-season order alone.
    RegularSeason,
}

/// A team's definitive place for the season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub team_id: TeamId,
    pub display_name: String,
    pub final_rank: usize,
    pub label: PlacementLabel,
    pub source: PlacementSource,
    pub round_eliminated: Option<u8>,
    pub bracket_name: Option<BracketName>,
}

/// Points a team piled up over a cumulative contest's week window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativeEntry {
    pub team_id: TeamId,
    /// 1-based position in the contest (total descending).
    pub rank: usize,
    pub weeks: Vec<u8>,
    pub per_week_points: Vec<f64>,
    pub total: f64,
}
