// One season end to end: format, standing, brackets, contests, placements.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::assemble::{assemble_placements, default_placements, PostseasonResults};
use crate::bracket::builder::{build_brackets, SeasonBrackets};
use crate::bracket::propagate::{propagate_available, terminal_placements};
use crate::bracket::Bracket;
use crate::cumulative;
use crate::error::EngineError;
use crate::format::{FormatTable, Season};
use crate::model::{CumulativeEntry, Placement, Standing, Team, WeeklyResult};
use crate::ranking::rank_regular_season;
use crate::scores::ScoreBook;

/// Everything known about one season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonInput {
    pub year: u16,
    pub teams: Vec<Team>,
    pub results: Vec<WeeklyResult>,
}

/// How far into the season the input reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// No playoff week has been played; placements are the standing.
    Standing,
    /// Some playoff rounds are decided; placements are still the standing.
    Provisional,
    /// Every bracket and contest is decided.
    Final,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonOutcome {
    pub season: Season,
    pub status: OutcomeStatus,
    pub standing: Standing,
    pub brackets: SeasonBrackets,
    pub mediocre_bowl: Option<Vec<CumulativeEntry>>,
    pub toilet_bowl: Option<Vec<CumulativeEntry>>,
    /// Ordered by final rank.
    pub placements: Vec<Placement>,
}

impl SeasonOutcome {
    pub fn is_final(&self) -> bool {
        self.status == OutcomeStatus::Final
    }

    pub fn champion(&self) -> Option<&Placement> {
        if self.is_final() {
            self.placements.first()
        } else {
            None
        }
    }
}

/// Resolve a season from whatever results are available.
///
/// Brackets advance through every round whose weeks have been played. The
/// outcome is `Final` only when every bracket and cumulative contest is
/// decided; until then placements follow the regular-season standing.
pub fn resolve_season(table: &FormatTable, input: &SeasonInput) -> Result<SeasonOutcome, EngineError> {
    let season = table.resolve(input.year, input.teams.len())?;
    let standing = rank_regular_season(&season, &input.teams, &input.results)?;
    let scores = ScoreBook::from_results(&input.results);

    let built = build_brackets(&season, &standing)?;
    let winners = propagate_available(&built.winners, &scores, &standing)?;
    let ladder = built
        .ladder
        .as_ref()
        .map(|l| propagate_available(l, &scores, &standing))
        .transpose()?;
    let brackets = SeasonBrackets {
        groups: built.groups,
        winners,
        ladder,
    };

    let mediocre_bowl = cumulative::mediocre_bowl(&season, &brackets.groups, &scores, &standing)?;
    let toilet_bowl = cumulative::toilet_bowl(&season, &brackets.groups, &scores, &standing)?;

    let complete = brackets.winners.is_complete()
        && brackets.ladder.as_ref().map_or(true, Bracket::is_complete)
        && (season.mediocre_bowl.is_none() || mediocre_bowl.is_some())
        && toilet_bowl.is_some();
    let playoffs_started = scores.weeks().iter().any(|&w| season.is_playoff_week(w));

    let (status, placements) = if complete {
        let winners = terminal_placements(&brackets.winners)?;
        let ladder = match &brackets.ladder {
            Some(l) => terminal_placements(l)?,
            None => Vec::new(),
        };
        let results = PostseasonResults {
            winners: &winners,
            ladder: &ladder,
            mediocre_bowl: mediocre_bowl.as_deref(),
            toilet_bowl: toilet_bowl.as_deref(),
        };
        let placements = assemble_placements(&season, &input.teams, &standing, &results)?;
        (OutcomeStatus::Final, placements)
    } else {
        let status = if playoffs_started {
            OutcomeStatus::Provisional
        } else {
            OutcomeStatus::Standing
        };
        debug!(
            "{}: winners bracket through round {} of {}",
            season.year,
            brackets.winners.resolved_rounds(),
            brackets.winners.rounds
        );
        (status, default_placements(&input.teams, &standing)?)
    };

    info!(
        "season {} resolved ({:?}): {} teams, leader {}",
        season.year,
        status,
        placements.len(),
        placements
            .first()
            .map(|p| p.display_name.as_str())
            .unwrap_or("-")
    );

    Ok(SeasonOutcome {
        season,
        status,
        standing,
        brackets,
        mediocre_bowl,
        toilet_bowl,
        placements,
    })
}
