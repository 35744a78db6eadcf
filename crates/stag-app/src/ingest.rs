// Season data loading from already-extracted CSV files.
//
// Each year lives in its own directory:
//   <data>/<year>/teams.csv    team_id,display_name
//   <data>/<year>/results.csv  team_id,week,points_for,opponent_team_id,points_against
//
// The opponent columns are left empty for an unopposed playoff score.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use stag_core::model::{Team, TeamId, WeeklyResult};
use stag_core::SeasonInput;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawTeam {
    team_id: u32,
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    team_id: u32,
    week: u8,
    points_for: f64,
    #[serde(default)]
    opponent_team_id: Option<u32>,
    #[serde(default)]
    points_against: Option<f64>,
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn load_teams_from_reader<R: Read>(rdr: R) -> Result<Vec<Team>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut teams: Vec<Team> = Vec::new();
    let mut seen = BTreeSet::new();
    for result in reader.deserialize::<RawTeam>() {
        match result {
            Ok(raw) => {
                if !seen.insert(raw.team_id) {
                    warn!("duplicate team {}, keeping the first row", raw.team_id);
                    continue;
                }
                teams.push(Team::new(raw.team_id, raw.display_name.trim()));
            }
            Err(e) => {
                warn!("skipping malformed team row: {}", e);
            }
        }
    }
    Ok(teams)
}

fn load_results_from_reader<R: Read>(rdr: R) -> Result<Vec<WeeklyResult>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut results = Vec::new();
    for result in reader.deserialize::<RawResult>() {
        match result {
            Ok(raw) => {
                if !raw.points_for.is_finite() {
                    warn!(
                        "skipping result for team {} week {}: non-finite points_for",
                        raw.team_id, raw.week
                    );
                    continue;
                }
                if raw.opponent_team_id.is_some() != raw.points_against.is_some() {
                    warn!(
                        "skipping result for team {} week {}: opponent and points_against must both be set or both empty",
                        raw.team_id, raw.week
                    );
                    continue;
                }
                results.push(WeeklyResult {
                    team_id: TeamId(raw.team_id),
                    week: raw.week,
                    points_for: raw.points_for,
                    opponent_team_id: raw.opponent_team_id.map(TeamId),
                    points_against: raw.points_against,
                });
            }
            Err(e) => {
                warn!("skipping malformed result row: {}", e);
            }
        }
    }
    Ok(results)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<std::fs::File, IngestError> {
    std::fs::File::open(path).map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

pub fn load_teams(path: &Path) -> Result<Vec<Team>, IngestError> {
    load_teams_from_reader(open(path)?).map_err(|e| IngestError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

pub fn load_results(path: &Path) -> Result<Vec<WeeklyResult>, IngestError> {
    load_results_from_reader(open(path)?).map_err(|e| IngestError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load one season from `<data_dir>/<year>/`.
///
/// A missing `results.csv` is treated as a season with no games played yet.
pub fn load_season(data_dir: &Path, year: u16) -> Result<SeasonInput, IngestError> {
    let dir = data_dir.join(year.to_string());
    let teams = load_teams(&dir.join("teams.csv"))?;
    if teams.is_empty() {
        return Err(IngestError::Validation(format!(
            "{} produced zero valid team rows",
            dir.join("teams.csv").display()
        )));
    }

    let results_path = dir.join("results.csv");
    let results = if results_path.exists() {
        load_results(&results_path)?
    } else {
        Vec::new()
    };

    debug!(
        "loaded {}: {} teams, {} weekly results",
        year,
        teams.len(),
        results.len()
    );
    Ok(SeasonInput {
        year,
        teams,
        results,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
