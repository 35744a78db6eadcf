// Report writing: the full outcome as JSON and the placement table as CSV.

use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use stag_core::model::{Placement, PlacementSource};
use stag_core::{OutcomeStatus, SeasonOutcome};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode JSON for {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write CSV {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

/// One line of `placements.csv`.
#[derive(Debug, Serialize)]
struct PlacementRow<'a> {
    final_rank: usize,
    team_id: u32,
    display_name: &'a str,
    label: String,
    source: &'static str,
    bracket: &'static str,
    round_eliminated: Option<u8>,
    record: String,
    points_for: f64,
}

fn source_name(source: PlacementSource) -> &'static str {
    match source {
        PlacementSource::Bracket => "bracket",
        PlacementSource::Cumulative => "cumulative",
        PlacementSource::RegularSeason => "regular_season",
    }
}

fn row<'a>(outcome: &SeasonOutcome, p: &'a Placement) -> PlacementRow<'a> {
    let entry = outcome.standing.get(p.team_id);
    PlacementRow {
        final_rank: p.final_rank,
        team_id: p.team_id.0,
        display_name: &p.display_name,
        label: p.label.to_string(),
        source: source_name(p.source),
        bracket: p.bracket_name.map(|b| b.label()).unwrap_or(""),
        round_eliminated: p.round_eliminated,
        record: entry.map(|e| e.record()).unwrap_or_default(),
        points_for: entry.map(|e| e.points_for).unwrap_or(0.0),
    }
}

/// Write the placement table, one row per team in rank order.
pub fn write_placements_csv<W: Write>(writer: W, outcome: &SeasonOutcome) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for p in &outcome.placements {
        wtr.serialize(row(outcome, p))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `<output_dir>/<year>/outcome.json` and `placements.csv`.
/// Returns the paths written.
pub fn write_outcome(output_dir: &Path, outcome: &SeasonOutcome) -> Result<Vec<PathBuf>, ReportError> {
    let dir = output_dir.join(outcome.season.year.to_string());
    std::fs::create_dir_all(&dir).map_err(|e| ReportError::Io {
        path: dir.clone(),
        source: e,
    })?;

    let json_path = dir.join("outcome.json");
    let json = serde_json::to_string_pretty(outcome).map_err(|e| ReportError::Json {
        path: json_path.clone(),
        source: e,
    })?;
    std::fs::write(&json_path, json).map_err(|e| ReportError::Io {
        path: json_path.clone(),
        source: e,
    })?;

    let csv_path = dir.join("placements.csv");
    let file = std::fs::File::create(&csv_path).map_err(|e| ReportError::Io {
        path: csv_path.clone(),
        source: e,
    })?;
    write_placements_csv(file, outcome).map_err(|e| ReportError::Csv {
        path: csv_path.clone(),
        source: e,
    })?;

    Ok(vec![json_path, csv_path])
}

/// One-line summary for the console.
pub fn summary_line(outcome: &SeasonOutcome) -> String {
    let first = outcome
        .placements
        .first()
        .map(|p| p.display_name.as_str())
        .unwrap_or("-");
    let last = outcome
        .placements
        .last()
        .map(|p| p.display_name.as_str())
        .unwrap_or("-");
    match outcome.status {
        OutcomeStatus::Final => format!(
            "{}: champion {}, last place {}",
            outcome.season.year, first, last
        ),
        OutcomeStatus::Provisional => format!(
            "{}: playoffs in progress (winners bracket round {} of {}), leader {}",
            outcome.season.year,
            outcome.brackets.winners.resolved_rounds(),
            outcome.brackets.winners.rounds,
            first
        ),
        OutcomeStatus::Standing => format!(
            "{}: regular season only, leader {}",
            outcome.season.year, first
        ),
    }
}
