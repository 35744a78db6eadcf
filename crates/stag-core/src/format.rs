// Season format resolution: the era table and the per-season descriptor it yields.
//
// The era table is the single source of truth for postseason shape. Every
// other component reads format facts from a resolved `Season`.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::error::EngineError;

/// The era table compiled into the crate.
const BUILTIN_ERAS: &str = include_str!("../defaults/eras.toml");

/// Longest season a row may describe, regular plus playoff weeks.
pub const MAX_SEASON_WEEKS: u8 = 18;

/// League sizes the engine knows how to partition.
pub const SUPPORTED_TEAM_COUNTS: &[usize] = &[10, 12];

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to read era table {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse era table {origin}: {source}")]
    Parse {
        origin: String,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    Validation { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Era rows
// ---------------------------------------------------------------------------

/// Closed set of postseason formats the league has used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatVersion {
    /// 4-team playoff, rank-determining mediocre bowl, 2-team toilet bowl.
    #[serde(rename = "legacy_4team")]
    Legacy4Team,
    /// 6-team playoff, rank-determining mediocre bowl, 2-team toilet bowl.
    #[serde(rename = "legacy_6team_mediocre")]
    Legacy6TeamMediocre,
    /// 6-team playoff and a 6-team consolation ladder, no mediocre bowl.
    #[serde(rename = "legacy_6team_no_mediocre")]
    Legacy6TeamNoMediocre,
    /// 6-team playoff, bragging-rights mediocre bowl, 4-team ladder.
    #[serde(rename = "modern_6team_mediocre")]
    Modern6TeamMediocre,
}

/// Mid-table total-points contest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediocreBowlRule {
    pub teams: usize,
    pub weeks: u8,
    /// When false the contest is bragging rights only and ranks follow the
    /// regular season.
    pub decides_rank: bool,
}

/// Which side of a ladder game drops toward last place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LadderDescent {
    /// Losers advance: the game winner drops to the lower game.
    Winners,
    /// The game loser drops to the lower game.
    Losers,
}

/// Shape of the bottom group's postseason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum ConsolationRule {
    /// Ranked by points summed over the last `weeks` playoff weeks.
    Cumulative { teams: usize, weeks: u8 },
    /// Head-to-head ladder with byes, routed by `descent`.
    Ladder { teams: usize, descent: LadderDescent },
}

impl ConsolationRule {
    pub fn teams(&self) -> usize {
        match self {
            ConsolationRule::Cumulative { teams, .. } | ConsolationRule::Ladder { teams, .. } => {
                *teams
            }
        }
    }
}

/// One row of the era table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EraRule {
    pub first_year: u16,
    pub last_year: u16,
    pub team_count: usize,
    pub format_version: FormatVersion,
    pub regular_weeks: u8,
    pub playoff_weeks: u8,
    pub playoff_field: usize,
    #[serde(default)]
    pub mediocre_bowl: Option<MediocreBowlRule>,
    pub consolation: ConsolationRule,
}

impl EraRule {
    pub fn covers(&self, year: u16, team_count: usize) -> bool {
        self.team_count == team_count && (self.first_year..=self.last_year).contains(&year)
    }
}

#[derive(Debug, Deserialize)]
struct EraFile {
    era: Vec<EraRule>,
}

/// Number of elimination rounds a bracket of `field` teams needs.
pub fn rounds_for_field(field: usize) -> Option<u8> {
    match field {
        2 => Some(1),
        4 => Some(2),
        6 => Some(3),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Resolved season descriptor
// ---------------------------------------------------------------------------

/// Immutable description of one season's format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub year: u16,
    pub team_count: usize,
    pub format_version: FormatVersion,
    pub regular_weeks: u8,
    pub playoff_weeks: u8,
    pub playoff_field: usize,
    pub playoff_rounds: u8,
    pub mediocre_bowl: Option<MediocreBowlRule>,
    pub consolation: ConsolationRule,
}

impl Season {
    fn from_rule(year: u16, rule: &EraRule, playoff_rounds: u8) -> Self {
        Season {
            year,
            team_count: rule.team_count,
            format_version: rule.format_version,
            regular_weeks: rule.regular_weeks,
            playoff_weeks: rule.playoff_weeks,
            playoff_field: rule.playoff_field,
            playoff_rounds,
            mediocre_bowl: rule.mediocre_bowl,
            consolation: rule.consolation,
        }
    }

    /// Last week of the season (championship week).
    pub fn final_week(&self) -> u8 {
        self.regular_weeks + self.playoff_weeks
    }

    pub fn playoff_range(&self) -> RangeInclusive<u8> {
        (self.regular_weeks + 1)..=self.final_week()
    }

    pub fn is_playoff_week(&self, week: u8) -> bool {
        self.playoff_range().contains(&week)
    }

    /// The last `weeks` playoff weeks, in order.
    pub fn window(&self, weeks: u8) -> Vec<u8> {
        let weeks = weeks.min(self.playoff_weeks);
        ((self.final_week() + 1 - weeks)..=self.final_week()).collect()
    }

    /// Week in which `round` of a `rounds`-round bracket is played.
    /// Brackets finish in the final week.
    pub fn round_week(&self, rounds: u8, round: u8) -> u8 {
        self.final_week() - (rounds - round)
    }

    /// Seed range of the mediocre bowl group, if the format has one.
    pub fn mediocre_seeds(&self) -> Option<RangeInclusive<usize>> {
        self.mediocre_bowl.map(|m| {
            let first = self.playoff_field + 1;
            first..=(first + m.teams - 1)
        })
    }

    /// Seed range of the consolation group.
    pub fn consolation_seeds(&self) -> RangeInclusive<usize> {
        let first = self.playoff_field + self.mediocre_bowl.map(|m| m.teams).unwrap_or(0) + 1;
        first..=(first + self.consolation.teams() - 1)
    }
}

// ---------------------------------------------------------------------------
// Format table
// ---------------------------------------------------------------------------

/// The validated era table.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatTable {
    eras: Vec<EraRule>,
}

impl FormatTable {
    /// The table shipped in `defaults/eras.toml`.
    pub fn builtin() -> Result<Self, FormatError> {
        Self::parse(BUILTIN_ERAS, "builtin")
    }

    /// TOML text of the built-in table, for seeding an editable copy.
    pub fn builtin_source() -> &'static str {
        BUILTIN_ERAS
    }

    pub fn from_toml_str(text: &str) -> Result<Self, FormatError> {
        Self::parse(text, "inline")
    }

    pub fn from_path(path: &Path) -> Result<Self, FormatError> {
        let text = std::fs::read_to_string(path).map_err(|source| FormatError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    fn parse(text: &str, origin: &str) -> Result<Self, FormatError> {
        let file: EraFile = toml::from_str(text).map_err(|source| FormatError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        let table = FormatTable { eras: file.era };
        table.validate()?;
        debug!("loaded {} era rows from {}", table.eras.len(), origin);
        Ok(table)
    }

    pub fn eras(&self) -> &[EraRule] {
        &self.eras
    }

    /// Resolve the format for `year` with `team_count` teams.
    pub fn resolve(&self, year: u16, team_count: usize) -> Result<Season, EngineError> {
        let unsupported = EngineError::UnsupportedFormat { year, team_count };
        if !SUPPORTED_TEAM_COUNTS.contains(&team_count) {
            return Err(unsupported);
        }
        let rule = self
            .eras
            .iter()
            .find(|r| r.covers(year, team_count))
            .ok_or(unsupported.clone())?;
        let rounds = rounds_for_field(rule.playoff_field).ok_or(unsupported)?;
        Ok(Season::from_rule(year, rule, rounds))
    }

    fn validate(&self) -> Result<(), FormatError> {
        if self.eras.is_empty() {
            return Err(invalid("era", "table has no rows".into()));
        }

        for (i, rule) in self.eras.iter().enumerate() {
            let field = |name: &str| format!("era[{i}].{name}");

            if !SUPPORTED_TEAM_COUNTS.contains(&rule.team_count) {
                return Err(invalid(
                    &field("team_count"),
                    format!("must be one of {SUPPORTED_TEAM_COUNTS:?}, got {}", rule.team_count),
                ));
            }
            if rule.first_year > rule.last_year {
                return Err(invalid(
                    &field("first_year"),
                    format!("{} is after last_year {}", rule.first_year, rule.last_year),
                ));
            }
            if rule.regular_weeks == 0 {
                return Err(invalid(&field("regular_weeks"), "must be > 0".into()));
            }
            if rule.playoff_weeks == 0 {
                return Err(invalid(&field("playoff_weeks"), "must be > 0".into()));
            }
            match rule.regular_weeks.checked_add(rule.playoff_weeks) {
                Some(total) if total <= MAX_SEASON_WEEKS => {}
                _ => {
                    return Err(invalid(
                        &field("playoff_weeks"),
                        format!(
                            "{} regular + {} playoff weeks exceed {MAX_SEASON_WEEKS}",
                            rule.regular_weeks, rule.playoff_weeks
                        ),
                    ))
                }
            }

            let rounds = rounds_for_field(rule.playoff_field).ok_or_else(|| {
                invalid(
                    &field("playoff_field"),
                    format!("must be 2, 4 or 6, got {}", rule.playoff_field),
                )
            })?;
            if rounds > rule.playoff_weeks {
                return Err(invalid(
                    &field("playoff_field"),
                    format!("{rounds} rounds do not fit in {} playoff weeks", rule.playoff_weeks),
                ));
            }

            if let Some(m) = &rule.mediocre_bowl {
                if m.teams == 0 {
                    return Err(invalid(&field("mediocre_bowl.teams"), "must be > 0".into()));
                }
                check_window(&field("mediocre_bowl.weeks"), m.weeks, rule.playoff_weeks)?;
            }

            match rule.consolation {
                ConsolationRule::Cumulative { teams, weeks } => {
                    if teams == 0 {
                        return Err(invalid(&field("consolation.teams"), "must be > 0".into()));
                    }
                    check_window(&field("consolation.weeks"), weeks, rule.playoff_weeks)?;
                }
                ConsolationRule::Ladder { teams, .. } => {
                    let ladder_rounds = rounds_for_field(teams).ok_or_else(|| {
                        invalid(
                            &field("consolation.teams"),
                            format!("ladder must have 2, 4 or 6 teams, got {teams}"),
                        )
                    })?;
                    if ladder_rounds > rule.playoff_weeks {
                        return Err(invalid(
                            &field("consolation.teams"),
                            format!(
                                "{ladder_rounds} ladder rounds do not fit in {} playoff weeks",
                                rule.playoff_weeks
                            ),
                        ));
                    }
                }
            }

            let covered = rule.playoff_field
                + rule.mediocre_bowl.map(|m| m.teams).unwrap_or(0)
                + rule.consolation.teams();
            if covered != rule.team_count {
                return Err(invalid(
                    &field("consolation.teams"),
                    format!("groups cover {covered} teams, league has {}", rule.team_count),
                ));
            }

            if let Some(other) = self.eras[..i].iter().find(|o| {
                o.team_count == rule.team_count
                    && o.first_year <= rule.last_year
                    && rule.first_year <= o.last_year
            }) {
                return Err(invalid(
                    &field("first_year"),
                    format!(
                        "{}-{} overlaps {}-{} for {} teams",
                        rule.first_year, rule.last_year, other.first_year, other.last_year, rule.team_count
                    ),
                ));
            }
        }

        Ok(())
    }
}

fn check_window(field: &str, weeks: u8, playoff_weeks: u8) -> Result<(), FormatError> {
    if weeks == 0 || weeks > playoff_weeks {
        return Err(invalid(
            field,
            format!("must be between 1 and {playoff_weeks}, got {weeks}"),
        ));
    }
    Ok(())
}

fn invalid(field: &str, message: String) -> FormatError {
    FormatError::Validation {
        field: field.to_string(),
        message,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
