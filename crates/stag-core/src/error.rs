// Engine error taxonomy.

use thiserror::Error;

use crate::model::{BracketName, TeamId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// No era row covers this year/team-count combination.
    #[error("unsupported season format: year {year} with {team_count} teams")]
    UnsupportedFormat { year: u16, team_count: usize },

    /// Weekly results are missing, duplicated, or do not mirror each other.
    #[error("incomplete data for team {team} in week {week}: {reason}")]
    IncompleteData {
        team: TeamId,
        week: u8,
        reason: String,
    },

    /// Group sizes from the era table do not cover the league.
    #[error("bracket construction failed: expected {expected} teams, partition covers {actual} ({detail})")]
    BracketConstruction {
        expected: usize,
        actual: usize,
        detail: String,
    },

    /// A round was processed before its inputs were resolved.
    #[error("cannot propagate {bracket} round {round}: {reason}")]
    IncompletePropagation {
        bracket: BracketName,
        round: u8,
        reason: String,
    },

    /// The assembled placements are not a permutation of 1..=team_count.
    #[error("incomplete standings at rank {rank}: {reason}")]
    IncompleteStandings { rank: usize, reason: String },
}

impl EngineError {
    /// Whether the caller can fix this by supplying more results and retrying.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::IncompleteData { .. } | EngineError::IncompletePropagation { .. }
        )
    }
}
