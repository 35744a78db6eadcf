// Library root: the final-standings engine. Every module is a pure function
// of a season's format and weekly results; nothing here touches the network.

pub mod assemble;
pub mod bracket;
pub mod cumulative;
pub mod error;
pub mod format;
pub mod model;
pub mod ranking;
pub mod scores;
pub mod season;

pub use error::EngineError;
pub use format::{FormatError, FormatTable, Season};
pub use season::{resolve_season, OutcomeStatus, SeasonInput, SeasonOutcome};
