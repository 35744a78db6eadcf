// Postseason brackets as an explicit DAG of games.
//
// Nodes only ever reference nodes of earlier rounds, so a bracket can be
// resolved strictly round by round.

pub mod builder;
pub mod matchup;
pub mod propagate;

use serde::{Deserialize, Serialize};

use crate::model::{BracketName, Seed, TeamId};

/// Index of a node within its bracket.
pub type NodeId = usize;

/// Where one side of a game comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Seed(Seed),
    WinnerOf(NodeId),
    LoserOf(NodeId),
    /// No opponent; the other side advances without playing.
    Bye,
}

/// Which side of a non-terminal game moves up the bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Routing {
    WinnersAdvance,
    /// Consolation ladder: the loser moves up, the winner drops down.
    LosersAdvance,
}

/// Final ranks written by a terminal game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalRanks {
    pub winner_rank: usize,
    pub loser_rank: usize,
}

/// Result of a played game.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub winner: TeamId,
    pub loser: TeamId,
    pub winner_points: f64,
    pub loser_points: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum NodeState {
    Pending,
    Bye { advanced: TeamId },
    Resolved(MatchOutcome),
}

/// One game (or bye) of a bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketNode {
    pub id: NodeId,
    pub bracket_name: BracketName,
    pub round: u8,
    /// Weeks whose points are summed to decide the game.
    pub weeks: Vec<u8>,
    pub slot_a: Slot,
    pub slot_b: Slot,
    pub terminal: Option<TerminalRanks>,
    pub state: NodeState,
}

impl BracketNode {
    pub fn is_resolved(&self) -> bool {
        !matches!(self.state, NodeState::Pending)
    }

    pub fn winner(&self) -> Option<TeamId> {
        match self.state {
            NodeState::Pending => None,
            NodeState::Bye { advanced } => Some(advanced),
            NodeState::Resolved(outcome) => Some(outcome.winner),
        }
    }

    pub fn loser(&self) -> Option<TeamId> {
        match self.state {
            NodeState::Resolved(outcome) => Some(outcome.loser),
            _ => None,
        }
    }
}

/// A single-elimination bracket or consolation ladder over one seed group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub name: BracketName,
    pub routing: Routing,
    pub rounds: u8,
    pub seeds: Vec<Seed>,
    pub nodes: Vec<BracketNode>,
}

impl Bracket {
    pub fn node(&self, id: NodeId) -> Option<&BracketNode> {
        self.nodes.get(id)
    }

    pub fn round_nodes(&self, round: u8) -> impl Iterator<Item = &BracketNode> {
        self.nodes.iter().filter(move |n| n.round == round)
    }

    /// Nodes grouped by round, first round first.
    pub fn by_round(&self) -> Vec<Vec<&BracketNode>> {
        (1..=self.rounds)
            .map(|r| self.round_nodes(r).collect())
            .collect()
    }

    pub fn is_round_resolved(&self, round: u8) -> bool {
        self.round_nodes(round).all(BracketNode::is_resolved)
    }

    /// Rounds fully resolved so far.
    pub fn resolved_rounds(&self) -> u8 {
        (1..=self.rounds)
            .take_while(|&r| self.is_round_resolved(r))
            .count() as u8
    }

    pub fn is_complete(&self) -> bool {
        self.nodes.iter().all(BracketNode::is_resolved)
    }

    /// Every week any node of `round` reads.
    pub fn round_weeks(&self, round: u8) -> Vec<u8> {
        let mut weeks: Vec<u8> = self
            .round_nodes(round)
            .flat_map(|n| n.weeks.iter().copied())
            .collect();
        weeks.sort_unstable();
        weeks.dedup();
        weeks
    }
}
