//! Simulation Stages
//!
//! The linear lifecycle of one run.
//!
//! # Example
//!
//! ```
//! use opinion_model::SimulationStage;
//!
//! let stage = SimulationStage::Config;
//! assert_eq!(stage.next(), Some(SimulationStage::AgentGeneration));
//! assert_eq!(stage.to_string(), "config");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One phase of a simulation run, in strict linear order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SimulationStage {
    #[default]
    Config,
    AgentGeneration,
    PolicyInput,
    Conversation,
    Voting,
    Results,
}

impl SimulationStage {
    /// Returns all stages in lifecycle order.
    pub fn all() -> &'static [SimulationStage] {
        &[
            SimulationStage::Config,
            SimulationStage::AgentGeneration,
            SimulationStage::PolicyInput,
            SimulationStage::Conversation,
            SimulationStage::Voting,
            SimulationStage::Results,
        ]
    }

    /// Returns the immediate successor, or `None` for `Results`.
    pub fn next(self) -> Option<Self> {
        match self {
            SimulationStage::Config => Some(SimulationStage::AgentGeneration),
            SimulationStage::AgentGeneration => Some(SimulationStage::PolicyInput),
            SimulationStage::PolicyInput => Some(SimulationStage::Conversation),
            SimulationStage::Conversation => Some(SimulationStage::Voting),
            SimulationStage::Voting => Some(SimulationStage::Results),
            SimulationStage::Results => None,
        }
    }

    /// Position in the lifecycle, starting at 0.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_initial(self) -> bool {
        matches!(self, SimulationStage::Config)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SimulationStage::Results)
    }

    /// Short label for progress displays.
    pub fn label(self) -> &'static str {
        match self {
            SimulationStage::Config => "Setup",
            SimulationStage::AgentGeneration => "Agents",
            SimulationStage::PolicyInput => "Policy",
            SimulationStage::Conversation => "Conversations",
            SimulationStage::Voting => "Voting",
            SimulationStage::Results => "Results",
        }
    }
}

impl fmt::Display for SimulationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SimulationStage::Config => "config",
            SimulationStage::AgentGeneration => "agent-generation",
            SimulationStage::PolicyInput => "policy-input",
            SimulationStage::Conversation => "conversation",
            SimulationStage::Voting => "voting",
            SimulationStage::Results => "results",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for SimulationStage {
    type Err = ParseStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SimulationStage::all()
            .iter()
            .copied()
            .find(|stage| stage.to_string() == s.trim().to_lowercase())
            .ok_or_else(|| ParseStageError(s.to_string()))
    }
}

/// Error returned when a string names no stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStageError(pub String);

impl fmt::Display for ParseStageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown simulation stage: '{}'", self.0)
    }
}

impl std::error::Error for ParseStageError {}
