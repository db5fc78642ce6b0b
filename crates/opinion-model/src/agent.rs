//! Agent Types
//!
//! Synthetic persons, their sampled traits, and the policy they vote on.

use serde::{Deserialize, Serialize};

/// Names of the numeric traits, in declaration order.
pub const TRAIT_NAMES: [&str; 4] = ["anger", "persuasiveness", "gullibility", "income"];

/// Sampled personality of one agent.
///
/// Every numeric field lies in `[0, 1]`; the sampler clamps regardless of
/// the distribution parameters it was given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTraits {
    /// Religious affiliation, capitalized (e.g. "Hindu", "Other")
    pub religion: String,
    /// Normal-like, peaked around the configured mean
    pub anger: f64,
    /// Long-tail: mostly low, a few very persuasive agents
    pub persuasiveness: f64,
    /// Bimodal: a configurable share of highly gullible agents
    pub gullibility: f64,
    /// Long-tail, like persuasiveness
    pub income: f64,
}

impl AgentTraits {
    /// Numeric traits paired with their names.
    pub fn numeric(&self) -> [(&'static str, f64); 4] {
        [
            (TRAIT_NAMES[0], self.anger),
            (TRAIT_NAMES[1], self.persuasiveness),
            (TRAIT_NAMES[2], self.gullibility),
            (TRAIT_NAMES[3], self.income),
        ]
    }

    /// True when every numeric trait lies in `[0, 1]`.
    pub fn is_bounded(&self) -> bool {
        self.numeric()
            .iter()
            .all(|(_, v)| (0.0..=1.0).contains(v))
    }
}

/// A simulated person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    /// Stable identifier, unique within a run (`agent-{index}`)
    pub id: String,
    pub name: String,
    pub background: String,
    pub traits: AgentTraits,
    /// Append-only; grows with broadcasts and conversation lines
    #[serde(default)]
    pub memories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_reason: Option<String>,
}

impl Agent {
    /// Creates an agent that has not voted yet.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        background: impl Into<String>,
        traits: AgentTraits,
        memories: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            background: background.into(),
            traits,
            memories,
            vote: None,
            vote_reason: None,
        }
    }

    /// Appends one memory.
    pub fn remember(&mut self, memory: impl Into<String>) {
        self.memories.push(memory.into());
    }

    pub fn has_voted(&self) -> bool {
        self.vote.is_some()
    }
}

/// Generates the roster identifier for the agent at `index`.
pub fn generate_agent_id(index: usize) -> String {
    format!("agent-{}", index)
}

/// The policy under discussion. Set once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub text: String,
}

impl Policy {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The memory every agent receives when the policy is announced.
    pub fn announcement(&self) -> String {
        format!("The government announced a new policy: \"{}\"", self.text)
    }
}
