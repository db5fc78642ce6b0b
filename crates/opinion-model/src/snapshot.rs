//! Run Snapshot
//!
//! Serializable view of a whole run, used for JSON output.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::agent::{Agent, Policy};
use crate::conversation::{ConversationPair, ConversationResult};
use crate::stage::SimulationStage;
use crate::vote::VoteResult;

/// Everything one run holds at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSnapshot {
    pub run_id: Uuid,
    pub stage: SimulationStage,
    pub policy: Option<Policy>,
    pub agents: Vec<Agent>,
    pub conversation_pairs: Vec<ConversationPair>,
    pub conversation_results: BTreeMap<String, ConversationResult>,
    pub votes: VoteResult,
}

impl SimulationSnapshot {
    /// Serializes to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Looks up an agent by id.
    pub fn agent(&self, agent_id: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == agent_id)
    }
}
