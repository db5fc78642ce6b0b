//! Simulation State
//!
//! Single owner of a run's roster, policy, pairings, conversations and
//! stage. Every mutation goes through a named operation so the invariants
//! (unique ids, one policy per run, append-only memories) hold in one place.

use opinion_model::{
    Agent, ConversationPair, ConversationResult, Policy, SimulationSnapshot, SimulationStage,
    VoteResult,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::votes;

/// How `advance_stage` treats non-sequential targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Only the immediate successor is accepted
    #[default]
    Strict,
    /// Any stage may be set directly
    Permissive,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("duplicate agent id: {0}")]
    DuplicateAgent(String),

    #[error("invalid stage transition from {from} to {to}")]
    InvalidTransition {
        from: SimulationStage,
        to: SimulationStage,
    },

    #[error("policy already set for this run")]
    PolicyAlreadySet,

    #[error("operation requires stage {expected}, current stage is {actual}")]
    WrongStage {
        expected: SimulationStage,
        actual: SimulationStage,
    },
}

/// All mutable state of one run.
#[derive(Debug, Clone)]
pub struct SimulationState {
    run_id: Uuid,
    stage: SimulationStage,
    transition_policy: TransitionPolicy,
    agents: Vec<Agent>,
    policy: Option<Policy>,
    pairs: Vec<ConversationPair>,
    conversations: BTreeMap<String, ConversationResult>,
}

impl Default for SimulationState {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationState {
    pub fn new() -> Self {
        Self::with_transition_policy(TransitionPolicy::default())
    }

    pub fn with_transition_policy(transition_policy: TransitionPolicy) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            stage: SimulationStage::Config,
            transition_policy,
            agents: Vec::new(),
            policy: None,
            pairs: Vec::new(),
            conversations: BTreeMap::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn stage(&self) -> SimulationStage {
        self.stage
    }

    pub fn transition_policy(&self) -> TransitionPolicy {
        self.transition_policy
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, agent_id: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == agent_id)
    }

    pub fn agent_ids(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.id.clone()).collect()
    }

    pub fn policy(&self) -> Option<&Policy> {
        self.policy.as_ref()
    }

    pub fn pairs(&self) -> &[ConversationPair] {
        &self.pairs
    }

    pub fn conversations(&self) -> &BTreeMap<String, ConversationResult> {
        &self.conversations
    }

    pub fn conversation(&self, pair_id: &str) -> Option<&ConversationResult> {
        self.conversations.get(pair_id)
    }

    fn agent_mut(&mut self, agent_id: &str) -> Result<&mut Agent, StateError> {
        self.agents
            .iter_mut()
            .find(|a| a.id == agent_id)
            .ok_or_else(|| StateError::AgentNotFound(agent_id.to_string()))
    }

    /// Replaces the roster. Rejects rosters with repeated ids.
    pub fn set_agents(&mut self, agents: Vec<Agent>) -> Result<(), StateError> {
        for (i, agent) in agents.iter().enumerate() {
            if agents[..i].iter().any(|a| a.id == agent.id) {
                return Err(StateError::DuplicateAgent(agent.id.clone()));
            }
        }
        debug!(count = agents.len(), "Roster replaced");
        self.agents = agents;
        Ok(())
    }

    /// Appends one agent to the roster.
    pub fn add_agent(&mut self, agent: Agent) -> Result<(), StateError> {
        if self.agent(&agent.id).is_some() {
            return Err(StateError::DuplicateAgent(agent.id));
        }
        self.agents.push(agent);
        Ok(())
    }

    /// Sets the run's policy. A policy can only be set once per run.
    pub fn set_policy(&mut self, policy: Policy) -> Result<(), StateError> {
        if self.policy.is_some() {
            return Err(StateError::PolicyAlreadySet);
        }
        info!(policy = %policy.text, "Policy set");
        self.policy = Some(policy);
        Ok(())
    }

    /// Appends `memory` to every agent, in roster order.
    pub fn broadcast_memory(&mut self, memory: &str) {
        for agent in self.agents.iter_mut() {
            agent.remember(memory);
        }
        debug!(recipients = self.agents.len(), "Memory broadcast");
    }

    /// Appends `memory` to one agent.
    pub fn add_memory_to_agent(&mut self, agent_id: &str, memory: &str) -> Result<(), StateError> {
        match self.agent_mut(agent_id) {
            Ok(agent) => {
                agent.remember(memory);
                Ok(())
            }
            Err(e) => {
                warn!(agent_id, "Memory dropped: unknown agent");
                Err(e)
            }
        }
    }

    pub fn add_conversation_pair(&mut self, pair: ConversationPair) {
        self.pairs.push(pair);
    }

    pub fn clear_pairs(&mut self) {
        self.pairs.clear();
    }

    /// Stores a conversation under its pair id, returning any previous record.
    pub fn record_conversation(&mut self, result: ConversationResult) -> Option<ConversationResult> {
        let pair_id = result.pair_id();
        let previous = self.conversations.insert(pair_id.clone(), result);
        if previous.is_some() {
            debug!(pair_id = %pair_id, "Conversation overwritten");
        }
        previous
    }

    /// Records a vote. A second vote for the same agent overwrites the first.
    pub fn set_vote(
        &mut self,
        agent_id: &str,
        vote: bool,
        reason: impl Into<String>,
    ) -> Result<(), StateError> {
        let agent = match self.agent_mut(agent_id) {
            Ok(agent) => agent,
            Err(e) => {
                warn!(agent_id, "Vote dropped: unknown agent");
                return Err(e);
            }
        };
        agent.vote = Some(vote);
        agent.vote_reason = Some(reason.into());
        Ok(())
    }

    /// Tally over the current roster.
    pub fn vote_results(&self) -> VoteResult {
        votes::tally(&self.agents)
    }

    /// Moves to `target`.
    ///
    /// Under [`TransitionPolicy::Strict`] only the immediate successor is
    /// accepted; under `Permissive` any stage is.
    pub fn advance_stage(&mut self, target: SimulationStage) -> Result<(), StateError> {
        let allowed = match self.transition_policy {
            TransitionPolicy::Strict => self.stage.next() == Some(target),
            TransitionPolicy::Permissive => true,
        };
        if !allowed {
            return Err(StateError::InvalidTransition {
                from: self.stage,
                to: target,
            });
        }
        info!(from = %self.stage, to = %target, "Stage advanced");
        self.stage = target;
        Ok(())
    }

    /// Fails unless the run is currently in `expected`.
    pub fn require_stage(&self, expected: SimulationStage) -> Result<(), StateError> {
        if self.stage != expected {
            return Err(StateError::WrongStage {
                expected,
                actual: self.stage,
            });
        }
        Ok(())
    }

    /// Clears everything and starts a new run in `Config`.
    pub fn reset(&mut self) {
        let transition_policy = self.transition_policy;
        *self = Self::with_transition_policy(transition_policy);
        info!(run_id = %self.run_id, "Simulation reset");
    }

    /// Serializable copy of the whole state.
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            run_id: self.run_id,
            stage: self.stage,
            policy: self.policy.clone(),
            agents: self.agents.clone(),
            conversation_pairs: self.pairs.clone(),
            conversation_results: self.conversations.clone(),
            votes: self.vote_results(),
        }
    }
}
