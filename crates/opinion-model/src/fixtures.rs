//! Test Roster
//!
//! Five hand-written agents, one per major religion, with traits spread
//! across the unit interval and three background memories each. Gated
//! behind the `test-fixtures` feature.
//!
//! ```ignore
//! use opinion_model::fixtures;
//!
//! let roster = fixtures::sample_agents();
//! let traits = fixtures::sample_traits();
//! ```

use crate::{Agent, AgentTraits, ConversationMessage, ConversationResult};

/// Returns the sample roster from the fixtures file.
///
/// Contains 5 agents (`agent-0` .. `agent-4`), none of which has voted,
/// each with three core memories.
pub fn sample_agents() -> Vec<Agent> {
    let json = include_str!("../tests/fixtures/sample_agents.json");
    serde_json::from_str(json).expect("Failed to parse sample_agents.json")
}

/// Returns the first `count` sample agents, cycling through the fixture
/// file with fresh ids when more are requested than it holds.
pub fn sample_roster(count: usize) -> Vec<Agent> {
    let base = sample_agents();
    (0..count)
        .map(|i| {
            let mut agent = base[i % base.len()].clone();
            agent.id = crate::generate_agent_id(i);
            agent
        })
        .collect()
}

/// Returns a mid-range trait vector.
pub fn sample_traits() -> AgentTraits {
    AgentTraits {
        religion: "Hindu".to_string(),
        anger: 0.5,
        persuasiveness: 0.1,
        gullibility: 0.8,
        income: 0.1,
    }
}

/// Returns a six-message conversation between `agent1_id` and `agent2_id`.
pub fn sample_conversation(agent1_id: &str, agent2_id: &str) -> ConversationResult {
    let messages = (0..6)
        .map(|i| {
            let speaker = if i % 2 == 0 { agent1_id } else { agent2_id };
            ConversationMessage::new(speaker, format!("line {}", i + 1))
        })
        .collect();

    ConversationResult {
        agent1_id: agent1_id.to_string(),
        agent2_id: agent2_id.to_string(),
        messages,
    }
}

/// Looks up a sample agent by id.
pub fn get_agent(agent_id: &str) -> Option<Agent> {
    sample_agents().into_iter().find(|a| a.id == agent_id)
}
