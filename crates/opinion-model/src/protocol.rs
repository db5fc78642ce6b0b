//! Generation Service Contracts
//!
//! Request and response bodies for the three calls the simulation makes to
//! the text-generation service. Field names follow the service's camelCase
//! JSON.

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentTraits};
use crate::conversation::RawConversation;

/// Number of core memories a generated agent is expected to carry.
pub const EXPECTED_MEMORIES: usize = 3;

/// Number of messages a generated conversation is expected to contain.
pub const EXPECTED_MESSAGES: usize = 6;

/// Asks the service to invent a person with the given traits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAgentRequest {
    pub traits: AgentTraits,
}

/// Biography produced for a [`CreateAgentRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAgent {
    pub name: String,
    pub background: String,
    #[serde(default)]
    pub memories: Vec<String>,
    /// Echo of the requested traits; the sampled traits remain authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traits: Option<AgentTraits>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAgentResponse {
    pub agent: GeneratedAgent,
}

/// Asks for a six-message exchange about `policy`; `agent1` speaks first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateConversationRequest {
    pub agent1: Agent,
    pub agent2: Agent,
    pub policy: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateConversationResponse {
    pub conversation: RawConversation,
}

/// Asks how `agent` votes on `policy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculateVoteRequest {
    pub agent: Agent,
    pub policy: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculateVoteResponse {
    pub vote: bool,
    pub reasoning: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::RawMessage;

    #[test]
    fn test_create_agent_response_without_traits() {
        let json = r#"{"agent": {"name": "Ravi Kumar", "background": "A farmer", "memories": ["a", "b", "c"]}}"#;
        let response: CreateAgentResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.agent.name, "Ravi Kumar");
        assert_eq!(response.agent.memories.len(), EXPECTED_MEMORIES);
        assert!(response.agent.traits.is_none());
    }

    #[test]
    fn test_conversation_response_parses() {
        let json = r#"{"conversation": {
            "agent1Id": "agent-0",
            "agent2Id": "agent-1",
            "messages": [{"agentId": "agent-0", "text": "Hello"}]
        }}"#;
        let response: GenerateConversationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.conversation.agent2_id, "agent-1");
        assert!(matches!(
            response.conversation.messages[0],
            RawMessage::Structured(_)
        ));
    }

    #[test]
    fn test_vote_response_rejects_missing_vote() {
        let json = r#"{"reasoning": "unsure"}"#;
        assert!(serde_json::from_str::<CalculateVoteResponse>(json).is_err());
    }
}
