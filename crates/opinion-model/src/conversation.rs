//! Conversation Types
//!
//! Pairings, messages as received from the generation service, and the
//! canonical conversation record kept in simulation state.

use serde::{Deserialize, Serialize};

/// Generates the key a conversation between `agent1_id` and `agent2_id` is stored under.
pub fn generate_pair_id(agent1_id: &str, agent2_id: &str) -> String {
    format!("{}-{}", agent1_id, agent2_id)
}

/// Two agents assigned to talk to each other. The first id speaks first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct ConversationPair {
    pub first: String,
    pub second: String,
}

impl ConversationPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    /// Key under which this pair's conversation is recorded.
    pub fn pair_id(&self) -> String {
        generate_pair_id(&self.first, &self.second)
    }

    pub fn involves(&self, agent_id: &str) -> bool {
        self.first == agent_id || self.second == agent_id
    }

    /// Unordered comparison: `(a, b)` matches `(b, a)`.
    pub fn same_members(&self, other: &ConversationPair) -> bool {
        (self.first == other.first && self.second == other.second)
            || (self.first == other.second && self.second == other.first)
    }
}

impl From<(String, String)> for ConversationPair {
    fn from((first, second): (String, String)) -> Self {
        Self { first, second }
    }
}

impl From<ConversationPair> for (String, String) {
    fn from(pair: ConversationPair) -> Self {
        (pair.first, pair.second)
    }
}

/// One line of a conversation, attributed to a speaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub agent_id: String,
    pub text: String,
}

impl ConversationMessage {
    pub fn new(agent_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            text: text.into(),
        }
    }
}

/// A message as it arrives from the generation service.
///
/// Integrations return either structured `{agentId, text}` objects or
/// pre-formatted lines such as `"Asha: I support this"`. Both are accepted
/// and normalized into [`ConversationMessage`] before entering state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawMessage {
    Structured(ConversationMessage),
    Formatted(String),
}

/// Conversation payload before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConversation {
    pub agent1_id: String,
    pub agent2_id: String,
    pub messages: Vec<RawMessage>,
}

/// A normalized conversation between two agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResult {
    pub agent1_id: String,
    pub agent2_id: String,
    pub messages: Vec<ConversationMessage>,
}

impl ConversationResult {
    pub fn pair_id(&self) -> String {
        generate_pair_id(&self.agent1_id, &self.agent2_id)
    }

    /// Number of lines spoken by `agent_id`.
    pub fn turns_by(&self, agent_id: &str) -> usize {
        self.messages
            .iter()
            .filter(|m| m.agent_id == agent_id)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_id() {
        let pair = ConversationPair::new("agent-0", "agent-4");
        assert_eq!(pair.pair_id(), "agent-0-agent-4");
    }

    #[test]
    fn test_pair_serializes_as_tuple() {
        let pair = ConversationPair::new("agent-0", "agent-1");
        let json = serde_json::to_string(&pair).unwrap();
        assert_eq!(json, r#"["agent-0","agent-1"]"#);
    }

    #[test]
    fn test_same_members_is_unordered() {
        let a = ConversationPair::new("x", "y");
        let b = ConversationPair::new("y", "x");
        assert!(a.same_members(&b));
        assert_ne!(a, b);
        assert!(!a.same_members(&ConversationPair::new("x", "z")));
    }

    #[test]
    fn test_raw_messages_accept_both_shapes() {
        let json = r#"{
            "agent1Id": "agent-0",
            "agent2Id": "agent-1",
            "messages": [
                {"agentId": "agent-0", "text": "Have you heard?"},
                "agent-1: I have."
            ]
        }"#;
        let conversation: RawConversation = serde_json::from_str(json).unwrap();

        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(
            conversation.messages[0],
            RawMessage::Structured(ConversationMessage::new("agent-0", "Have you heard?"))
        );
        assert_eq!(
            conversation.messages[1],
            RawMessage::Formatted("agent-1: I have.".to_string())
        );
    }

    #[test]
    fn test_turns_by() {
        let result = ConversationResult {
            agent1_id: "a".to_string(),
            agent2_id: "b".to_string(),
            messages: vec![
                ConversationMessage::new("a", "1"),
                ConversationMessage::new("b", "2"),
                ConversationMessage::new("a", "3"),
            ],
        };
        assert_eq!(result.turns_by("a"), 2);
        assert_eq!(result.turns_by("b"), 1);
        assert_eq!(result.pair_id(), "a-b");
    }
}
