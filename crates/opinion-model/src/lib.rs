//! Opinion Model
//!
//! Agents, conversations, votes and run stages, plus the JSON bodies
//! exchanged with the generation service. Sampling, pairing and the
//! stage machine live in `opinion-core`.

pub mod agent;
pub mod conversation;
pub mod protocol;
pub mod snapshot;
pub mod stage;
pub mod vote;

#[cfg(feature = "test-fixtures")]
pub mod fixtures;

// Re-export agent types
pub use agent::{generate_agent_id, Agent, AgentTraits, Policy, TRAIT_NAMES};

// Re-export conversation types
pub use conversation::{
    generate_pair_id, ConversationMessage, ConversationPair, ConversationResult, RawConversation,
    RawMessage,
};

// Re-export service contracts
pub use protocol::{
    CalculateVoteRequest, CalculateVoteResponse, CreateAgentRequest, CreateAgentResponse,
    GenerateConversationRequest, GenerateConversationResponse, GeneratedAgent,
};

pub use snapshot::SimulationSnapshot;
pub use stage::{ParseStageError, SimulationStage};
pub use vote::VoteResult;
