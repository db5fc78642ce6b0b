//! Generation Service
//!
//! The external collaborator that invents agent biographies, writes
//! conversations and decides votes. The simulation only depends on the
//! [`GenerationService`] trait; an HTTP client and an offline, deterministic
//! generator are provided.

pub mod http;
pub mod scripted;

use async_trait::async_trait;
use opinion_model::{
    CalculateVoteRequest, CalculateVoteResponse, CreateAgentRequest, CreateAgentResponse,
    GenerateConversationRequest, GenerateConversationResponse,
};
use thiserror::Error;

pub use http::HttpGenerationService;
pub use scripted::ScriptedGenerator;

pub const CREATE_AGENT_ENDPOINT: &str = "/api/create-agent";
pub const GENERATE_CONVERSATION_ENDPOINT: &str = "/api/generate-conversation";
pub const CALCULATE_VOTE_ENDPOINT: &str = "/api/calculate-vote";

/// A failed call to the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("{endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("{endpoint} request failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{endpoint} returned a malformed body: {message}")]
    Malformed { endpoint: String, message: String },
}

impl GenerationError {
    pub fn endpoint(&self) -> &str {
        match self {
            GenerationError::Status { endpoint, .. }
            | GenerationError::Transport { endpoint, .. }
            | GenerationError::Malformed { endpoint, .. } => endpoint,
        }
    }
}

/// The three calls a run makes. Calls are independent, so implementations
/// must tolerate being invoked concurrently.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn create_agent(
        &self,
        request: CreateAgentRequest,
    ) -> Result<CreateAgentResponse, GenerationError>;

    async fn generate_conversation(
        &self,
        request: GenerateConversationRequest,
    ) -> Result<GenerateConversationResponse, GenerationError>;

    async fn calculate_vote(
        &self,
        request: CalculateVoteRequest,
    ) -> Result<CalculateVoteResponse, GenerationError>;
}

#[async_trait]
impl<T: GenerationService + ?Sized> GenerationService for Box<T> {
    async fn create_agent(
        &self,
        request: CreateAgentRequest,
    ) -> Result<CreateAgentResponse, GenerationError> {
        (**self).create_agent(request).await
    }

    async fn generate_conversation(
        &self,
        request: GenerateConversationRequest,
    ) -> Result<GenerateConversationResponse, GenerationError> {
        (**self).generate_conversation(request).await
    }

    async fn calculate_vote(
        &self,
        request: CalculateVoteRequest,
    ) -> Result<CalculateVoteResponse, GenerationError> {
        (**self).calculate_vote(request).await
    }
}
