//! HTTP client for the generation service.

use async_trait::async_trait;
use opinion_model::{
    CalculateVoteRequest, CalculateVoteResponse, CreateAgentRequest, CreateAgentResponse,
    GenerateConversationRequest, GenerateConversationResponse,
};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{
    GenerationError, GenerationService, CALCULATE_VOTE_ENDPOINT, CREATE_AGENT_ENDPOINT,
    GENERATE_CONVERSATION_ENDPOINT,
};

/// Posts JSON to `{base_url}/api/...` and decodes the JSON reply.
#[derive(Debug, Clone)]
pub struct HttpGenerationService {
    client: Client,
    base_url: String,
}

impl HttpGenerationService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Transport {
                endpoint: base_url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, GenerationError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(url = %url, "POST");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| GenerationError::Transport {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;

        serde_json::from_slice(&bytes).map_err(|e| GenerationError::Malformed {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl GenerationService for HttpGenerationService {
    async fn create_agent(
        &self,
        request: CreateAgentRequest,
    ) -> Result<CreateAgentResponse, GenerationError> {
        self.post(CREATE_AGENT_ENDPOINT, &request).await
    }

    async fn generate_conversation(
        &self,
        request: GenerateConversationRequest,
    ) -> Result<GenerateConversationResponse, GenerationError> {
        self.post(GENERATE_CONVERSATION_ENDPOINT, &request).await
    }

    async fn calculate_vote(
        &self,
        request: CalculateVoteRequest,
    ) -> Result<CalculateVoteResponse, GenerationError> {
        self.post(CALCULATE_VOTE_ENDPOINT, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let service = HttpGenerationService::new("http://localhost:3000/", Duration::from_secs(1)).unwrap();
        assert_eq!(service.base_url(), "http://localhost:3000");
    }
}
