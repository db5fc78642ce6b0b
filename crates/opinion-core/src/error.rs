//! Orchestration Errors
//!
//! Everything a stage of a run can fail with. All variants are recoverable:
//! the stage that failed can be retried or the run reset.

use opinion_model::SimulationStage;
use thiserror::Error;

use crate::config::ConfigError;
use crate::generation::GenerationError;
use crate::pairing::PairingError;
use crate::state::StateError;

/// One failed service call within a stage's fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{subject}: {error}")]
pub struct StageFailure {
    /// Agent id or pair id the call was made for
    pub subject: String,
    #[source]
    pub error: GenerationError,
}

impl StageFailure {
    pub fn new(subject: impl Into<String>, error: GenerationError) -> Self {
        Self {
            subject: subject.into(),
            error,
        }
    }
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("insufficient population: need at least {required} agents, got {actual}")]
    InsufficientPopulation { required: usize, actual: usize },

    #[error(transparent)]
    Pairing(#[from] PairingError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("generation failed during {stage}: {failure}")]
    Upstream {
        stage: SimulationStage,
        #[source]
        failure: StageFailure,
    },

    #[error("policy text is empty")]
    EmptyPolicy,

    #[error("no policy has been introduced")]
    MissingPolicy,

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("generation service error: {0}")]
    Service(#[from] GenerationError),

    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

impl SimError {
    /// True for failures caused by the generation service.
    pub fn is_upstream(&self) -> bool {
        matches!(self, SimError::Upstream { .. } | SimError::Service(_))
    }
}
