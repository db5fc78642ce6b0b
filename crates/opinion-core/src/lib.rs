//! Opinion simulation engine.
//!
//! Samples a population of synthetic persons from tunable trait
//! distributions, then drives them through a fixed lifecycle: agent
//! generation, policy announcement, pairwise conversation, voting and
//! tallying. Text generation is delegated to a [`GenerationService`].
//!
//! # Modules
//!
//! - [`config`]: Distribution parameters and run configuration (TOML)
//! - [`sampling`]: Seeded trait sampler
//! - [`pairing`]: Deterministic conversation pairing
//! - [`state`]: The run's state machine
//! - [`votes`]: Vote tallies
//! - [`generation`]: Service trait, HTTP client, offline generator
//! - [`ingest`]: Conversation message normalization
//! - [`transcript`]: Ordered log of conversation lines
//! - [`runner`]: Stage orchestration and fan-out policies

pub mod config;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod pairing;
pub mod runner;
pub mod sampling;
pub mod state;
pub mod transcript;
pub mod votes;

pub use config::{
    ConfigError, ConfigParam, ConfigWarning, DistributionConfig, ServiceConfig, SimConfig,
    SimulationConfig, DEFAULT_CONFIG_PATH,
};
pub use error::{SimError, StageFailure};
pub use generation::{GenerationError, GenerationService, HttpGenerationService, ScriptedGenerator};
pub use ingest::normalize_conversation;
pub use pairing::{pair_agents, PairingError, MIN_PAIRING_POPULATION};
pub use runner::{
    ConversationOrder, FailurePolicy, MemoryScope, RunOptions, RunReport, SimulationRunner,
    StageReport,
};
pub use sampling::{sample_traits, TraitSampler};
pub use state::{SimulationState, StateError, TransitionPolicy};
pub use transcript::{Transcript, TranscriptEntry};
pub use votes::{tally, tally_by_religion};
