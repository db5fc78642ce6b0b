//! Simulation Runner
//!
//! Drives one run through its stages against a [`GenerationService`]:
//! sample traits and create agents, announce the policy, pair agents and
//! fold their conversations into memory, then collect votes.
//!
//! Service calls within a stage are independent and issued concurrently.
//! Only the runner mutates [`SimulationState`], and only after the calls it
//! depends on have completed, so no two stages ever overlap.

use futures::future::{join_all, try_join_all};
use opinion_model::protocol::{EXPECTED_MEMORIES, EXPECTED_MESSAGES};
use opinion_model::{
    generate_agent_id, generate_pair_id, Agent, CalculateVoteRequest, ConversationPair,
    CreateAgentRequest, GenerateConversationRequest, Policy, RawConversation, SimulationStage,
    VoteResult,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{DistributionConfig, SimConfig, SimulationConfig};
use crate::error::{SimError, StageFailure};
use crate::generation::GenerationService;
use crate::ingest::normalize_conversation;
use crate::pairing::pair_agents;
use crate::sampling::TraitSampler;
use crate::state::{SimulationState, StateError, TransitionPolicy};
use crate::transcript::Transcript;

/// Smallest population worth simulating
pub const DEFAULT_MIN_AGENTS: usize = 4;

/// What a stage does when one of its service calls fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort on the first failure and discard every result of the stage
    #[default]
    FailFast,
    /// Apply the successes and report the failures
    CollectPartial,
}

/// How conversations within one round are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationOrder {
    /// All pairs at once; every conversation sees pre-round memories
    #[default]
    Parallel,
    /// One pair at a time, in pairing order
    Sequential,
}

/// Who remembers a conversation line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryScope {
    #[default]
    Participants,
    Everyone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub min_agents: usize,
    pub failure_policy: FailurePolicy,
    pub conversation_order: ConversationOrder,
    pub memory_scope: MemoryScope,
    pub transition_policy: TransitionPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            min_agents: DEFAULT_MIN_AGENTS,
            failure_policy: FailurePolicy::default(),
            conversation_order: ConversationOrder::default(),
            memory_scope: MemoryScope::default(),
            transition_policy: TransitionPolicy::default(),
        }
    }
}

impl RunOptions {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            min_agents: config.min_agents,
            failure_policy: config.failure_policy,
            conversation_order: config.conversation_order,
            memory_scope: config.memory_scope,
            transition_policy: config.transition_policy,
        }
    }
}

/// Outcome of one completed stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub stage: SimulationStage,
    pub succeeded: usize,
    /// Only populated under [`FailurePolicy::CollectPartial`]
    pub failures: Vec<StageFailure>,
}

impl StageReport {
    pub fn new(stage: SimulationStage) -> Self {
        Self {
            stage,
            succeeded: 0,
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record_failure(&mut self, failure: StageFailure) {
        warn!(
            stage = %self.stage,
            subject = %failure.subject,
            error = %failure.error,
            "Service call failed; continuing"
        );
        self.failures.push(failure);
    }
}

/// Reports of every stage of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub agents: StageReport,
    pub conversations: StageReport,
    pub votes: StageReport,
    pub results: VoteResult,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.agents.is_clean() && self.conversations.is_clean() && self.votes.is_clean()
    }
}

/// Awaits a batch of calls according to `policy`, preserving input order.
async fn gather<T, I, F>(
    policy: FailurePolicy,
    stage: SimulationStage,
    calls: I,
) -> Result<Vec<Result<T, StageFailure>>, SimError>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, StageFailure>>,
{
    match policy {
        FailurePolicy::FailFast => {
            let values = try_join_all(calls).await.map_err(|failure| {
                warn!(
                    stage = %stage,
                    subject = %failure.subject,
                    error = %failure.error,
                    "Service call failed; discarding stage results"
                );
                SimError::Upstream { stage, failure }
            })?;
            Ok(values.into_iter().map(Ok).collect())
        }
        FailurePolicy::CollectPartial => Ok(join_all(calls).await),
    }
}

pub struct SimulationRunner<S> {
    service: S,
    distribution: DistributionConfig,
    options: RunOptions,
    sampler: TraitSampler,
    state: SimulationState,
    transcript: Transcript,
}

impl<S: GenerationService> SimulationRunner<S> {
    pub fn new(
        service: S,
        distribution: DistributionConfig,
        sampler: TraitSampler,
        options: RunOptions,
    ) -> Self {
        Self {
            service,
            distribution,
            state: SimulationState::with_transition_policy(options.transition_policy),
            options,
            sampler,
            transcript: Transcript::new(),
        }
    }

    /// Builds a runner from a loaded configuration, seeding the sampler.
    pub fn from_config(service: S, config: &SimConfig) -> Self {
        Self::new(
            service,
            config.distribution.clone(),
            TraitSampler::seeded(config.simulation.seed),
            RunOptions::from_config(&config.simulation),
        )
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn distribution(&self) -> &DistributionConfig {
        &self.distribution
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Current tally. Provisional until the run reaches `Results`.
    pub fn results(&self) -> VoteResult {
        self.state.vote_results()
    }

    /// Clears the run and its transcript. The sampler keeps its position, so
    /// the next run draws a fresh population.
    pub fn reset(&mut self) {
        self.state.reset();
        self.transcript.clear();
    }

    /// Samples traits for `count` agents and asks the service to flesh them out.
    ///
    /// Valid from `Config`, or again from `AgentGeneration` after a failure.
    pub async fn generate_agents(&mut self, count: usize) -> Result<StageReport, SimError> {
        if count < self.options.min_agents {
            return Err(SimError::InsufficientPopulation {
                required: self.options.min_agents,
                actual: count,
            });
        }
        if self.state.stage() == SimulationStage::Config {
            self.state.advance_stage(SimulationStage::AgentGeneration)?;
        }
        self.state.require_stage(SimulationStage::AgentGeneration)?;

        self.distribution.log_warnings();
        let traits = self.sampler.sample_many(&self.distribution, count);
        info!(count, "Generating agents");

        let service = &self.service;
        let calls = traits.iter().enumerate().map(|(index, sampled)| {
            let request = CreateAgentRequest {
                traits: sampled.clone(),
            };
            async move {
                service
                    .create_agent(request)
                    .await
                    .map(|response| response.agent)
                    .map_err(|e| StageFailure::new(generate_agent_id(index), e))
            }
        });
        let outcomes = gather(
            self.options.failure_policy,
            SimulationStage::AgentGeneration,
            calls,
        )
        .await?;

        let mut report = StageReport::new(SimulationStage::AgentGeneration);
        let mut agents = Vec::with_capacity(count);
        for ((index, sampled), outcome) in traits.into_iter().enumerate().zip(outcomes) {
            let generated = match outcome {
                Ok(generated) => generated,
                Err(failure) => {
                    report.record_failure(failure);
                    continue;
                }
            };
            let id = generate_agent_id(index);
            if generated.traits.as_ref().is_some_and(|echoed| *echoed != sampled) {
                debug!(agent_id = %id, "Echoed traits differ from sampled traits; keeping sampled");
            }
            if generated.memories.len() != EXPECTED_MEMORIES {
                debug!(agent_id = %id, memories = generated.memories.len(), "Unexpected memory count");
            }
            agents.push(Agent::new(
                id,
                generated.name,
                generated.background,
                sampled,
                generated.memories,
            ));
            report.succeeded += 1;
        }

        if agents.len() < self.options.min_agents {
            return Err(SimError::InsufficientPopulation {
                required: self.options.min_agents,
                actual: agents.len(),
            });
        }

        self.state.set_agents(agents)?;
        self.state.advance_stage(SimulationStage::PolicyInput)?;
        info!(
            agents = report.succeeded,
            failed = report.failures.len(),
            "Agent generation complete"
        );
        Ok(report)
    }

    /// Stores the policy and announces it to every agent.
    pub fn introduce_policy(&mut self, text: &str) -> Result<(), SimError> {
        self.state.require_stage(SimulationStage::PolicyInput)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(SimError::EmptyPolicy);
        }

        let policy = Policy::new(text);
        let announcement = policy.announcement();
        self.state.set_policy(policy)?;
        self.state.broadcast_memory(&announcement);
        self.state.advance_stage(SimulationStage::Conversation)?;
        Ok(())
    }

    /// Pairs the roster and runs one conversation per pair.
    pub async fn run_conversations(&mut self) -> Result<StageReport, SimError> {
        self.state.require_stage(SimulationStage::Conversation)?;
        let policy = self
            .state
            .policy()
            .map(|p| p.text.clone())
            .ok_or(SimError::MissingPolicy)?;
        let pairs = pair_agents(&self.state.agent_ids())?;

        self.state.clear_pairs();
        for pair in &pairs {
            self.state.add_conversation_pair(pair.clone());
        }
        info!(
            pairs = pairs.len(),
            order = ?self.options.conversation_order,
            "Starting conversations"
        );

        let report = match self.options.conversation_order {
            ConversationOrder::Parallel => self.converse_parallel(&pairs, &policy).await?,
            ConversationOrder::Sequential => self.converse_sequential(&pairs, &policy).await?,
        };

        self.state.advance_stage(SimulationStage::Voting)?;
        info!(
            conversations = report.succeeded,
            failed = report.failures.len(),
            "Conversations complete"
        );
        Ok(report)
    }

    fn participants(&self, pair: &ConversationPair) -> Result<(Agent, Agent), StateError> {
        let lookup = |id: &str| {
            self.state
                .agent(id)
                .cloned()
                .ok_or_else(|| StateError::AgentNotFound(id.to_string()))
        };
        Ok((lookup(&pair.first)?, lookup(&pair.second)?))
    }

    async fn converse_parallel(
        &mut self,
        pairs: &[ConversationPair],
        policy: &str,
    ) -> Result<StageReport, SimError> {
        let participants = pairs
            .iter()
            .map(|pair| self.participants(pair))
            .collect::<Result<Vec<_>, _>>()?;

        let service = &self.service;
        let calls = participants.iter().map(|(agent1, agent2)| {
            let subject = generate_pair_id(&agent1.id, &agent2.id);
            let request = GenerateConversationRequest {
                agent1: agent1.clone(),
                agent2: agent2.clone(),
                policy: policy.to_string(),
            };
            async move {
                service
                    .generate_conversation(request)
                    .await
                    .map(|response| response.conversation)
                    .map_err(|e| StageFailure::new(subject, e))
            }
        });
        let outcomes = gather(
            self.options.failure_policy,
            SimulationStage::Conversation,
            calls,
        )
        .await?;

        let mut report = StageReport::new(SimulationStage::Conversation);
        for ((agent1, agent2), outcome) in participants.iter().zip(outcomes) {
            match outcome {
                Ok(raw) => {
                    self.fold_conversation(raw, agent1, agent2)?;
                    report.succeeded += 1;
                }
                Err(failure) => report.record_failure(failure),
            }
        }
        Ok(report)
    }

    /// Later pairs see the memories left by earlier ones. Under fail-fast a
    /// failure restores the state and transcript as they were before the round.
    async fn converse_sequential(
        &mut self,
        pairs: &[ConversationPair],
        policy: &str,
    ) -> Result<StageReport, SimError> {
        let mut checkpoint = match self.options.failure_policy {
            FailurePolicy::FailFast => Some((self.state.clone(), self.transcript.clone())),
            FailurePolicy::CollectPartial => None,
        };

        let mut report = StageReport::new(SimulationStage::Conversation);
        for pair in pairs {
            let (agent1, agent2) = self.participants(pair)?;
            let request = GenerateConversationRequest {
                agent1: agent1.clone(),
                agent2: agent2.clone(),
                policy: policy.to_string(),
            };

            let outcome = self.service.generate_conversation(request).await;
            match outcome {
                Ok(response) => {
                    self.fold_conversation(response.conversation, &agent1, &agent2)?;
                    report.succeeded += 1;
                }
                Err(error) => {
                    let failure = StageFailure::new(pair.pair_id(), error);
                    if let Some((state, transcript)) = checkpoint.take() {
                        warn!(
                            subject = %failure.subject,
                            error = %failure.error,
                            "Conversation failed; rolling back round"
                        );
                        self.state = state;
                        self.transcript = transcript;
                        return Err(SimError::Upstream {
                            stage: SimulationStage::Conversation,
                            failure,
                        });
                    }
                    report.record_failure(failure);
                }
            }
        }
        Ok(report)
    }

    /// Records one conversation and turns each line into memories, in order.
    fn fold_conversation(
        &mut self,
        raw: RawConversation,
        agent1: &Agent,
        agent2: &Agent,
    ) -> Result<(), SimError> {
        let result = normalize_conversation(raw, agent1, agent2);
        let pair_id = result.pair_id();
        if result.messages.len() != EXPECTED_MESSAGES {
            debug!(pair_id = %pair_id, messages = result.messages.len(), "Unexpected message count");
        }

        for message in &result.messages {
            let speaker = if message.agent_id == agent1.id {
                agent1
            } else if message.agent_id == agent2.id {
                agent2
            } else {
                warn!(
                    pair_id = %pair_id,
                    agent_id = %message.agent_id,
                    "Line from a non-participant skipped"
                );
                continue;
            };

            let memory = self
                .transcript
                .push(pair_id.as_str(), speaker.id.as_str(), speaker.name.as_str(), message.text.as_str())
                .as_memory();
            match self.options.memory_scope {
                MemoryScope::Participants => {
                    self.state.add_memory_to_agent(&agent1.id, &memory)?;
                    self.state.add_memory_to_agent(&agent2.id, &memory)?;
                }
                MemoryScope::Everyone => self.state.broadcast_memory(&memory),
            }
        }

        self.state.record_conversation(result);
        Ok(())
    }

    /// Asks the service how each agent votes.
    pub async fn collect_votes(&mut self) -> Result<StageReport, SimError> {
        self.state.require_stage(SimulationStage::Voting)?;
        let policy = self
            .state
            .policy()
            .map(|p| p.text.clone())
            .ok_or(SimError::MissingPolicy)?;
        let voters = self.state.agents().to_vec();
        info!(voters = voters.len(), "Collecting votes");

        let service = &self.service;
        let calls = voters.iter().map(|agent| {
            let subject = agent.id.clone();
            let request = CalculateVoteRequest {
                agent: agent.clone(),
                policy: policy.clone(),
            };
            async move {
                service
                    .calculate_vote(request)
                    .await
                    .map_err(|e| StageFailure::new(subject, e))
            }
        });
        let outcomes = gather(self.options.failure_policy, SimulationStage::Voting, calls).await?;

        let mut report = StageReport::new(SimulationStage::Voting);
        for (agent, outcome) in voters.iter().zip(outcomes) {
            match outcome {
                Ok(response) => {
                    self.state.set_vote(&agent.id, response.vote, response.reasoning)?;
                    report.succeeded += 1;
                }
                Err(failure) => report.record_failure(failure),
            }
        }

        self.state.advance_stage(SimulationStage::Results)?;
        let results = self.state.vote_results();
        info!(
            yes = results.yes,
            no = results.no,
            total = results.total,
            "Voting complete"
        );
        Ok(report)
    }

    /// Runs every stage in order.
    pub async fn run(&mut self, count: usize, policy: &str) -> Result<RunReport, SimError> {
        if policy.trim().is_empty() {
            return Err(SimError::EmptyPolicy);
        }

        let agents = self.generate_agents(count).await?;
        self.introduce_policy(policy)?;
        let conversations = self.run_conversations().await?;
        let votes = self.collect_votes().await?;

        Ok(RunReport {
            run_id: self.state.run_id(),
            agents,
            conversations,
            votes,
            results: self.results(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::ScriptedGenerator;

    fn runner() -> SimulationRunner<ScriptedGenerator> {
        SimulationRunner::new(
            ScriptedGenerator::new(),
            DistributionConfig::default(),
            TraitSampler::seeded(7),
            RunOptions::default(),
        )
    }

    #[test]
    fn test_options_from_config() {
        let config: SimConfig = r#"
[simulation]
min_agents = 6
failure_policy = "collect_partial"
conversation_order = "sequential"
memory_scope = "everyone"
transition_policy = "permissive"
"#
        .parse()
        .unwrap();

        let options = RunOptions::from_config(&config.simulation);
        assert_eq!(options.min_agents, 6);
        assert_eq!(options.failure_policy, FailurePolicy::CollectPartial);
        assert_eq!(options.conversation_order, ConversationOrder::Sequential);
        assert_eq!(options.memory_scope, MemoryScope::Everyone);
        assert_eq!(options.transition_policy, TransitionPolicy::Permissive);
    }

    #[tokio::test]
    async fn test_generate_agents_assigns_ids_and_sampled_traits() {
        let mut runner = runner();
        let report = runner.generate_agents(6).await.unwrap();

        assert!(report.is_clean());
        assert_eq!(report.succeeded, 6);
        assert_eq!(runner.state().stage(), SimulationStage::PolicyInput);

        let expected = TraitSampler::seeded(7).sample_many(&DistributionConfig::default(), 6);
        for (i, agent) in runner.state().agents().iter().enumerate() {
            assert_eq!(agent.id, format!("agent-{}", i));
            assert_eq!(agent.traits, expected[i]);
            assert_eq!(agent.memories.len(), EXPECTED_MEMORIES);
        }
    }

    #[tokio::test]
    async fn test_below_minimum_rejected_before_any_call() {
        let mut runner = runner();
        let err = runner.generate_agents(3).await.unwrap_err();
        assert!(matches!(
            err,
            SimError::InsufficientPopulation { required: 4, actual: 3 }
        ));
        assert_eq!(runner.state().stage(), SimulationStage::Config);
    }

    #[tokio::test]
    async fn test_introduce_policy_broadcasts() {
        let mut runner = runner();
        runner.generate_agents(4).await.unwrap();

        assert!(matches!(runner.introduce_policy("   "), Err(SimError::EmptyPolicy)));
        runner.introduce_policy("  Free bus passes ").unwrap();

        let announcement = "The government announced a new policy: \"Free bus passes\"";
        for agent in runner.state().agents() {
            assert_eq!(agent.memories.last().map(String::as_str), Some(announcement));
        }
        assert_eq!(runner.state().stage(), SimulationStage::Conversation);
    }

    #[tokio::test]
    async fn test_stage_order_enforced() {
        let mut runner = runner();
        assert!(matches!(
            runner.collect_votes().await,
            Err(SimError::State(StateError::WrongStage { .. }))
        ));
        assert!(matches!(
            runner.introduce_policy("p"),
            Err(SimError::State(StateError::WrongStage { .. }))
        ));
    }

    #[tokio::test]
    async fn test_reset_clears_transcript() {
        let mut runner = runner();
        runner.run(4, "Free bus passes").await.unwrap();
        assert!(!runner.transcript().is_empty());

        runner.reset();
        assert!(runner.transcript().is_empty());
        assert_eq!(runner.results(), VoteResult::default());
        assert_eq!(runner.state().stage(), SimulationStage::Config);
    }
}
