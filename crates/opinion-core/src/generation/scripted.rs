//! Offline generator.
//!
//! Produces biographies, conversations and votes from the agents' traits
//! alone. Output depends only on the request, so runs are reproducible and
//! need no network access.

use async_trait::async_trait;
use opinion_model::protocol::EXPECTED_MESSAGES;
use opinion_model::{
    Agent, AgentTraits, CalculateVoteRequest, CalculateVoteResponse, ConversationMessage,
    CreateAgentRequest, CreateAgentResponse, GenerateConversationRequest,
    GenerateConversationResponse, GeneratedAgent, RawConversation, RawMessage,
};

use super::{GenerationError, GenerationService};

const FIRST_NAMES: [&str; 12] = [
    "Aarav", "Priya", "Farhan", "Lakshmi", "Harpreet", "Joseph", "Kavya", "Zubin", "Nandini",
    "Vikram", "Sana", "Tenzin",
];

const SURNAMES: [&str; 10] = [
    "Sharma", "Khan", "Fernandes", "Reddy", "Gill", "Shah", "Nair", "Irani", "Das", "Bhutia",
];

const SUPPORT_LINES: [&str; 3] = [
    "I support this policy. It could help families like mine.",
    "I still support it. Change has to start somewhere.",
    "Give it a chance. I support it.",
];

const OPPOSE_LINES: [&str; 3] = [
    "I oppose this policy. It will hurt people like us.",
    "I oppose it. These promises are never kept.",
    "My answer stays the same. I oppose it.",
];

/// Score at or above which an agent votes yes.
const YES_THRESHOLD: f64 = 0.5;

/// Weight of conversation influence on the vote score
const INFLUENCE_WEIGHT: f64 = 0.3;

/// Deterministic [`GenerationService`] that never fails.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGenerator {
    formatted_messages: bool,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits conversation lines as `"Name: text"` strings instead of
    /// structured messages.
    pub fn with_formatted_messages(mut self) -> Self {
        self.formatted_messages = true;
        self
    }

    /// Trait-only lean toward the policy, in `[0, 1]`.
    pub fn baseline_score(traits: &AgentTraits) -> f64 {
        0.4 * (1.0 - traits.anger) + 0.3 * (1.0 - traits.income) + 0.3 * traits.gullibility
    }

    /// Net support heard in memories, in `[-1, 1]`.
    pub fn influence(memories: &[String]) -> f64 {
        let (support, oppose) = memories.iter().fold((0u32, 0u32), |(s, o), memory| {
            let lower = memory.to_lowercase();
            (
                s + u32::from(lower.contains("i support")),
                o + u32::from(lower.contains("i oppose")),
            )
        });
        if support + oppose == 0 {
            return 0.0;
        }
        (f64::from(support) - f64::from(oppose)) / f64::from(support + oppose)
    }

    /// Final score including what the agent heard.
    pub fn vote_score(agent: &Agent) -> f64 {
        let base = Self::baseline_score(&agent.traits);
        base + INFLUENCE_WEIGHT * agent.traits.gullibility * Self::influence(&agent.memories)
    }

    fn supports(agent: &Agent) -> bool {
        Self::baseline_score(&agent.traits) >= YES_THRESHOLD
    }
}

fn trait_index(traits: &AgentTraits, salt: usize, len: usize) -> usize {
    let mix = (traits.anger * 1000.0) as usize
        + (traits.persuasiveness * 7919.0) as usize
        + (traits.gullibility * 104_729.0) as usize
        + (traits.income * 1_299_709.0) as usize
        + traits.religion.len() * salt;
    (mix + salt) % len
}

fn occupation(income: f64) -> &'static str {
    match income {
        i if i < 0.1 => "daily wage labourer",
        i if i < 0.3 => "shopkeeper",
        i if i < 0.6 => "schoolteacher",
        _ => "business owner",
    }
}

fn temperament(anger: f64) -> &'static str {
    match anger {
        a if a > 0.6 => "quick to anger",
        a if a < 0.35 => "calm under pressure",
        _ => "even-tempered",
    }
}

fn biography(traits: &AgentTraits) -> GeneratedAgent {
    let name = format!(
        "{} {}",
        FIRST_NAMES[trait_index(traits, 3, FIRST_NAMES.len())],
        SURNAMES[trait_index(traits, 11, SURNAMES.len())]
    );
    let job = occupation(traits.income);
    let background = format!(
        "{} is a {} {} who is {}.",
        name,
        traits.religion,
        job,
        temperament(traits.anger)
    );
    let memories = vec![
        format!("Grew up in a {} household", traits.religion),
        format!("Has worked as a {} for most of their life", job),
        if traits.gullibility > 0.6 {
            "Once lost savings to a neighbour's promise".to_string()
        } else {
            "Learned early to check what officials say".to_string()
        },
    ];

    GeneratedAgent {
        name,
        background,
        memories,
        traits: Some(traits.clone()),
    }
}

#[async_trait]
impl GenerationService for ScriptedGenerator {
    async fn create_agent(
        &self,
        request: CreateAgentRequest,
    ) -> Result<CreateAgentResponse, GenerationError> {
        Ok(CreateAgentResponse {
            agent: biography(&request.traits),
        })
    }

    async fn generate_conversation(
        &self,
        request: GenerateConversationRequest,
    ) -> Result<GenerateConversationResponse, GenerationError> {
        let messages = (0..EXPECTED_MESSAGES)
            .map(|turn| {
                let speaker = if turn % 2 == 0 { &request.agent1 } else { &request.agent2 };
                let lines = if Self::supports(speaker) { &SUPPORT_LINES } else { &OPPOSE_LINES };
                let text = lines[(turn / 2) % lines.len()];
                if self.formatted_messages {
                    RawMessage::Formatted(format!("{}: {}", speaker.name, text))
                } else {
                    RawMessage::Structured(ConversationMessage::new(speaker.id.clone(), text))
                }
            })
            .collect();

        Ok(GenerateConversationResponse {
            conversation: RawConversation {
                agent1_id: request.agent1.id,
                agent2_id: request.agent2.id,
                messages,
            },
        })
    }

    async fn calculate_vote(
        &self,
        request: CalculateVoteRequest,
    ) -> Result<CalculateVoteResponse, GenerationError> {
        let agent = &request.agent;
        let score = Self::vote_score(agent);
        let vote = score >= YES_THRESHOLD;
        let heard = match Self::influence(&agent.memories) {
            i if i > 0.0 => "the people they spoke with mostly backed it",
            i if i < 0.0 => "the people they spoke with mostly spoke against it",
            _ => "their conversations did not settle anything",
        };
        let reasoning = format!(
            "As a {} {}, {} {} the policy; {}.",
            agent.traits.religion,
            occupation(agent.traits.income),
            agent.name,
            if vote { "supports" } else { "rejects" },
            heard
        );

        Ok(CalculateVoteResponse { vote, reasoning })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opinion_model::fixtures;

    #[tokio::test]
    async fn test_create_agent_is_deterministic() {
        let generator = ScriptedGenerator::new();
        let request = CreateAgentRequest {
            traits: fixtures::sample_traits(),
        };

        let a = generator.create_agent(request.clone()).await.unwrap();
        let b = generator.create_agent(request).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.agent.memories.len(), 3);
        assert_eq!(a.agent.traits, Some(fixtures::sample_traits()));
        assert!(a.agent.background.starts_with(&a.agent.name));
    }

    #[tokio::test]
    async fn test_conversation_alternates_speakers() {
        let generator = ScriptedGenerator::new();
        let response = generator
            .generate_conversation(GenerateConversationRequest {
                agent1: fixtures::get_agent("agent-0").unwrap(),
                agent2: fixtures::get_agent("agent-1").unwrap(),
                policy: "Free bus passes".to_string(),
            })
            .await
            .unwrap();

        let messages = response.conversation.messages;
        assert_eq!(messages.len(), EXPECTED_MESSAGES);
        for (turn, message) in messages.iter().enumerate() {
            let expected = if turn % 2 == 0 { "agent-0" } else { "agent-1" };
            match message {
                RawMessage::Structured(m) => assert_eq!(m.agent_id, expected),
                RawMessage::Formatted(_) => panic!("expected structured messages"),
            }
        }
    }

    #[tokio::test]
    async fn test_formatted_messages_use_names() {
        let generator = ScriptedGenerator::new().with_formatted_messages();
        let response = generator
            .generate_conversation(GenerateConversationRequest {
                agent1: fixtures::get_agent("agent-0").unwrap(),
                agent2: fixtures::get_agent("agent-1").unwrap(),
                policy: "p".to_string(),
            })
            .await
            .unwrap();

        match &response.conversation.messages[1] {
            RawMessage::Formatted(line) => assert!(line.starts_with("Imran Qureshi: ")),
            RawMessage::Structured(_) => panic!("expected formatted lines"),
        }
    }

    #[test]
    fn test_influence() {
        assert_eq!(ScriptedGenerator::influence(&[]), 0.0);
        let memories = vec![
            "Asha said: \"I support it\"".to_string(),
            "Bilal said: \"I support this policy\"".to_string(),
            "Chitra said: \"I oppose it\"".to_string(),
            "unrelated".to_string(),
        ];
        assert!((ScriptedGenerator::influence(&memories) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_vote_follows_traits() {
        let generator = ScriptedGenerator::new();

        // Calm, poor and gullible: 0.4*0.58 + 0.3*0.92 + 0.3*0.81 > 0.5
        let agreeable = fixtures::get_agent("agent-0").unwrap();
        let response = generator
            .calculate_vote(CalculateVoteRequest {
                agent: agreeable,
                policy: "p".to_string(),
            })
            .await
            .unwrap();
        assert!(response.vote);
        assert!(response.reasoning.contains("Meera Iyer"));

        let mut sceptic = fixtures::get_agent("agent-4").unwrap();
        sceptic.traits.anger = 0.9;
        sceptic.traits.income = 0.9;
        sceptic.traits.gullibility = 0.1;
        let response = generator
            .calculate_vote(CalculateVoteRequest {
                agent: sceptic,
                policy: "p".to_string(),
            })
            .await
            .unwrap();
        assert!(!response.vote);
    }

    #[test]
    fn test_influence_moves_gullible_agents() {
        let mut agent = fixtures::get_agent("agent-3").unwrap();
        let neutral = ScriptedGenerator::vote_score(&agent);

        agent.remember("Rahul Mehta said: \"I oppose it\"");
        assert!(ScriptedGenerator::vote_score(&agent) < neutral);
    }
}
