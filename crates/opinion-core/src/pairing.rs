//! Conversation Pairing
//!
//! Deterministic assignment of agents into conversation partners.

use opinion_model::ConversationPair;
use thiserror::Error;

/// Fewest agents that can be paired
pub const MIN_PAIRING_POPULATION: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PairingError {
    #[error("insufficient population: need at least {required} agents to pair, got {actual}")]
    InsufficientPopulation { required: usize, actual: usize },
}

/// Pairs index `2k` with `2k + 1` in input order.
///
/// With an odd count the last agent is paired with the first, so the first
/// agent takes part in two conversations. No randomness is involved.
pub fn pair_agents<S: AsRef<str>>(agent_ids: &[S]) -> Result<Vec<ConversationPair>, PairingError> {
    if agent_ids.len() < MIN_PAIRING_POPULATION {
        return Err(PairingError::InsufficientPopulation {
            required: MIN_PAIRING_POPULATION,
            actual: agent_ids.len(),
        });
    }

    let mut pairs: Vec<ConversationPair> = agent_ids
        .chunks_exact(2)
        .map(|chunk| ConversationPair::new(chunk[0].as_ref(), chunk[1].as_ref()))
        .collect();

    if agent_ids.len() % 2 != 0 {
        let first = agent_ids[0].as_ref();
        let last = agent_ids[agent_ids.len() - 1].as_ref();
        pairs.push(ConversationPair::new(first, last));
    }

    Ok(pairs)
}
