//! Vote Aggregation
//!
//! Pure summaries of the roster's votes.

use opinion_model::{Agent, VoteResult};
use std::collections::BTreeMap;

/// Counts yes/no votes. `total` is always the roster size.
pub fn tally(agents: &[Agent]) -> VoteResult {
    agents.iter().fold(
        VoteResult {
            total: agents.len(),
            ..VoteResult::default()
        },
        |mut result, agent| {
            match agent.vote {
                Some(true) => result.yes += 1,
                Some(false) => result.no += 1,
                None => {}
            }
            result
        },
    )
}

/// Tallies each religion separately.
pub fn tally_by_religion(agents: &[Agent]) -> BTreeMap<String, VoteResult> {
    let mut groups: BTreeMap<String, VoteResult> = BTreeMap::new();
    for agent in agents {
        let result = groups.entry(agent.traits.religion.clone()).or_default();
        result.total += 1;
        match agent.vote {
            Some(true) => result.yes += 1,
            Some(false) => result.no += 1,
            None => {}
        }
    }
    groups
}
