//! Vote Tally
//!
//! Yes/no/total counts derived from the agent roster.

use serde::{Deserialize, Serialize};

/// Counts of support and opposition across a roster.
///
/// Agents that have not voted count toward `total` only, so
/// `yes + no <= total` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteResult {
    pub yes: usize,
    pub no: usize,
    pub total: usize,
}

impl VoteResult {
    /// Agents that have not voted yet.
    pub fn pending(&self) -> usize {
        self.total.saturating_sub(self.yes + self.no)
    }

    /// True when every agent has voted. An empty roster is never complete.
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.pending() == 0
    }

    /// Share of the roster voting yes, as a whole percentage.
    pub fn yes_percent(&self) -> u32 {
        percent(self.yes, self.total)
    }

    /// Share of the roster voting no, as a whole percentage.
    pub fn no_percent(&self) -> u32 {
        percent(self.no, self.total)
    }
}

fn percent(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((count as f64 / total as f64) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentages() {
        let result = VoteResult { yes: 2, no: 1, total: 3 };
        assert_eq!(result.yes_percent(), 67);
        assert_eq!(result.no_percent(), 33);
        assert!(result.is_complete());
    }

    #[test]
    fn test_provisional_tally() {
        let result = VoteResult { yes: 1, no: 1, total: 4 };
        assert_eq!(result.pending(), 2);
        assert!(!result.is_complete());
    }

    #[test]
    fn test_empty_tally() {
        let result = VoteResult::default();
        assert_eq!(result.yes_percent(), 0);
        assert!(!result.is_complete());
    }
}
