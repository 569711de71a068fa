//! # Core Data Model
//!
//! The records exchanged at every boundary of the decision layer:
//!
//! - **Fact**: immutable observation handed in by the ingestion layer
//! - **Action**: immutable, timestamped effect emitted by a firing rule
//! - **EvaluationOutcome**: matched rule names plus emitted actions for
//!   one evaluation call

mod action;
mod fact;

pub use action::Action;
pub use fact::Fact;

use serde::{Deserialize, Serialize};

/// Result of a single evaluation call.
///
/// `matched_rules` lists rule names in firing order; `actions` preserves
/// rule-firing order as well. On an evaluation fault this carries
/// everything accumulated before the fault.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    pub matched_rules: Vec<String>,
    pub actions: Vec<Action>,
}

impl EvaluationOutcome {
    /// True when no rule fired.
    pub fn is_empty(&self) -> bool {
        self.matched_rules.is_empty() && self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_outcome() {
        let outcome = EvaluationOutcome::default();
        assert!(outcome.is_empty());
    }
}
