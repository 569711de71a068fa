//! # KnowledgeBase
//!
//! A named, versioned, immutable compiled rule set. Reload never mutates
//! an existing KnowledgeBase; the loader builds a new one and the engine
//! swaps the active pointer on success only.

use crate::rules::definition::{ConditionDef, StepDef};

/// One compiled rule. Belongs to exactly one KnowledgeBase.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub description: Option<String>,
    pub condition: ConditionDef,
    /// Attribute keys the condition reads, precomputed at compile time;
    /// drives the engine's refraction check
    pub condition_keys: Vec<String>,
    pub steps: Vec<StepDef>,
}

/// Compiled, immutable rule set.
#[derive(Debug)]
pub struct KnowledgeBase {
    name: String,
    version: u64,
    rules: Vec<Rule>,
}

impl KnowledgeBase {
    pub fn new(name: impl Into<String>, version: u64, rules: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            version,
            rules,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Rules in load order (lexicographic per directory, then explicit
    /// files); evaluation sweeps them in this order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::definition::FactPattern;

    fn sample_rule(name: &str) -> Rule {
        Rule {
            name: name.to_string(),
            description: None,
            condition: ConditionDef::Match(FactPattern {
                event: Some("unit_detected".to_string()),
                ..FactPattern::default()
            }),
            condition_keys: Vec::new(),
            steps: Vec::new(),
        }
    }

    #[test]
    fn test_rule_order_preserved() {
        let kb = KnowledgeBase::new(
            "battlefield",
            1,
            vec![sample_rule("a"), sample_rule("b")],
        );

        assert_eq!(kb.version(), 1);
        assert_eq!(kb.rule_names(), vec!["a", "b"]);
        assert_eq!(kb.rule_count(), 2);
    }
}
