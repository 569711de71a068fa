//! # WorkingMemory
//!
//! Transient per-evaluation state: the Fact batch, derived attributes
//! written by fired rules, and the output accumulator. Created fresh for
//! every evaluation call and discarded when it returns; nothing persists
//! across calls.
//!
//! Aggregate queries operate over the whole batch so rules can correlate
//! facts arriving together (detections across distinct zones, summed
//! counts) rather than testing facts one at a time.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;

use crate::model::{Action, EvaluationOutcome, Fact};

#[derive(Debug)]
pub struct WorkingMemory {
    facts: Vec<Fact>,
    attributes: HashMap<String, Value>,
    outcome: EvaluationOutcome,
}

impl WorkingMemory {
    /// Build from one Fact batch.
    pub fn new(facts: Vec<Fact>) -> Self {
        Self {
            facts,
            attributes: HashMap::new(),
            outcome: EvaluationOutcome::default(),
        }
    }

    /// Build from several Fact groups merged into one shared batch.
    pub fn merged(groups: Vec<Vec<Fact>>) -> Self {
        Self::new(groups.into_iter().flatten().collect())
    }

    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    // ==================
    // Aggregate queries
    // ==================

    /// Number of facts with the given event kind.
    pub fn count_of(&self, event: &str) -> usize {
        self.facts.iter().filter(|fact| fact.event == event).count()
    }

    /// Summed fact counts for the event kind; a fact without a count
    /// contributes one.
    pub fn total_count(&self, event: &str) -> i64 {
        self.facts
            .iter()
            .filter(|fact| fact.event == event)
            .map(|fact| fact.count.unwrap_or(1))
            .sum()
    }

    /// Distinct zones the event was observed in.
    pub fn zones_with(&self, event: &str) -> BTreeSet<&str> {
        self.facts
            .iter()
            .filter(|fact| fact.event == event)
            .filter_map(|fact| fact.zone.as_deref())
            .collect()
    }

    /// True when the event was observed in every named zone.
    pub fn has_event_in_zones(&self, event: &str, zones: &[String]) -> bool {
        if zones.is_empty() {
            return false;
        }
        let present = self.zones_with(event);
        zones.iter().all(|zone| present.contains(zone.as_str()))
    }

    pub fn distinct_zone_count(&self, event: &str) -> usize {
        self.zones_with(event).len()
    }

    // ==================
    // Derived attributes
    // ==================

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
    }

    // ==================
    // Output accumulator
    // ==================

    pub fn record_match(&mut self, rule_name: &str) {
        self.outcome.matched_rules.push(rule_name.to_string());
    }

    pub fn push_action(&mut self, action: Action) {
        self.outcome.actions.push(action);
    }

    pub fn into_outcome(self) -> EvaluationOutcome {
        self.outcome
    }
}
