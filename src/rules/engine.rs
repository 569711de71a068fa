//! # Rule Engine
//!
//! Bounded forward chaining over an atomically swapped KnowledgeBase.
//!
//! ## Concurrency
//!
//! The active KnowledgeBase lives behind `RwLock<Arc<KnowledgeBase>>`.
//! An evaluation clones the `Arc` under a momentary read lock and works
//! against that snapshot for its whole duration; a reload builds the
//! replacement outside any lock and takes the write lock only for the
//! swap instant. N evaluations proceed in parallel.
//!
//! ## Cycle loop
//!
//! At most `max_cycles` passes; each pass sweeps every rule in
//! KnowledgeBase order. Refraction: a rule that has fired re-fires only
//! when an attribute its condition reads has changed since that firing.
//! Facts are immutable within an evaluation, so a rule whose condition
//! reads facts alone fires at most once, while a rule that reads an
//! attribute its own body rewrites keeps firing pass after pass. A pass
//! with zero firings is a fixed point. Both fixed point and exhausting
//! `max_cycles` are successful terminations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{info, warn};

use crate::model::{EvaluationOutcome, Fact};

use super::definition::{ConditionDef, StepDef};
use super::errors::{EvaluationError, EvaluationFailure, LoadResult};
use super::helpers;
use super::knowledge::KnowledgeBase;
use super::loader::{self, RuleSources};
use super::memory::WorkingMemory;

/// The decision engine. Construct once, share by reference.
pub struct RuleEngine {
    active: RwLock<Arc<KnowledgeBase>>,
    sources: RuleSources,
    base_name: String,
    max_cycles: u32,
    next_version: AtomicU64,
}

impl RuleEngine {
    /// Build the engine and load the initial KnowledgeBase (version 1).
    /// A load failure here is fatal to startup.
    pub fn new(
        base_name: impl Into<String>,
        sources: RuleSources,
        max_cycles: u32,
    ) -> LoadResult<Self> {
        let base_name = base_name.into();
        let kb = loader::load_knowledge(&sources, &base_name, 1)?;
        info!(
            name = %kb.name(),
            version = kb.version(),
            rules = kb.rule_count(),
            "knowledge base loaded"
        );

        Ok(Self {
            active: RwLock::new(Arc::new(kb)),
            sources,
            base_name,
            max_cycles,
            next_version: AtomicU64::new(2),
        })
    }

    /// Snapshot of the active KnowledgeBase.
    pub fn knowledge(&self) -> Arc<KnowledgeBase> {
        self.read_active()
    }

    pub fn max_cycles(&self) -> u32 {
        self.max_cycles
    }

    /// Repeat loading from scratch into a new KnowledgeBase and swap it
    /// in on success only. A failing reload leaves the previous
    /// KnowledgeBase serving and surfaces the offending resource.
    ///
    /// Version numbers are allocated per load attempt, so versions of
    /// installed KnowledgeBases are strictly increasing.
    pub fn reload(&self) -> LoadResult<Arc<KnowledgeBase>> {
        let version = self.next_version.fetch_add(1, Ordering::SeqCst);

        let kb = match loader::load_knowledge(&self.sources, &self.base_name, version) {
            Ok(kb) => Arc::new(kb),
            Err(e) => {
                warn!(error = %e, "rule reload failed, previous knowledge base stays active");
                return Err(e);
            }
        };

        {
            let mut active = self
                .active
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *active = Arc::clone(&kb);
        }

        info!(
            name = %kb.name(),
            version = kb.version(),
            rules = kb.rule_count(),
            "knowledge base reloaded"
        );
        Ok(kb)
    }

    /// Evaluate one Fact batch.
    pub fn evaluate(&self, facts: Vec<Fact>) -> Result<EvaluationOutcome, EvaluationFailure> {
        self.evaluate_memory(WorkingMemory::new(facts))
    }

    /// Evaluate several Fact groups merged into one shared WorkingMemory,
    /// so rules can correlate facts arriving together across groups.
    pub fn evaluate_batch(
        &self,
        groups: Vec<Vec<Fact>>,
    ) -> Result<EvaluationOutcome, EvaluationFailure> {
        self.evaluate_memory(WorkingMemory::merged(groups))
    }

    fn evaluate_memory(
        &self,
        mut memory: WorkingMemory,
    ) -> Result<EvaluationOutcome, EvaluationFailure> {
        let kb = self.knowledge();

        match self.run_cycles(&kb, &mut memory) {
            Ok(()) => Ok(memory.into_outcome()),
            Err(error) => Err(EvaluationFailure {
                error,
                partial: memory.into_outcome(),
            }),
        }
    }

    fn read_active(&self) -> Arc<KnowledgeBase> {
        // A poisoned lock only means some thread panicked while holding
        // it; the Arc it guards is still a consistent snapshot.
        let guard = self
            .active
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    fn run_cycles(
        &self,
        kb: &KnowledgeBase,
        memory: &mut WorkingMemory,
    ) -> Result<(), EvaluationError> {
        let rules = kb.rules();
        // Condition-input snapshot at each rule's last firing; the
        // refraction gate compares against the current snapshot.
        let mut last_fired: Vec<Option<Signature>> = vec![None; rules.len()];

        for _pass in 0..self.max_cycles {
            let mut fired_this_pass = false;

            for (idx, rule) in rules.iter().enumerate() {
                let signature = condition_signature(rule, memory);
                if last_fired[idx].as_ref() == Some(&signature) {
                    continue;
                }
                if !eval_condition(&rule.condition, memory, &rule.name)? {
                    continue;
                }

                last_fired[idx] = Some(signature);
                memory.record_match(&rule.name);
                for step in &rule.steps {
                    apply_step(step, memory, &rule.name)?;
                }
                fired_this_pass = true;
            }

            if !fired_this_pass {
                break;
            }
        }

        Ok(())
    }
}

/// Values of the attributes a rule's condition reads, in the rule's
/// precomputed key order. Fact inputs need no snapshot: they never
/// change within an evaluation.
type Signature = Vec<Option<Value>>;

fn condition_signature(rule: &super::knowledge::Rule, memory: &WorkingMemory) -> Signature {
    rule.condition_keys
        .iter()
        .map(|key| memory.attribute(key).cloned())
        .collect()
}

fn eval_condition(
    condition: &ConditionDef,
    memory: &WorkingMemory,
    rule: &str,
) -> Result<bool, EvaluationError> {
    match condition {
        ConditionDef::All(children) => {
            for child in children {
                if !eval_condition(child, memory, rule)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        ConditionDef::Any(children) => {
            for child in children {
                if eval_condition(child, memory, rule)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        ConditionDef::Not(child) => Ok(!eval_condition(child, memory, rule)?),
        ConditionDef::Match(pattern) => {
            Ok(memory.facts().iter().any(|fact| pattern.matches(fact)))
        }
        ConditionDef::EventCountAtLeast { event, min } => Ok(memory.count_of(event) >= *min),
        ConditionDef::TotalCountAtLeast { event, min } => Ok(memory.total_count(event) >= *min),
        ConditionDef::EventInZones { event, zones } => {
            Ok(memory.has_event_in_zones(event, zones))
        }
        ConditionDef::DistinctZonesAtLeast { event, min } => {
            Ok(memory.distinct_zone_count(event) >= *min)
        }
        ConditionDef::AttributeEquals { key, value } => {
            Ok(memory.attribute(key) == Some(value))
        }
        ConditionDef::AttributeAtLeast { key, min } => match memory.attribute(key) {
            None => Ok(false),
            Some(value) => match helpers::numeric(value) {
                Some(n) => Ok(n >= *min),
                None => Err(EvaluationError::AttributeType {
                    rule: rule.to_string(),
                    key: key.clone(),
                    expected: "a number",
                    found: helpers::value_kind(value),
                }),
            },
        },
        ConditionDef::AttributeOneOf { key, options } => match memory.attribute(key) {
            None => Ok(false),
            Some(Value::String(s)) => Ok(helpers::contains_str(options, s)),
            Some(value) => Err(EvaluationError::AttributeType {
                rule: rule.to_string(),
                key: key.clone(),
                expected: "a string",
                found: helpers::value_kind(value),
            }),
        },
    }
}

fn apply_step(
    step: &StepDef,
    memory: &mut WorkingMemory,
    rule: &str,
) -> Result<(), EvaluationError> {
    match step {
        StepDef::Emit(template) => {
            let count = match (&template.count, &template.count_from_attribute) {
                (Some(n), _) => Some(*n),
                (None, Some(key)) => {
                    let value = memory.attribute(key).ok_or_else(|| {
                        EvaluationError::MissingAttribute {
                            rule: rule.to_string(),
                            key: key.clone(),
                        }
                    })?;
                    let n = helpers::numeric(value).ok_or_else(|| {
                        EvaluationError::AttributeType {
                            rule: rule.to_string(),
                            key: key.clone(),
                            expected: "a number",
                            found: helpers::value_kind(value),
                        }
                    })?;
                    Some(n)
                }
                (None, None) => None,
            };
            memory.push_action(template.render(count));
        }
        StepDef::SetAttribute { key, value } => {
            memory.set_attribute(key.clone(), value.clone());
        }
        StepDef::IncrementAttribute { key, by } => {
            let next = match memory.attribute(key) {
                None => *by,
                Some(value) => {
                    helpers::numeric(value).ok_or_else(|| EvaluationError::AttributeType {
                        rule: rule.to_string(),
                        key: key.clone(),
                        expected: "a number",
                        found: helpers::value_kind(value),
                    })? + *by
                }
            };
            memory.set_attribute(key.clone(), Value::from(next));
        }
    }
    Ok(())
}
