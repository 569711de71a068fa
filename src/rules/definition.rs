//! # Rule Resource Definitions
//!
//! The on-disk rule format and its compile validation. A resource is a
//! JSON file defining one or more named rules:
//!
//! ```json
//! {
//!   "rules": [
//!     {
//!       "name": "two-zone-alert",
//!       "when": { "event_in_zones": { "event": "unit_detected",
//!                                     "zones": ["ALPHA", "BRAVO"] } },
//!       "then": [ { "emit": { "type": "alert", "level": "high" } } ]
//!     }
//!   ]
//! }
//! ```
//!
//! Conditions read working memory only; action bodies are restricted to
//! emitting an Action, writing working-memory attributes, and the fixed
//! helper set. There is no open-ended expression language.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Action, Fact};

/// Top-level shape of one rule resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSetFile {
    pub rules: Vec<RuleDef>,
}

/// One named rule as written in a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDef {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Condition predicate over working memory
    pub when: ConditionDef,

    /// Action body, applied in order when the condition holds
    pub then: Vec<StepDef>,
}

impl RuleDef {
    /// Compile validation. Returns a reason string on the first problem;
    /// the loader attaches rule name and resource path.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("rule name is empty".to_string());
        }
        if self.then.is_empty() {
            return Err("action body is empty".to_string());
        }
        self.when.validate()?;
        for step in &self.then {
            step.validate()?;
        }
        Ok(())
    }
}

/// Per-fact match pattern. Every set field must match; `min_count`
/// compares against the fact count (absent counts as one).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactPattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_count: Option<i64>,
}

impl FactPattern {
    /// Strict field-by-field match, no coercion.
    pub fn matches(&self, fact: &Fact) -> bool {
        fn field(expected: &Option<String>, actual: &Option<String>) -> bool {
            match expected {
                Some(want) => actual.as_deref() == Some(want.as_str()),
                None => true,
            }
        }

        if let Some(event) = &self.event {
            if fact.event != *event {
                return false;
            }
        }
        if let Some(min) = self.min_count {
            if fact.count.unwrap_or(1) < min {
                return false;
            }
        }

        field(&self.zone, &fact.zone)
            && field(&self.unit_type, &fact.unit_type)
            && field(&self.unit_name, &fact.unit_name)
            && field(&self.group_name, &fact.group_name)
            && field(&self.level, &fact.level)
    }

    fn is_vacuous(&self) -> bool {
        self.event.is_none()
            && self.zone.is_none()
            && self.unit_type.is_none()
            && self.unit_name.is_none()
            && self.group_name.is_none()
            && self.level.is_none()
            && self.min_count.is_none()
    }
}

/// Condition tree evaluated against working memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionDef {
    /// Every child holds
    All(Vec<ConditionDef>),
    /// At least one child holds
    Any(Vec<ConditionDef>),
    /// Child does not hold
    Not(Box<ConditionDef>),
    /// Some fact in the batch matches the pattern
    Match(FactPattern),
    /// Number of facts with the event kind reaches `min`
    EventCountAtLeast { event: String, min: usize },
    /// Summed fact counts for the event kind reach `min`
    TotalCountAtLeast { event: String, min: i64 },
    /// The event was observed in every named zone within this batch
    EventInZones { event: String, zones: Vec<String> },
    /// The event was observed in at least `min` distinct zones
    DistinctZonesAtLeast { event: String, min: usize },
    /// A working-memory attribute equals the value exactly
    AttributeEquals { key: String, value: Value },
    /// A numeric working-memory attribute reaches `min`
    AttributeAtLeast { key: String, min: i64 },
    /// A string working-memory attribute is one of the options
    AttributeOneOf { key: String, options: Vec<String> },
}

impl ConditionDef {
    /// Collect the working-memory attribute keys this condition reads.
    /// The engine re-fires a rule only when one of these changed since
    /// its last firing.
    pub fn collect_attribute_keys(&self, keys: &mut std::collections::BTreeSet<String>) {
        match self {
            ConditionDef::All(children) | ConditionDef::Any(children) => {
                for child in children {
                    child.collect_attribute_keys(keys);
                }
            }
            ConditionDef::Not(child) => child.collect_attribute_keys(keys),
            ConditionDef::AttributeEquals { key, .. }
            | ConditionDef::AttributeAtLeast { key, .. }
            | ConditionDef::AttributeOneOf { key, .. } => {
                keys.insert(key.clone());
            }
            ConditionDef::Match(_)
            | ConditionDef::EventCountAtLeast { .. }
            | ConditionDef::TotalCountAtLeast { .. }
            | ConditionDef::EventInZones { .. }
            | ConditionDef::DistinctZonesAtLeast { .. } => {}
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            ConditionDef::All(children) | ConditionDef::Any(children) => {
                if children.is_empty() {
                    return Err("empty condition list".to_string());
                }
                for child in children {
                    child.validate()?;
                }
                Ok(())
            }
            ConditionDef::Not(child) => child.validate(),
            ConditionDef::Match(pattern) => {
                if pattern.is_vacuous() {
                    return Err("match pattern has no constraints".to_string());
                }
                Ok(())
            }
            ConditionDef::EventCountAtLeast { event, min } => {
                require_event(event)?;
                require_min(*min as i64)
            }
            ConditionDef::TotalCountAtLeast { event, min } => {
                require_event(event)?;
                require_min(*min)
            }
            ConditionDef::EventInZones { event, zones } => {
                require_event(event)?;
                if zones.is_empty() {
                    return Err("event_in_zones lists no zones".to_string());
                }
                Ok(())
            }
            ConditionDef::DistinctZonesAtLeast { event, min } => {
                require_event(event)?;
                require_min(*min as i64)
            }
            ConditionDef::AttributeEquals { key, .. }
            | ConditionDef::AttributeAtLeast { key, .. } => require_key(key),
            ConditionDef::AttributeOneOf { key, options } => {
                require_key(key)?;
                if options.is_empty() {
                    return Err("attribute_one_of lists no options".to_string());
                }
                Ok(())
            }
        }
    }
}

fn require_event(event: &str) -> Result<(), String> {
    if event.trim().is_empty() {
        return Err("event kind is empty".to_string());
    }
    Ok(())
}

fn require_key(key: &str) -> Result<(), String> {
    if key.trim().is_empty() {
        return Err("attribute key is empty".to_string());
    }
    Ok(())
}

fn require_min(min: i64) -> Result<(), String> {
    if min < 1 {
        return Err("minimum must be at least 1".to_string());
    }
    Ok(())
}

/// One step of an action body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepDef {
    /// Append an Action to the accumulator
    Emit(ActionTemplate),
    /// Write a derived attribute, visible to later passes
    SetAttribute { key: String, value: Value },
    /// Add to a numeric attribute (creating it at zero)
    IncrementAttribute {
        key: String,
        #[serde(default = "default_increment")]
        by: i64,
    },
}

fn default_increment() -> i64 {
    1
}

impl StepDef {
    fn validate(&self) -> Result<(), String> {
        match self {
            StepDef::Emit(template) => template.validate(),
            StepDef::SetAttribute { key, .. } | StepDef::IncrementAttribute { key, .. } => {
                require_key(key)
            }
        }
    }
}

/// Template for an emitted Action. The timestamp is stamped at firing
/// time; `count_from_attribute` resolves against working memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionTemplate {
    #[serde(rename = "type")]
    pub action_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    /// Resolve `count` from a working-memory attribute at firing time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_from_attribute: Option<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub parameters: HashMap<String, String>,
}

impl ActionTemplate {
    fn validate(&self) -> Result<(), String> {
        if self.action_type.trim().is_empty() {
            return Err("emit step has an empty action type".to_string());
        }
        if self.count.is_some() && self.count_from_attribute.is_some() {
            return Err("emit step sets both count and count_from_attribute".to_string());
        }
        Ok(())
    }

    /// Materialize the Action with the resolved count.
    pub fn render(&self, count: Option<i64>) -> Action {
        let mut action = Action::new(self.action_type.clone());
        action.sub_type = self.sub_type.clone();
        action.zone = self.zone.clone();
        action.unit_type = self.unit_type.clone();
        action.group_name = self.group_name.clone();
        action.level = self.level.clone();
        action.message = self.message.clone();
        action.count = count;
        action.parameters = self.parameters.clone();
        action
    }
}
