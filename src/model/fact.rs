//! Facts: atomic immutable observations of world state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single battlefield observation.
///
/// Created by the ingestion boundary and consumed read-only by the rule
/// engine. `event` is an open string enum ("unit_detected",
/// "zone_captured", ...); everything else is optional context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    /// Event kind
    pub event: String,

    /// Zone the event was observed in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,

    /// Unit type (e.g. "SA-10", "F-16C")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_type: Option<String>,

    /// Unit name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_name: Option<String>,

    /// Group name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,

    /// Severity or alert level reported by the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Unit count; absent counts as one in aggregate queries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,

    /// Free-form attributes supplied by the source
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, Value>,
}

impl Fact {
    /// Create a bare fact with only an event kind.
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            zone: None,
            unit_type: None,
            unit_name: None,
            group_name: None,
            level: None,
            count: None,
            attributes: HashMap::new(),
        }
    }

    /// Create a fact observed in a zone.
    pub fn in_zone(event: impl Into<String>, zone: impl Into<String>) -> Self {
        let mut fact = Self::new(event);
        fact.zone = Some(zone.into());
        fact
    }

    /// Builder-style count setter.
    pub fn with_count(mut self, count: i64) -> Self {
        self.count = Some(count);
        self
    }
}
