//! Actions: structured, timestamped effects emitted by firing rules.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An effect record produced by rule evaluation.
///
/// Actions are immutable once created; the ActionManager logs them and the
/// broadcast layer serializes them to subscribers unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Action type (e.g. "alert", "spawn_group")
    #[serde(rename = "type")]
    pub action_type: String,

    /// Optional refinement of the type (e.g. "composite")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,

    /// Target zone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,

    /// Target unit type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_type: Option<String>,

    /// Target group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,

    /// Severity level for the consumer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Count attached to the effect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,

    /// Free-form parameters for the consumer
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub parameters: HashMap<String, String>,

    /// Creation time, set when the rule fires
    pub timestamp: DateTime<Utc>,
}

impl Action {
    /// Create an action of the given type, stamped now.
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            sub_type: None,
            zone: None,
            unit_type: None,
            group_name: None,
            level: None,
            message: None,
            count: None,
            parameters: HashMap::new(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_form() {
        let mut action = Action::new("alert");
        action.zone = Some("ALPHA".to_string());
        action.message = Some("contact".to_string());

        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "alert");
        assert_eq!(json["zone"], "ALPHA");
        // Unset optionals are omitted
        assert!(json.get("sub_type").is_none());
        assert!(json.get("parameters").is_none());
    }

    #[test]
    fn test_action_parse() {
        let raw = r#"{
            "type": "spawn_group",
            "group_name": "RED-QRF",
            "count": 2,
            "timestamp": "2026-01-01T00:00:00Z"
        }"#;

        let action: Action = serde_json::from_str(raw).unwrap();
        assert_eq!(action.action_type, "spawn_group");
        assert_eq!(action.group_name.as_deref(), Some("RED-QRF"));
        assert_eq!(action.count, Some(2));
    }
}
