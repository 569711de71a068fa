//! Evaluation Engine Invariant Tests
//!
//! - Determinism for side-effect-free rules
//! - Cycle bound as a normal termination
//! - Cross-batch correlation through shared working memory
//! - Partial results surviving a runtime fault

use std::fs;

use tempfile::TempDir;

use skywarden::model::{Action, Fact};
use skywarden::rules::{EvaluationError, RuleEngine, RuleSources};

// =============================================================================
// Helper Functions
// =============================================================================

fn engine_with(rules_json: &str, max_cycles: u32) -> (RuleEngine, TempDir) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("rules.json"), rules_json).unwrap();
    let engine =
        RuleEngine::new("battlefield", RuleSources::dir(dir.path()), max_cycles).unwrap();
    (engine, dir)
}

/// Action fields relevant to determinism checks (timestamps differ
/// between runs by construction).
fn shape(action: &Action) -> (String, Option<String>, Option<String>, Option<i64>) {
    (
        action.action_type.clone(),
        action.sub_type.clone(),
        action.zone.clone(),
        action.count,
    )
}

const TWO_ZONE_RULES: &str = r#"{
    "rules": [ {
        "name": "two-zone-alert",
        "when": { "event_in_zones": { "event": "unit_detected",
                                      "zones": ["ALPHA", "BRAVO"] } },
        "then": [ { "emit": { "type": "alert", "sub_type": "composite" } } ]
    } ]
}"#;

// =============================================================================
// Determinism
// =============================================================================

/// Two evaluations of the same batch against an unchanged KnowledgeBase
/// yield identical action sequences and matched-rule lists.
#[test]
fn test_determinism_for_pure_rules() {
    let (engine, _dir) = engine_with(
        r#"{
            "rules": [
                {
                    "name": "count-alert",
                    "when": { "event_count_at_least": { "event": "unit_detected", "min": 2 } },
                    "then": [ { "emit": { "type": "alert", "count": 2 } } ]
                },
                {
                    "name": "zone-alert",
                    "when": { "match": { "event": "unit_detected", "zone": "ALPHA" } },
                    "then": [ { "emit": { "type": "alert", "zone": "ALPHA" } } ]
                }
            ]
        }"#,
        20,
    );

    let batch = || {
        vec![
            Fact::in_zone("unit_detected", "ALPHA"),
            Fact::in_zone("unit_detected", "BRAVO"),
        ]
    };

    let first = engine.evaluate(batch()).unwrap();
    let second = engine.evaluate(batch()).unwrap();

    assert_eq!(first.matched_rules, second.matched_rules);
    assert_eq!(
        first.actions.iter().map(shape).collect::<Vec<_>>(),
        second.actions.iter().map(shape).collect::<Vec<_>>()
    );
}

// =============================================================================
// Cycle Bound
// =============================================================================

/// A rule that always re-fires (its condition reads the counter its
/// body increments) performs exactly max_cycles passes and returns
/// successfully.
#[test]
fn test_cycle_bound_is_normal_termination() {
    let (engine, _dir) = engine_with(
        r#"{
            "rules": [ {
                "name": "spinner",
                "when": { "not": { "attribute_at_least": { "key": "spins",
                                                           "min": 1000000 } } },
                "then": [ { "increment_attribute": { "key": "spins" } } ]
            } ]
        }"#,
        5,
    );

    let outcome = engine.evaluate(vec![Fact::new("tick")]).unwrap();
    assert_eq!(outcome.matched_rules.len(), 5);
    assert_eq!(outcome.matched_rules, vec!["spinner"; 5]);
}

/// A fixed point ends the loop before the cycle bound.
#[test]
fn test_fixed_point_before_cycle_bound() {
    let (engine, _dir) = engine_with(TWO_ZONE_RULES, 1000);

    let outcome = engine
        .evaluate(vec![
            Fact::in_zone("unit_detected", "ALPHA"),
            Fact::in_zone("unit_detected", "BRAVO"),
        ])
        .unwrap();

    // One firing despite 1000 available cycles
    assert_eq!(outcome.matched_rules.len(), 1);
    assert_eq!(outcome.actions.len(), 1);
}

// =============================================================================
// Cross-Batch Correlation
// =============================================================================

/// Detections in two distinct zones within the same batch trigger
/// exactly one composite alert.
#[test]
fn test_cross_batch_correlation_single_batch() {
    let (engine, _dir) = engine_with(TWO_ZONE_RULES, 50);

    let outcome = engine
        .evaluate(vec![
            Fact::in_zone("unit_detected", "ALPHA"),
            Fact::in_zone("unit_detected", "BRAVO"),
        ])
        .unwrap();

    assert_eq!(outcome.actions.len(), 1);
    assert_eq!(outcome.actions[0].action_type, "alert");
    assert_eq!(outcome.actions[0].sub_type.as_deref(), Some("composite"));
}

/// The same correlation works when the detections arrive as separate
/// groups merged by evaluate_batch.
#[test]
fn test_cross_batch_correlation_merged_groups() {
    let (engine, _dir) = engine_with(TWO_ZONE_RULES, 50);

    let outcome = engine
        .evaluate_batch(vec![
            vec![Fact::in_zone("unit_detected", "ALPHA")],
            vec![Fact::in_zone("unit_detected", "BRAVO")],
        ])
        .unwrap();

    assert_eq!(outcome.actions.len(), 1);
}

/// A single-zone batch must not trigger the composite alert.
#[test]
fn test_correlation_requires_both_zones() {
    let (engine, _dir) = engine_with(TWO_ZONE_RULES, 50);

    let outcome = engine
        .evaluate(vec![
            Fact::in_zone("unit_detected", "ALPHA"),
            Fact::in_zone("unit_detected", "ALPHA"),
        ])
        .unwrap();

    assert!(outcome.actions.is_empty());
}

// =============================================================================
// Runtime Faults
// =============================================================================

/// A fault mid-evaluation aborts the call but keeps everything already
/// accumulated available to the caller.
#[test]
fn test_fault_preserves_partial_result() {
    let (engine, _dir) = engine_with(
        r#"{
            "rules": [
                {
                    "name": "healthy",
                    "when": { "event_count_at_least": { "event": "unit_detected", "min": 1 } },
                    "then": [ { "emit": { "type": "alert", "zone": "ALPHA" } } ]
                },
                {
                    "name": "faulty",
                    "when": { "event_count_at_least": { "event": "unit_detected", "min": 1 } },
                    "then": [ { "emit": { "type": "alert",
                                          "count_from_attribute": "missing" } } ]
                }
            ]
        }"#,
        10,
    );

    let failure = engine
        .evaluate(vec![Fact::new("unit_detected")])
        .unwrap_err();

    assert!(matches!(
        failure.error,
        EvaluationError::MissingAttribute { .. }
    ));
    assert_eq!(failure.partial.actions.len(), 1);
    assert_eq!(failure.partial.actions[0].zone.as_deref(), Some("ALPHA"));
}

/// A fault in one call leaves the engine fully usable for the next.
#[test]
fn test_fault_is_scoped_to_one_call() {
    let (engine, _dir) = engine_with(
        r#"{
            "rules": [
                {
                    "name": "sum-check",
                    "when": { "attribute_at_least": { "key": "mode", "min": 1 } },
                    "then": [ { "emit": { "type": "alert" } } ]
                },
                {
                    "name": "poison",
                    "when": { "match": { "event": "poison" } },
                    "then": [ { "set_attribute": { "key": "mode", "value": "text" } } ]
                },
                {
                    "name": "clean",
                    "when": { "match": { "event": "clean" } },
                    "then": [ { "emit": { "type": "alert", "zone": "SAFE" } } ]
                }
            ]
        }"#,
        10,
    );

    // The poisoned batch writes a string where a number is compared
    assert!(engine.evaluate(vec![Fact::new("poison")]).is_err());

    // A fresh working memory makes the next call clean
    let outcome = engine.evaluate(vec![Fact::new("clean")]).unwrap();
    assert_eq!(outcome.actions.len(), 1);
    assert_eq!(outcome.actions[0].zone.as_deref(), Some("SAFE"));
}
