//! Fact ingestion endpoints.
//!
//! `POST /facts` evaluates one batch; `POST /facts/batch` merges several
//! groups into one shared working memory so rules can correlate across
//! them. Successful evaluations record their actions with the
//! ActionManager, which fans them out to subscribers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::actions::ActionManager;
use crate::model::{Action, EvaluationOutcome, Fact};
use crate::rules::{EvaluationFailure, RuleEngine};

use super::ErrorResponse;

/// Shared state for fact evaluation handlers
pub struct FactsState {
    pub engine: Arc<RuleEngine>,
    pub actions: Arc<ActionManager>,
}

pub fn facts_routes(state: Arc<FactsState>) -> Router {
    Router::new()
        .route("/facts", post(evaluate_facts))
        .route("/facts/batch", post(evaluate_fact_groups))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct FactsRequest {
    pub facts: Vec<Fact>,
}

#[derive(Debug, Deserialize)]
pub struct FactGroupsRequest {
    pub groups: Vec<Vec<Fact>>,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub matched_rules: Vec<String>,
    pub actions: Vec<Action>,
}

/// Evaluation fault payload; carries everything accumulated before the
/// fault.
#[derive(Debug, Serialize)]
pub struct PartialResponse {
    pub error: String,
    pub matched_rules: Vec<String>,
    pub actions: Vec<Action>,
}

async fn evaluate_facts(
    State(state): State<Arc<FactsState>>,
    Json(request): Json<FactsRequest>,
) -> Response {
    if request.facts.is_empty() {
        return no_facts();
    }
    respond(&state, state.engine.evaluate(request.facts))
}

async fn evaluate_fact_groups(
    State(state): State<Arc<FactsState>>,
    Json(request): Json<FactGroupsRequest>,
) -> Response {
    if request.groups.iter().all(|group| group.is_empty()) {
        return no_facts();
    }
    respond(&state, state.engine.evaluate_batch(request.groups))
}

fn no_facts() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "no facts provided".to_string(),
        }),
    )
        .into_response()
}

fn respond(
    state: &FactsState,
    result: Result<EvaluationOutcome, EvaluationFailure>,
) -> Response {
    match result {
        Ok(outcome) => {
            for action in &outcome.actions {
                state.actions.record(action.clone());
            }
            (
                StatusCode::OK,
                Json(EvaluateResponse {
                    matched_rules: outcome.matched_rules,
                    actions: outcome.actions,
                }),
            )
                .into_response()
        }
        Err(failure) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(PartialResponse {
                error: failure.error.to_string(),
                matched_rules: failure.partial.matched_rules,
                actions: failure.partial.actions,
            }),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facts_request_parse() {
        let raw = r#"{"facts": [{"event": "unit_detected", "zone": "ALPHA"}]}"#;
        let request: FactsRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.facts.len(), 1);
        assert_eq!(request.facts[0].event, "unit_detected");
    }

    #[test]
    fn test_groups_request_parse() {
        let raw = r#"{"groups": [[{"event": "a"}], [{"event": "b"}]]}"#;
        let request: FactGroupsRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.groups.len(), 2);
    }
}
