//! Rule management endpoints.
//!
//! A failed reload reports which resource failed and why while the
//! previous KnowledgeBase keeps serving traffic.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::warn;

use crate::rules::{KnowledgeBase, RuleEngine};

use super::ErrorResponse;

/// Shared state for rule management handlers
pub struct RulesState {
    pub engine: Arc<RuleEngine>,
}

pub fn rules_routes(state: Arc<RulesState>) -> Router {
    Router::new()
        .route("/rules", get(active_rules))
        .route("/rules/reload", post(reload_rules))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct KnowledgeResponse {
    pub name: String,
    pub version: u64,
    pub rule_count: usize,
    pub rules: Vec<String>,
}

impl KnowledgeResponse {
    fn from_knowledge(kb: &KnowledgeBase) -> Self {
        Self {
            name: kb.name().to_string(),
            version: kb.version(),
            rule_count: kb.rule_count(),
            rules: kb
                .rule_names()
                .into_iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

async fn active_rules(State(state): State<Arc<RulesState>>) -> Json<KnowledgeResponse> {
    Json(KnowledgeResponse::from_knowledge(&state.engine.knowledge()))
}

async fn reload_rules(State(state): State<Arc<RulesState>>) -> Response {
    match state.engine.reload() {
        Ok(kb) => (
            StatusCode::OK,
            Json(KnowledgeResponse::from_knowledge(&kb)),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "rule reload rejected");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_knowledge_response_serialize() {
        let response = KnowledgeResponse {
            name: "battlefield".to_string(),
            version: 2,
            rule_count: 1,
            rules: vec!["two-zone-alert".to_string()],
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["version"], 2);
        assert_eq!(json["rules"][0], "two-zone-alert");
    }
}
