//! Action history endpoints.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::actions::ActionManager;
use crate::model::Action;

/// Shared state for action history handlers
pub struct ActionsState {
    pub actions: Arc<ActionManager>,
}

pub fn actions_routes(state: Arc<ActionsState>) -> Router {
    Router::new()
        .route("/actions/recent", get(recent_actions))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    /// Most recent entries to return; omitted or 0 returns everything
    /// retained
    #[serde(default)]
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct RecentResponse {
    pub total: usize,
    pub dropped_deliveries: u64,
    pub actions: Vec<Action>,
}

async fn recent_actions(
    State(state): State<Arc<ActionsState>>,
    Query(params): Query<RecentParams>,
) -> Json<RecentResponse> {
    let actions = state.actions.recent(params.limit);
    Json(RecentResponse {
        total: actions.len(),
        dropped_deliveries: state.actions.dropped_deliveries(),
        actions,
    })
}
