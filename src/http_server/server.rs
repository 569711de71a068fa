//! # HTTP Server
//!
//! Combines the fact, rule, and action routers behind one listener.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::actions::ActionManager;
use crate::rules::RuleEngine;

use super::actions_routes::{actions_routes, ActionsState};
use super::config::HttpServerConfig;
use super::facts_routes::{facts_routes, FactsState};
use super::rules_routes::{rules_routes, RulesState};

/// HTTP server for the decision layer
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(
        config: HttpServerConfig,
        engine: Arc<RuleEngine>,
        actions: Arc<ActionManager>,
    ) -> Self {
        let router = Self::build_router(&config, engine, actions);
        Self { config, router }
    }

    fn build_router(
        config: &HttpServerConfig,
        engine: Arc<RuleEngine>,
        actions: Arc<ActionManager>,
    ) -> Router {
        let facts_state = Arc::new(FactsState {
            engine: Arc::clone(&engine),
            actions: Arc::clone(&actions),
        });
        let rules_state = Arc::new(RulesState { engine });
        let actions_state = Arc::new(ActionsState { actions });

        let cors = if config.cors_origins.is_empty() {
            // No origins configured: permissive for development
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .merge(health_routes())
            .nest("/api", facts_routes(facts_state))
            .nest("/api", rules_routes(rules_state))
            .nest("/api", actions_routes(actions_state))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind and serve until the task is cancelled.
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let listener = TcpListener::bind(addr).await?;
        info!(addr = %addr, "http server listening");
        axum::serve(listener, self.router).await
    }
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "skywarden",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSources;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_build_router() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("rules.json"),
            r#"{
                "rules": [ {
                    "name": "alpha",
                    "when": { "match": { "event": "unit_detected" } },
                    "then": [ { "emit": { "type": "alert" } } ]
                } ]
            }"#,
        )
        .unwrap();

        let engine = Arc::new(
            RuleEngine::new("battlefield", RuleSources::dir(dir.path()), 10).unwrap(),
        );
        let actions = Arc::new(ActionManager::new(0));

        // Router construction must not panic regardless of CORS config
        let server = HttpServer::new(HttpServerConfig::default(), engine, actions);
        assert_eq!(server.socket_addr(), "0.0.0.0:8080");
        let _router = server.router();
    }
}
