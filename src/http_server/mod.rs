//! # HTTP Boundary
//!
//! Thin transport layer over the decision core: fact ingestion, rule
//! reload, action history, and a health check. All real work happens in
//! the `rules` and `actions` modules; handlers only decode, delegate,
//! and encode.

pub mod actions_routes;
pub mod config;
pub mod facts_routes;
pub mod rules_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use server::HttpServer;

use serde::Serialize;

/// Error payload shared by all endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
