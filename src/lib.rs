//! skywarden - A real-time battlefield decision engine with
//! hot-reloadable rules
//!
//! Facts in, Actions out: batches of battlefield observations are
//! evaluated against a versioned KnowledgeBase with bounded forward
//! chaining; emitted Actions are logged and fanned out to any number of
//! concurrently connected WebSocket subscribers.

pub mod actions;
pub mod broadcast;
pub mod cli;
pub mod config;
pub mod http_server;
pub mod model;
pub mod rules;
