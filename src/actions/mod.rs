//! # Action Distribution
//!
//! The ActionManager keeps a durable append-only log of emitted Actions
//! and fans each one out, non-blocking, to every registered subscriber
//! queue. History is never dropped on subscriber backpressure; only
//! per-subscriber delivery is best-effort.

mod manager;

pub use manager::{ActionManager, ObserverId};
