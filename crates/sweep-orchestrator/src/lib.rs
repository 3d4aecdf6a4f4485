//! Pipeline run orchestration.
//!
//! Validates run requests, drives per-policy execution through the
//! external policy engine, and converges pipeline and policy-result state.

pub mod config;
pub mod engine;
pub mod orchestrator;
pub mod output;

pub use config::EngineConfig;
pub use engine::PolicyEngine;
pub use orchestrator::{Orchestrator, PolicyOutcome, RunHandle, RunOutcome};
