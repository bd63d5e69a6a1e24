//! Conversation Orchestration
//!
//! This module implements the loop that turns one user request into model
//! rounds and tool executions, and the history it accumulates on the way.

pub mod conversation;
pub mod core;

pub use conversation::Conversation;
pub use core::{Orchestrator, OrchestratorSettings, TurnOutcome};
