//! Local tool-calling agent.
//!
//! A chat session driven by a model served by Ollama, with the BloodHound
//! tool catalog as its only means of reaching the graph.
//!
//! ## Architecture
//!
//! - `domain/` - Transcript types (Message, ToolCall, ToolCallRecord)
//! - `llm/` - The model backend port and its Ollama implementation
//! - `core/` - The session state machine
//! - `memory/` - Transcript retention
//! - `token/` - Per-turn budgets

pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod llm;
pub mod memory;
pub mod token;

pub use self::config::*;
pub use self::domain::*;
pub use self::error::*;
pub use self::core::{AgentSession, Interrupts, SessionEvent, SessionState, TurnOutcome};
