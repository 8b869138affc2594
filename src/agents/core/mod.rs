//! The tool-calling agent loop and its text-intent parser

mod interrupt;
mod parser;
mod session;

pub use interrupt::Interrupts;
pub use parser::{parse_intent, ModelIntent};
pub use session::{AgentSession, SessionEvent, SessionState, TurnOutcome};
