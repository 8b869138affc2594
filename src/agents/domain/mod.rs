//! Domain types for the agent runtime

mod message;
mod tool_call;

pub use message::*;
pub use tool_call::*;
