//! Core logic: the tool-calling loop, tool sources and conversations.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod conversation;
mod model_client;
pub mod tool;

pub use agent::{
    Agent, AgentBuilder, AgentError, AgentOutcome, DEFAULT_MAX_TOOL_TURNS,
};
pub use model_client::ModelClientResponse;
