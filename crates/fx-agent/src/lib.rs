//! Currency conversion agents built on Gemini.
//!
//! Two ways of giving the model its tool are offered: a [`Session`] calls
//! the conversion tool in-process and keeps a conversation across
//! messages, while a [`RemoteSession`] discovers the tools of an MCP server
//! (see [`exchange_server`]) and answers one prompt at a time. The binaries
//! of this crate wire them to the terminal.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;
#[cfg(feature = "cli")]
pub mod console;
mod remote;
mod server;
mod session;

pub use config::{AppConfig, ConfigError};
pub use remote::RemoteSession;
pub use server::{SERVER_NAME, exchange_server};
pub use session::{Session, SessionBuilder};

/// Re-exports of [`fx_agent_core`] crate.
pub mod core {
    pub use fx_agent_core::*;
}
