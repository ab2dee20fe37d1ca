//! Tool serving over the Model Context Protocol.
//!
//! Both ends of a stdio session are here: [`McpServer`] exposes any
//! [`ToolSource`](fx_agent_core::tool::ToolSource) to an MCP client, and
//! [`McpToolSource`] lets an agent call the tools of an MCP server as if
//! they were local. Messages are newline-delimited JSON-RPC 2.0 carried by
//! a [`LineTransport`].

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod client;
mod error;
pub mod proto;
mod server;
mod source;
mod transport;

pub use client::McpClient;
pub use error::{Error, ErrorKind};
pub use server::McpServer;
pub use source::McpToolSource;
pub use transport::{LineTransport, ServerCommand};
