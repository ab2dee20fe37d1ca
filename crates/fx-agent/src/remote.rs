use std::sync::Arc;

use fx_agent_core::tool::ToolSource;
use fx_agent_core::{Agent, AgentBuilder, AgentError, AgentOutcome};
use fx_agent_mcp::{
    Error as McpError, LineTransport, McpToolSource, ServerCommand,
};
use fx_agent_model::ModelTool;

/// An agent whose tools live in an MCP server.
///
/// The tools are discovered once, when the session connects. Dropping the
/// session kills a spawned server; [`close`](Self::close) lets it exit on
/// its own.
pub struct RemoteSession {
    agent: Agent,
    tools: Arc<McpToolSource>,
}

impl RemoteSession {
    /// Spawns the server described by `command` and connects to it.
    pub async fn spawn(
        agent_builder: AgentBuilder,
        command: &ServerCommand,
    ) -> Result<Self, McpError> {
        info!("starting tool server `{command}`");
        let transport = LineTransport::spawn(command)?;
        Self::connect(agent_builder, transport).await
    }

    /// Connects to a server over `transport` and builds the agent around
    /// its tools.
    pub async fn connect(
        agent_builder: AgentBuilder,
        transport: LineTransport,
    ) -> Result<Self, McpError> {
        let tools = Arc::new(McpToolSource::connect(transport).await?);
        let agent = agent_builder.with_tool_source(Arc::clone(&tools)).build();
        Ok(Self { agent, tools })
    }

    /// Returns the tools the server offers.
    #[inline]
    pub fn tools(&self) -> Vec<ModelTool> {
        self.tools.definitions()
    }

    /// Returns the process id of a spawned server.
    #[inline]
    pub fn server_pid(&self) -> Option<u32> {
        self.tools.server_pid()
    }

    /// Runs `prompt` in a fresh conversation.
    #[inline]
    pub async fn run(&self, prompt: &str) -> Result<AgentOutcome, AgentError> {
        self.agent.run(prompt).await
    }

    /// Ends the session with the server and waits for it to exit.
    pub async fn close(self) -> Result<(), McpError> {
        let Self { agent, tools } = self;
        drop(agent);
        match Arc::try_unwrap(tools) {
            Ok(tools) => tools.close().await,
            Err(_) => {
                warn!("the tool source is still shared, not closing it");
                Ok(())
            }
        }
    }
}
