use async_trait::async_trait;
use fx_agent_core::tool::{Error as ToolError, ToolResult, ToolSource};
use fx_agent_model::ModelTool;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{Error, LineTransport, McpClient};

/// A [`ToolSource`] backed by the tools of an MCP server.
///
/// The tool list is fetched once, when the source is created.
pub struct McpToolSource {
    client: Mutex<McpClient>,
    definitions: Vec<ModelTool>,
    server_pid: Option<u32>,
}

impl McpToolSource {
    /// Connects over `transport` and discovers the server's tools.
    pub async fn connect(transport: LineTransport) -> Result<Self, Error> {
        let client = McpClient::connect(transport).await?;
        Self::from_client(client).await
    }

    /// Discovers the tools of an already connected client.
    pub async fn from_client(mut client: McpClient) -> Result<Self, Error> {
        let definitions = client
            .list_tools()
            .await?
            .into_iter()
            .map(|tool| ModelTool {
                description: tool
                    .description
                    .unwrap_or_else(|| format!("MCP tool: {}", tool.name)),
                name: tool.name,
                parameters: tool.input_schema,
            })
            .collect();
        Ok(Self {
            server_pid: client.server_pid(),
            client: Mutex::new(client),
            definitions,
        })
    }

    /// Returns the process id of a spawned server.
    #[inline]
    pub fn server_pid(&self) -> Option<u32> {
        self.server_pid
    }

    /// Ends the session with the server.
    #[inline]
    pub async fn close(self) -> Result<(), Error> {
        self.client.into_inner().close().await
    }
}

#[async_trait]
impl ToolSource for McpToolSource {
    fn definitions(&self) -> Vec<ModelTool> {
        self.definitions.clone()
    }

    async fn call(&self, name: &str, arguments: Value) -> ToolResult {
        if !self.definitions.iter().any(|tool| tool.name == name) {
            warn!("tool not found: {name}");
            return Err(ToolError::not_found()
                .with_reason(format!("Tool not found: {name}")));
        }

        let mut client = self.client.lock().await;
        match client.call_tool(name, arguments).await {
            Ok(result) if result.is_error => {
                let reason = result
                    .first_text()
                    .unwrap_or("The tool reported an error")
                    .to_owned();
                Err(ToolError::execution_error().with_reason(reason))
            }
            Ok(result) => Ok(result.joined_text()),
            Err(err) => {
                error!("{name} failed: {err}");
                Err(ToolError::execution_error()
                    .with_reason(format!("Tool execution failed: {err}")))
            }
        }
    }
}
