use fx_agent_core::tool::Toolbox;
use fx_agent_exchange::{ConvertCurrencyTool, RateClient};
use fx_agent_mcp::McpServer;

/// The name the tool server announces itself with.
pub const SERVER_NAME: &str = "fx-currency-converter";

/// Creates an MCP server offering currency conversion through
/// `rate_client`.
pub fn exchange_server(rate_client: RateClient) -> McpServer {
    let toolbox =
        Toolbox::default().with_tool(ConvertCurrencyTool::new(rate_client));
    McpServer::new(SERVER_NAME, env!("CARGO_PKG_VERSION"), toolbox)
}
