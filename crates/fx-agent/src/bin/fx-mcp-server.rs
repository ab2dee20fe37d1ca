//! Serves the currency conversion tool over MCP on stdin and stdout.
//!
//! Logs go to stderr, stdout carries nothing but protocol messages.

#[macro_use]
extern crate tracing;

use std::process::ExitCode;

use fx_agent::console;
use fx_agent::{AppConfig, SERVER_NAME, exchange_server};
use fx_agent_mcp::LineTransport;
use tokio::io::{self, BufReader};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    console::init_tracing();
    console::load_dotenv();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let server = exchange_server(config.rate_client());
    let mut transport =
        LineTransport::new(BufReader::new(io::stdin()), io::stdout());
    info!("{SERVER_NAME} using rates from {}", config.rates_base_url());

    match server.serve(&mut transport).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
