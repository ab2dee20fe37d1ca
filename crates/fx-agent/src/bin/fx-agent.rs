//! Answers one prompt with the tools of a spawned `fx-mcp-server`.
//!
//! The prompt is taken from the arguments, or read from stdin if there are
//! none.

#[macro_use]
extern crate tracing;

use std::env;
use std::process::ExitCode;

use fx_agent::console::{self, Activity, Input};
use fx_agent::core::AgentBuilder;
use fx_agent::{AppConfig, RemoteSession};
use fx_agent_gemini_model::GeminiProvider;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    console::init_tracing();
    console::load_dotenv();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("❌ {err}");
            return ExitCode::FAILURE;
        }
    };
    let (gemini_config, command) =
        match config.gemini_config().and_then(|gemini_config| {
            Ok((gemini_config, config.server_command()?))
        }) {
            Ok(settings) => settings,
            Err(err) => {
                eprintln!("❌ {err}");
                return ExitCode::FAILURE;
            }
        };

    let args: Vec<_> = env::args().skip(1).collect();
    let prompt = if args.is_empty() {
        Input::stdin()
            .read_line("💬 Please enter your prompt: ")
            .await
            .unwrap_or_default()
    } else {
        args.join(" ")
    };
    let prompt = prompt.trim();
    if prompt.is_empty() {
        println!("⚠️ No prompt provided. Exiting.");
        return ExitCode::SUCCESS;
    }

    let (mut activity, reporter) = Activity::new();
    let agent_builder =
        AgentBuilder::with_model_provider(GeminiProvider::new(gemini_config))
            .with_temperature(0.0)
            .with_max_tool_turns(config.max_tool_turns())
            .on_tool_call(reporter.tool_call())
            .on_tool_result(reporter.tool_result());
    let session = match RemoteSession::spawn(agent_builder, &command).await {
        Ok(session) => session,
        Err(err) => {
            eprintln!("❌ Cannot use the tool server `{command}`: {err}");
            return ExitCode::FAILURE;
        }
    };
    let tool_names: Vec<_> =
        session.tools().into_iter().map(|tool| tool.name).collect();
    info!("discovered tools: {}", tool_names.join(", "));

    println!("Running agent loop with prompt: {prompt}");
    let result = activity.watch(session.run(prompt)).await;
    if let Err(err) = session.close().await {
        warn!("failed to shut down the tool server: {err}");
    }

    match result {
        Ok(outcome) => {
            if outcome.exhausted {
                println!(
                    "Maximum tool turns ({}) reached. Exiting loop.",
                    outcome.tool_turns
                );
            }
            println!("🧠 AI Response:");
            println!("{}", outcome.response.transcript);
            ExitCode::SUCCESS
        }
        Err(err) => {
            console::print_error(err);
            ExitCode::FAILURE
        }
    }
}
