//! Chat with Gemini, which converts currencies with a local tool when
//! asked to.

#[macro_use]
extern crate tracing;

use std::process::ExitCode;

use fx_agent::console::{self, Activity, Input};
use fx_agent::{AppConfig, SessionBuilder};
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
    let gemini_config = match config.gemini_config() {
        Ok(gemini_config) => gemini_config,
        Err(err) => {
            eprintln!("❌ {err}");
            return ExitCode::FAILURE;
        }
    };

    let (mut activity, reporter) = Activity::new();
    let mut session =
        SessionBuilder::with_model_provider(GeminiProvider::new(gemini_config))
            .with_rate_client(config.rate_client())
            .with_max_tool_turns(config.max_tool_turns())
            .on_transcript(reporter.transcript())
            .on_tool_call(reporter.tool_call())
            .on_tool_result(reporter.tool_result())
            .build();

    println!("💬 Start chatting with Gemini! Type 'exit' to end the session.");
    let mut input = Input::stdin();
    while let Some(line) = input.read_line("You: ").await {
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") {
            break;
        }
        if line.is_empty() {
            continue;
        }

        match activity.watch(session.send_message(line)).await {
            Ok(outcome) if outcome.exhausted => {
                console::print_error(format!(
                    "Maximum tool turns ({}) reached.",
                    outcome.tool_turns
                ));
            }
            Ok(_) => {}
            Err(err) => console::print_error(err),
        }
    }

    debug!("conversation ended with {} items", session.conversation().len());
    println!("👋 Ending chat session. Goodbye!");
    ExitCode::SUCCESS
}
