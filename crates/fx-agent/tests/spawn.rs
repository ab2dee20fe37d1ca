mod common;

#[cfg(target_os = "linux")]
use std::time::Duration;

use fx_agent::RemoteSession;
use fx_agent::core::AgentBuilder;
use fx_agent_mcp::{ErrorKind, ServerCommand};
use fx_agent_test_model::{PresetResponse, TestModelProvider};
use serde_json::json;
#[cfg(target_os = "linux")]
use tokio::time::sleep;

use common::{serve_rates, tool_call};

async fn server_command() -> ServerCommand {
    ServerCommand::new(env!("CARGO_BIN_EXE_fx-mcp-server"))
        .env("FX_RATES_BASE_URL", serve_rates().await)
}

/// Returns `false` once the process has exited, reaped or not.
#[cfg(target_os = "linux")]
fn is_running(pid: u32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
        return false;
    };
    let state = stat
        .rsplit(')')
        .next()
        .and_then(|rest| rest.split_whitespace().next());
    !matches!(state, None | Some("Z") | Some("X"))
}

#[tokio::test]
async fn test_spawned_server_converts() {
    let mut provider = TestModelProvider::default();
    provider.add_user_input_step();
    provider.add_assistant_response_step(PresetResponse::with_events([
        tool_call(
            "call-1",
            "convert_exchange_rate",
            json!({ "base": "USD", "target": "EUR", "amount": 10 }),
        ),
    ]));
    provider.add_tool_results_step();
    provider.add_assistant_response_step(PresetResponse::text(
        "10 USD is 9 EUR.",
    ));

    let agent_builder = AgentBuilder::with_model_provider(provider);
    let session = RemoteSession::spawn(agent_builder, &server_command().await)
        .await
        .unwrap();
    let names: Vec<_> =
        session.tools().into_iter().map(|tool| tool.name).collect();
    assert_eq!(names, ["convert_exchange_rate"]);
    let pid = session.server_pid().unwrap();

    let outcome = session.run("How much is 10 USD in EUR?").await.unwrap();
    assert_eq!(outcome.response.transcript, "10 USD is 9 EUR.");
    assert_eq!(outcome.tool_turns, 1);

    session.close().await.unwrap();
    #[cfg(target_os = "linux")]
    assert!(!is_running(pid));
    #[cfg(not(target_os = "linux"))]
    let _ = pid;
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_dropped_session_kills_the_server() {
    let agent_builder =
        AgentBuilder::with_model_provider(TestModelProvider::default());
    let session = RemoteSession::spawn(agent_builder, &server_command().await)
        .await
        .unwrap();
    let pid = session.server_pid().unwrap();
    assert!(is_running(pid));

    drop(session);
    for _ in 0..100 {
        if !is_running(pid) {
            return;
        }
        sleep(Duration::from_millis(50)).await;
    }
    panic!("the server (pid {pid}) outlived its session");
}

#[tokio::test]
async fn test_missing_server_binary() {
    let agent_builder =
        AgentBuilder::with_model_provider(TestModelProvider::default());
    let command = ServerCommand::new("./no-such-fx-mcp-server");
    let Err(err) = RemoteSession::spawn(agent_builder, &command).await else {
        panic!("spawned a server that does not exist");
    };
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.to_string().contains("no-such-fx-mcp-server"));
}
