mod common;

use fx_agent::core::AgentBuilder;
use fx_agent::{RemoteSession, exchange_server};
use fx_agent_exchange::RateClient;
use fx_agent_mcp::LineTransport;
use fx_agent_model::ToolOutcome;
use fx_agent_test_model::{PresetResponse, TestModelProvider};
use serde_json::json;
use tokio::io::{BufReader, duplex, split};
use tokio::task::JoinHandle;

use common::{record_results, serve_rates, tool_call};

/// Runs the exchange server on one end of a pipe and returns the other.
async fn start_server() -> (LineTransport, JoinHandle<()>) {
    let server = exchange_server(RateClient::new(serve_rates().await));
    let (near, far) = duplex(8192);
    let handle = tokio::spawn(async move {
        let (reader, writer) = split(far);
        let mut transport =
            LineTransport::new(BufReader::new(reader), writer);
        server.serve(&mut transport).await.unwrap();
    });
    let (reader, writer) = split(near);
    (LineTransport::new(BufReader::new(reader), writer), handle)
}

#[tokio::test]
async fn test_discovery() {
    let (transport, handle) = start_server().await;
    let agent_builder =
        AgentBuilder::with_model_provider(TestModelProvider::default());
    let session = RemoteSession::connect(agent_builder, transport)
        .await
        .unwrap();

    let tools = session.tools();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "convert_exchange_rate");
    let required = tools[0].parameters["required"].as_array().unwrap();
    assert_eq!(required.len(), 3);
    for field in ["base", "target", "amount"] {
        assert!(required.contains(&json!(field)));
    }

    session.close().await.unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_remote_conversion() {
    let mut provider = TestModelProvider::default();
    provider.add_user_input_step();
    provider.add_assistant_response_step(PresetResponse::with_events([
        tool_call(
            "call-1",
            "convert_exchange_rate",
            json!({ "base": "USD", "target": "EUR", "amount": 100 }),
        ),
    ]));
    provider.add_tool_results_step();
    provider.add_assistant_response_step(PresetResponse::text(
        "100 USD is 90 EUR.",
    ));

    let (on_tool_result, results) = record_results();
    let agent_builder = AgentBuilder::with_model_provider(provider)
        .with_temperature(0.0)
        .on_tool_result(on_tool_result);
    let (transport, handle) = start_server().await;
    let session = RemoteSession::connect(agent_builder, transport)
        .await
        .unwrap();

    let outcome = session.run("How much is 100 USD in EUR?").await.unwrap();
    assert_eq!(outcome.response.transcript, "100 USD is 90 EUR.");
    assert_eq!(outcome.tool_turns, 1);
    assert_eq!(
        results.lock().unwrap()[0].outcome,
        ToolOutcome::Success(
            "100 USD = 90.00 EUR (Rate: 1 USD = 0.9 EUR, as of 2024-01-01)"
                .to_owned()
        )
    );

    session.close().await.unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_turn_cap_over_the_wire() {
    let mut provider = TestModelProvider::default();
    provider.add_user_input_step();
    for id in ["1", "2"] {
        provider.add_assistant_response_step(PresetResponse::with_events([
            tool_call(
                id,
                "convert_exchange_rate",
                json!({ "base": "USD", "target": "JPY", "amount": 1 }),
            ),
        ]));
        provider.add_tool_results_step();
    }
    provider.add_assistant_response_step(PresetResponse::with_events([
        tool_call(
            "3",
            "convert_exchange_rate",
            json!({ "base": "USD", "target": "JPY", "amount": 1 }),
        ),
    ]));

    let (on_tool_result, results) = record_results();
    let agent_builder = AgentBuilder::with_model_provider(provider)
        .with_max_tool_turns(2)
        .on_tool_result(on_tool_result);
    let (transport, handle) = start_server().await;
    let session = RemoteSession::connect(agent_builder, transport)
        .await
        .unwrap();

    let outcome = session.run("Keep converting").await.unwrap();
    assert!(outcome.exhausted);
    assert_eq!(outcome.tool_turns, 2);
    assert_eq!(outcome.response.tool_calls[0].id, "3");
    assert_eq!(results.lock().unwrap().len(), 2);

    session.close().await.unwrap();
    handle.await.unwrap();
}
