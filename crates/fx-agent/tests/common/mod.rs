#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::Query;
use axum::routing::get;
use fx_agent_model::{ToolCallRequest, ToolCallResult};
use fx_agent_test_model::PresetEvent;
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Starts a rate service quoting 1 USD = 0.9 EUR for any query, and
/// returns its base URL.
pub async fn serve_rates() -> String {
    let app = Router::new().route(
        "/v1/latest",
        get(|Query(query): Query<Vec<(String, String)>>| async move {
            let symbol = query
                .iter()
                .find(|(key, _)| key == "symbols")
                .map(|(_, value)| value.clone())
                .unwrap_or_default();
            axum::Json(json!({
                "amount": 1.0,
                "base": "USD",
                "date": "2024-01-01",
                "rates": { (symbol): 0.9 }
            }))
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/v1")
}

pub fn tool_call(id: &str, name: &str, arguments: Value) -> PresetEvent {
    PresetEvent::ToolCall(ToolCallRequest {
        id: id.to_owned(),
        name: name.to_owned(),
        arguments: Some(arguments),
    })
}

pub type Results = Arc<Mutex<Vec<ToolCallResult>>>;

/// Returns an `on_tool_result` callback and where it records results.
pub fn record_results() -> (impl Fn(&ToolCallResult) + Send + Sync, Results)
{
    let results = Results::default();
    let callback = {
        let results = Arc::clone(&results);
        move |result: &ToolCallResult| {
            results.lock().unwrap().push(result.clone());
        }
    };
    (callback, results)
}
