use std::future::poll_fn;
use std::pin::pin;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use fx_agent_gemini_model::{GeminiConfigBuilder, GeminiProvider};
use fx_agent_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
};
use serde_json::Value;
use tokio::net::TcpListener;

#[derive(Clone, Debug, Default)]
struct Seen {
    uri: String,
    api_key: Option<String>,
    body: Option<Value>,
}

/// Starts a fake Gemini API answering every request with `status`,
/// `content_type` and `body`.
async fn serve(
    status: StatusCode,
    content_type: &'static str,
    body: &'static str,
) -> (String, Arc<Mutex<Seen>>) {
    let seen = Arc::new(Mutex::new(Seen::default()));
    let app = Router::new()
        .fallback(
            move |State(seen): State<Arc<Mutex<Seen>>>,
                  uri: Uri,
                  headers: HeaderMap,
                  request_body: String| async move {
                *seen.lock().unwrap() = Seen {
                    uri: uri.to_string(),
                    api_key: headers
                        .get("x-goog-api-key")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned),
                    body: serde_json::from_str(&request_body).ok(),
                };
                let resp: Response =
                    (status, [(header::CONTENT_TYPE, content_type)], body)
                        .into_response();
                resp
            },
        )
        .with_state(Arc::clone(&seen));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/v1beta"), seen)
}

fn provider(base_url: String) -> GeminiProvider {
    GeminiProvider::new(
        GeminiConfigBuilder::with_api_key("test-key")
            .with_model("gemini-test")
            .with_base_url(base_url)
            .build(),
    )
}

fn hello() -> ModelRequest {
    ModelRequest {
        messages: vec![ModelMessage::User("1 USD in EUR?".to_owned())],
        temperature: Some(0.0),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_streamed_answer() {
    let (base_url, seen) = serve(
        StatusCode::OK,
        "text/event-stream; charset=utf-8",
        "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"About 0.9 EUR.\"}]},\"finishReason\":\"STOP\"}],\"responseId\":\"abc\"}\r\n\r\n",
    )
    .await;

    let resp = provider(base_url).send_request(&hello()).await.unwrap();
    let mut resp = pin!(resp);
    let mut events = Vec::new();
    while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
        .await
        .unwrap()
    {
        events.push(event);
    }
    assert_eq!(
        events,
        vec![
            ModelResponseEvent::MessageDelta("About 0.9 EUR.".to_owned()),
            ModelResponseEvent::Completed(ModelFinishReason::Stop),
        ]
    );
    assert_eq!(resp.make_opaque_message().unwrap().id(), "abc");

    let seen = seen.lock().unwrap().clone();
    assert_eq!(
        seen.uri,
        "/v1beta/models/gemini-test:streamGenerateContent?alt=sse"
    );
    assert_eq!(seen.api_key.as_deref(), Some("test-key"));
    let body = seen.body.unwrap();
    assert_eq!(body["contents"][0]["parts"][0]["text"], "1 USD in EUR?");
    assert_eq!(body["generationConfig"]["temperature"], 0.0);
}

#[tokio::test]
async fn test_rate_limited() {
    let (base_url, _) = serve(
        StatusCode::TOO_MANY_REQUESTS,
        "application/json",
        r#"{"error":{"code":429,"message":"Resource has been exhausted.","status":"RESOURCE_EXHAUSTED"}}"#,
    )
    .await;

    let Err(err) = provider(base_url).send_request(&hello()).await else {
        panic!("expected an error");
    };
    assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
    assert!(err.message().contains("Resource has been exhausted."));
}

#[tokio::test]
async fn test_bad_request() {
    let (base_url, _) = serve(
        StatusCode::BAD_REQUEST,
        "application/json",
        r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#,
    )
    .await;

    let Err(err) = provider(base_url).send_request(&hello()).await else {
        panic!("expected an error");
    };
    assert_eq!(err.kind(), ErrorKind::Other);
    assert!(err.message().contains("API key not valid."));
}

#[tokio::test]
async fn test_unexpected_content_type() {
    let (base_url, _) =
        serve(StatusCode::OK, "application/json", "{\"candidates\":[]}").await;

    let Err(err) = provider(base_url).send_request(&hello()).await else {
        panic!("expected an error");
    };
    assert_eq!(err.kind(), ErrorKind::Other);
    assert!(err.message().contains("content type"));
}
