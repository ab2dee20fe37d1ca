//! A local fake model for testing purpose.

mod preset;

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use fx_agent_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
    OpaqueMessage,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    provider: TestModelProvider,
    request: ModelRequest,
    event_idx: usize,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl TestModelResponse {
    fn preset_events(&self) -> Result<&[PresetEvent], Error> {
        let step_idx = self.request.messages.len();
        let script = &self.provider.conversation_script;
        let Some(step) = script.get(step_idx) else {
            return Err(Error {
                message: "no enough steps",
                kind: ErrorKind::RateLimitExceeded,
            });
        };
        let ConversationStep::AssistantResponse(response) = step else {
            return Err(Error {
                message: "not an assistant response step",
                kind: ErrorKind::Moderated,
            });
        };

        // The history must follow the script up to this step.
        let follows_script =
            self.request.messages.iter().zip(script).all(|(msg, step)| {
                matches!(
                    (msg, step),
                    (ModelMessage::System(_), ConversationStep::SystemPrompt)
                        | (ModelMessage::User(_), ConversationStep::UserInput)
                        | (
                            ModelMessage::ToolResults(_),
                            ConversationStep::ToolResults
                        )
                        | (
                            ModelMessage::Opaque(_)
                                | ModelMessage::Assistant(_),
                            ConversationStep::AssistantResponse(_)
                        )
                )
            });
        if !follows_script {
            return Err(Error {
                message: "history does not follow the script",
                kind: ErrorKind::Other,
            });
        }
        Ok(&response.events)
    }
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };

        if let Some(sleep) = &mut this.sleep {
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;

            let event = match this.preset_events() {
                Ok(events) => event_at(events, this.event_idx),
                Err(err) => return Poll::Ready(Err(err)),
            };
            this.event_idx += 1;
            return Poll::Ready(Ok(event));
        }
        this.sleep = Some(Box::pin(sleep(
            this.provider.delay.unwrap_or(Duration::from_millis(1)),
        )));
        Pin::new(this).poll_next_event(cx)
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        let step_idx = self.request.messages.len();
        let id = format!("msg:{step_idx}");
        Some(OpaqueMessage::new(id.clone(), id))
    }
}

/// Returns the event at `idx`, then a completion event, then `None` for
/// calls made after completion.
fn event_at(
    events: &[PresetEvent],
    idx: usize,
) -> Option<ModelResponseEvent> {
    if let Some(event) = events.get(idx) {
        return Some(match event {
            PresetEvent::MessageDelta(msg) => {
                ModelResponseEvent::MessageDelta(msg.clone())
            }
            PresetEvent::ToolCall(req) => {
                ModelResponseEvent::ToolCall(req.clone())
            }
        });
    }
    if idx > events.len() {
        return None;
    }
    let has_tool_call = events
        .iter()
        .any(|event| matches!(event, PresetEvent::ToolCall(_)));
    Some(ModelResponseEvent::Completed(if has_tool_call {
        ModelFinishReason::ToolCalls
    } else {
        ModelFinishReason::Stop
    }))
}

#[derive(Clone)]
enum ConversationStep {
    SystemPrompt,
    UserInput,
    ToolResults,
    AssistantResponse(PresetResponse),
}

/// A local fake model for testing purpose.
///
/// Before sending requests, set up the conversation script: what the history
/// should look like and how the model responds at each point. A request is
/// answered by the step at index `messages.len()`, which must be an assistant
/// response step, and the history must match the earlier steps. Otherwise
/// an error is returned.
///
/// Clones share the request counter, so a test can keep one clone around
/// to check how many requests reached the model.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    conversation_script: Vec<ConversationStep>,
    delay: Option<Duration>,
    request_count: Arc<AtomicUsize>,
}

impl TestModelProvider {
    #[inline]
    pub fn add_system_prompt_step(&mut self) {
        self.conversation_script.push(ConversationStep::SystemPrompt);
    }

    #[inline]
    pub fn add_user_input_step(&mut self) {
        self.conversation_script.push(ConversationStep::UserInput);
    }

    #[inline]
    pub fn add_tool_results_step(&mut self) {
        self.conversation_script.push(ConversationStep::ToolResults);
    }

    #[inline]
    pub fn add_assistant_response_step(&mut self, preset: PresetResponse) {
        self.conversation_script
            .push(ConversationStep::AssistantResponse(preset));
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns how many requests have been sent to this provider or any of
    /// its clones.
    #[inline]
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let resp = TestModelResponse {
            provider: self.clone(),
            request: req.clone(),
            event_idx: 0,
            sleep: None,
        };
        ready(Ok(resp))
    }
}
