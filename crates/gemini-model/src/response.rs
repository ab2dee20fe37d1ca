use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll, ready};

use fx_agent_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    OpaqueMessage, ToolCallRequest,
};
use pin_project_lite::pin_project;

use crate::Error;
use crate::io::Sse;
use crate::proto::{Content, GenerateContentResponse, Part};

/// Finish reasons meaning the answer was withheld.
const MODERATED_FINISH_REASONS: &[&str] =
    &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

/// Source of history ids for responses the server gave no id to.
static NEXT_LOCAL_ID: AtomicU64 = AtomicU64::new(0);

struct PartialState {
    sse: Sse,
    id: Option<String>,
    content: Content,
    received_chunks: usize,
    call_count: usize,
    // Events decoded from a chunk but not handed out yet. A single chunk
    // may carry several parts.
    pending_events: VecDeque<ModelResponseEvent>,
    completed: bool,
}

impl PartialState {
    #[inline]
    fn finish(self) -> Option<(String, Content)> {
        if self.content.parts.is_empty() {
            return None;
        }
        let id = self.id.unwrap_or_else(|| {
            let n = NEXT_LOCAL_ID.fetch_add(1, Ordering::Relaxed);
            format!("local:{n}")
        });
        Some((id, self.content))
    }

    fn push_part(&mut self, part: Part) {
        if let Some(function_call) = &part.function_call {
            let id = function_call.id.clone().unwrap_or_else(|| {
                let prefix = self.id.as_deref().unwrap_or("call");
                format!("{prefix}:{}", self.call_count)
            });
            self.call_count += 1;
            self.pending_events.push_back(ModelResponseEvent::ToolCall(
                ToolCallRequest {
                    id,
                    name: function_call.name.clone(),
                    arguments: function_call.args.clone(),
                },
            ));
        } else if part.thought != Some(true) {
            match &part.text {
                Some(text) if !text.is_empty() => {
                    self.pending_events.push_back(
                        ModelResponseEvent::MessageDelta(text.clone()),
                    );
                }
                _ => {}
            }
        }
        self.content.push_part(part);
    }

    fn complete(&mut self) {
        self.completed = true;
        let reason = if self.call_count > 0 {
            ModelFinishReason::ToolCalls
        } else {
            ModelFinishReason::Stop
        };
        self.pending_events
            .push_back(ModelResponseEvent::Completed(reason));
    }
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct GeminiResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
        full_msg: Option<(String, Content)>,
    }
}

impl GeminiResponse {
    #[inline]
    pub(crate) fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            id: None,
            content: Content {
                role: Some("model".to_owned()),
                parts: Vec::new(),
            },
            received_chunks: 0,
            call_count: 0,
            pending_events: Default::default(),
            completed: false,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
            full_msg: None,
        }
    }
}

impl ModelResponse for GeminiResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, partial_state)) => {
                    *this.next_event_fut = None;
                    *this.full_msg = partial_state.finish();
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        self.full_msg
            .as_ref()
            .map(|(id, content)| OpaqueMessage::new(id, content.clone()))
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    loop {
        if let Some(event) = partial_state.pending_events.pop_front() {
            return Ok((Some(event), partial_state));
        }
        if partial_state.completed {
            return Ok((None, partial_state));
        }

        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => {
                if partial_state.received_chunks == 0 {
                    return Err(Error::new(
                        "the response stream is empty",
                        ErrorKind::Other,
                    ));
                }
                // The server ended the stream without a finish reason.
                partial_state.complete();
                continue;
            }
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got sse event: {sse_event}");
        partial_state.received_chunks += 1;

        let chunk =
            serde_json::from_str::<GenerateContentResponse>(&sse_event)
                .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        if let Some(reason) =
            chunk.prompt_feedback.and_then(|feedback| feedback.block_reason)
        {
            return Err(Error::new(
                format!("prompt blocked: {reason}"),
                ErrorKind::Moderated,
            ));
        }
        if partial_state.id.is_none() {
            partial_state.id = chunk.response_id;
        }

        let Some(candidate) = chunk.candidates.into_iter().next() else {
            continue;
        };
        for part in candidate.content.into_iter().flat_map(|c| c.parts) {
            partial_state.push_part(part);
        }
        if let Some(reason) = candidate.finish_reason {
            if MODERATED_FINISH_REASONS.contains(&reason.as_str()) {
                return Err(Error::new(
                    format!("response blocked: {reason}"),
                    ErrorKind::Moderated,
                ));
            }
            debug!("finished with {reason}");
            partial_state.complete();
        }
    }
}
