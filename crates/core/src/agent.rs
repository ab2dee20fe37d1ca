mod builder;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use fx_agent_model::{
    ModelProviderError, ModelRequest, ModelTool, ToolCallRequest,
    ToolCallResult, ToolOutcome,
};

use crate::conversation::Conversation;
use crate::model_client::{ModelClient, ModelClientResponse};
use crate::tool::ToolSource;
pub use builder::AgentBuilder;

/// How many rounds of tool calls one user turn may trigger by default.
pub const DEFAULT_MAX_TOOL_TURNS: usize = 5;

type TranscriptFn = Arc<dyn Fn(&str) + Send + Sync>;
type ToolCallFn = Box<dyn Fn(&ToolCallRequest) + Send + Sync>;
type ToolResultFn = Box<dyn Fn(&ToolCallResult) + Send + Sync>;

/// An agent that mediates between a model and a set of tools.
///
/// For every user turn, the agent asks the model for a completion, runs the
/// tool calls it requests, feeds the results back and asks again, until the
/// model answers without calling tools or the tool turn budget is spent.
/// Tool failures never end the turn, they are handed back to the model as
/// error results.
pub struct Agent {
    model_client: ModelClient,
    tools: Box<dyn ToolSource>,
    system_prompt: Option<String>,
    temperature: Option<f32>,
    max_tool_turns: usize,
    on_transcript: Option<TranscriptFn>,
    on_tool_call: Option<ToolCallFn>,
    on_tool_result: Option<ToolResultFn>,
}

/// What a user turn ended with.
#[derive(Clone, Debug)]
pub struct AgentOutcome {
    /// The last completion. If `exhausted` is set, its tool calls were
    /// never executed.
    pub response: ModelClientResponse,
    /// How many rounds of tool calls were executed.
    pub tool_turns: usize,
    /// Whether the loop stopped because the tool turn budget ran out.
    pub exhausted: bool,
}

/// Errors that end a user turn.
#[derive(Debug)]
pub enum AgentError {
    /// The input was empty or only whitespace. Nothing was sent.
    EmptyPrompt,
    /// The model provider failed.
    Model(Box<dyn ModelProviderError>),
}

impl Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentError::EmptyPrompt => write!(f, "the prompt is empty"),
            AgentError::Model(err) => {
                write!(f, "model request failed ({}): {err}", err.kind())
            }
        }
    }
}

impl StdError for AgentError {}

impl Agent {
    /// Creates an empty conversation, seeded with the system prompt if
    /// there is one.
    pub fn new_conversation(&self) -> Conversation {
        let mut conversation = Conversation::default();
        if let Some(prompt) = &self.system_prompt {
            conversation.push_system(prompt);
        }
        conversation
    }

    /// Runs a single prompt in a fresh conversation.
    pub async fn run(&self, prompt: &str) -> Result<AgentOutcome, AgentError> {
        let mut conversation = self.new_conversation();
        self.respond(&mut conversation, prompt).await
    }

    /// Adds a user turn to `conversation` and drives the tool-calling loop
    /// until the model stops requesting tools or the budget is spent.
    ///
    /// If this returns an error, `conversation` is left as it was.
    pub async fn respond(
        &self,
        conversation: &mut Conversation,
        input: &str,
    ) -> Result<AgentOutcome, AgentError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AgentError::EmptyPrompt);
        }

        let checkpoint = conversation.len();
        let result = self.drive(conversation, input).await;
        if result.is_err() {
            conversation.truncate(checkpoint);
        }
        result
    }

    async fn drive(
        &self,
        conversation: &mut Conversation,
        input: &str,
    ) -> Result<AgentOutcome, AgentError> {
        conversation.push_user(input);
        let tools = self.tools.definitions();
        debug!("offering {} tools", tools.len());

        let mut response = self.complete(conversation, &tools).await?;
        let mut tool_turns = 0;
        while !response.tool_calls.is_empty()
            && tool_turns < self.max_tool_turns
        {
            tool_turns += 1;
            let results = self.run_tool_calls(&response.tool_calls).await;
            info!("tool turn {tool_turns}: {} results", results.len());
            conversation.push_tool_results(results);
            response = self.complete(conversation, &tools).await?;
        }

        let exhausted = !response.tool_calls.is_empty();
        if exhausted {
            warn!(
                "maximum tool turns ({}) reached, {} calls left unresolved",
                self.max_tool_turns,
                response.tool_calls.len()
            );
            // Close the dangling calls so the history stays valid for the
            // next user turn.
            let results = response
                .tool_calls
                .iter()
                .map(|req| ToolCallResult {
                    id: req.id.clone(),
                    name: req.name.clone(),
                    outcome: ToolOutcome::Error(
                        "not executed: maximum tool turns reached".to_owned(),
                    ),
                })
                .collect();
            conversation.push_tool_results(results);
        }

        Ok(AgentOutcome {
            response,
            tool_turns,
            exhausted,
        })
    }

    async fn complete(
        &self,
        conversation: &mut Conversation,
        tools: &[ModelTool],
    ) -> Result<ModelClientResponse, AgentError> {
        let request = ModelRequest {
            messages: conversation.messages(),
            tools: tools.to_vec(),
            temperature: self.temperature,
        };
        let on_transcript = self.on_transcript.clone();
        let response = self
            .model_client
            .send_request(request, move |delta| {
                if let Some(on_transcript) = &on_transcript {
                    on_transcript(&delta);
                }
            })
            .await
            .map_err(AgentError::Model)?;
        conversation.push_model_response(&response);
        Ok(response)
    }

    /// Runs every requested call in order. Never fails, every problem
    /// becomes an error outcome.
    async fn run_tool_calls(
        &self,
        requests: &[ToolCallRequest],
    ) -> Vec<ToolCallResult> {
        let mut results = Vec::with_capacity(requests.len());
        for req in requests {
            if let Some(on_tool_call) = &self.on_tool_call {
                on_tool_call(req);
            }
            let arguments = req.arguments_or_empty();
            debug!("calling tool {} ({}) with {arguments}", req.name, req.id);
            let outcome = match self.tools.call(&req.name, arguments).await {
                Ok(result) => ToolOutcome::Success(result),
                Err(err) => {
                    warn!("tool {} failed: {err}", req.name);
                    ToolOutcome::Error(err.reason().into_owned())
                }
            };
            let result = ToolCallResult {
                id: req.id.clone(),
                name: req.name.clone(),
                outcome,
            };
            if let Some(on_tool_result) = &self.on_tool_result {
                on_tool_result(&result);
            }
            results.push(result);
        }
        results
    }
}
