use std::sync::Arc;

use fx_agent_model::{ModelProvider, ToolCallRequest, ToolCallResult};

use super::{Agent, DEFAULT_MAX_TOOL_TURNS};
use crate::model_client::ModelClient;
use crate::tool::{ToolSource, Toolbox};

/// [`Agent`] builder.
pub struct AgentBuilder {
    agent: Agent,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider and no
    /// tools.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            agent: Agent {
                model_client: ModelClient::new(provider),
                tools: Box::new(Toolbox::default()),
                system_prompt: None,
                temperature: None,
                max_tool_turns: DEFAULT_MAX_TOOL_TURNS,
                on_transcript: None,
                on_tool_call: None,
                on_tool_result: None,
            },
        }
    }

    /// Sets where the tools offered to the model come from.
    #[inline]
    pub fn with_tool_source<S: ToolSource + 'static>(
        mut self,
        tools: S,
    ) -> Self {
        self.agent.tools = Box::new(tools);
        self
    }

    /// Sets the system prompt for every conversation.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.agent.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the sampling temperature.
    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.agent.temperature = Some(temperature);
        self
    }

    /// Sets how many rounds of tool calls one user turn may trigger.
    #[inline]
    pub fn with_max_tool_turns(mut self, max_tool_turns: usize) -> Self {
        self.agent.max_tool_turns = max_tool_turns;
        self
    }

    /// Attaches a callback invoked with every text delta from the model.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.agent.on_transcript = Some(Arc::new(on_transcript));
        self
    }

    /// Attaches a callback invoked before a tool is called.
    #[inline]
    pub fn on_tool_call(
        mut self,
        on_tool_call: impl Fn(&ToolCallRequest) + Send + Sync + 'static,
    ) -> Self {
        self.agent.on_tool_call = Some(Box::new(on_tool_call));
        self
    }

    /// Attaches a callback invoked after a tool call finished.
    #[inline]
    pub fn on_tool_result(
        mut self,
        on_tool_result: impl Fn(&ToolCallResult) + Send + Sync + 'static,
    ) -> Self {
        self.agent.on_tool_result = Some(Box::new(on_tool_result));
        self
    }

    /// Builds the agent.
    #[inline]
    pub fn build(self) -> Agent {
        self.agent
    }
}
