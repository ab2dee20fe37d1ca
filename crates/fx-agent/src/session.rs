use fx_agent_core::conversation::Conversation;
use fx_agent_core::tool::Toolbox;
use fx_agent_core::{Agent, AgentBuilder, AgentError, AgentOutcome};
use fx_agent_exchange::{ConvertCurrencyTool, DEFAULT_BASE_URL, RateClient};
use fx_agent_model::{ModelProvider, ToolCallRequest, ToolCallResult};

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
    rate_client: RateClient,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        Self {
            agent_builder: AgentBuilder::with_model_provider(provider),
            rate_client: RateClient::new(DEFAULT_BASE_URL),
        }
    }

    /// Sets the rate service used by the conversion tool.
    #[inline]
    pub fn with_rate_client(mut self, rate_client: RateClient) -> Self {
        self.rate_client = rate_client;
        self
    }

    /// Sets the system prompt for the agent.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.agent_builder = self.agent_builder.with_system_prompt(prompt);
        self
    }

    /// Sets how many rounds of tool calls one message may trigger.
    #[inline]
    pub fn with_max_tool_turns(mut self, max_tool_turns: usize) -> Self {
        self.agent_builder =
            self.agent_builder.with_max_tool_turns(max_tool_turns);
        self
    }

    /// Attaches a callback to be invoked when a transcript is generated.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_transcript(on_transcript);
        self
    }

    /// Attaches a callback to be invoked before a tool runs.
    #[inline]
    pub fn on_tool_call(
        mut self,
        on_tool_call: impl Fn(&ToolCallRequest) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_tool_call(on_tool_call);
        self
    }

    /// Attaches a callback to be invoked after a tool ran.
    #[inline]
    pub fn on_tool_result(
        mut self,
        on_tool_result: impl Fn(&ToolCallResult) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_tool_result(on_tool_result);
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        let toolbox = Toolbox::default()
            .with_tool(ConvertCurrencyTool::new(self.rate_client));
        let agent = self.agent_builder.with_tool_source(toolbox).build();
        let conversation = agent.new_conversation();

        Session {
            agent,
            conversation,
        }
    }
}

/// A chat session with the currency conversion tool at hand.
///
/// The session keeps the whole conversation, so every message is answered
/// with the earlier ones in mind.
pub struct Session {
    agent: Agent,
    conversation: Conversation,
}

impl Session {
    /// Sends a message and waits until the agent is done with it.
    ///
    /// A failed message leaves no trace in the conversation.
    #[inline]
    pub async fn send_message(
        &mut self,
        message: &str,
    ) -> Result<AgentOutcome, AgentError> {
        self.agent.respond(&mut self.conversation, message).await
    }

    /// Returns the conversation so far.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }
}
