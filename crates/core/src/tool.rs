//! Tool call supports.
//!
//! A [`Tool`] is a typed, locally implemented function. Tools are gathered
//! into a [`Toolbox`], which is one implementation of [`ToolSource`], the
//! interface the agent loop dispatches through. Other crates provide
//! sources backed by something else, such as a remote tool server.

mod error;
mod object;
mod toolbox;

use std::sync::Arc;

use async_trait::async_trait;
use fx_agent_model::ModelTool;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use error::{Error, ErrorKind};
pub use toolbox::Toolbox;

/// The result of a tool call.
pub type ToolResult = Result<String, Error>;

/// A tool that can be called by the model.
///
/// Implementations of this trait should be stateless, and may not maintain any
/// internal state.
///
/// The tool can be context-aware, for example hold an HTTP client or a base
/// URL. Make the context an immutable state of the tool, set during
/// initialization, and clone what the returned future needs.
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    type Input: DeserializeOwned;

    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Returns the parameter schema of the tool.
    fn parameter_schema(&self) -> &Value;

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`,
    /// and the future should be cancellation safe.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}

/// A set of callable tools, as seen by the agent loop.
///
/// The loop asks for the definitions once per user turn and dispatches
/// every call request by name. Implementations turn every failure,
/// including an unknown name, into an [`Error`] rather than panicking.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Returns the descriptors offered to the model.
    fn definitions(&self) -> Vec<ModelTool>;

    /// Calls the tool named `name` with a JSON object of arguments.
    async fn call(&self, name: &str, arguments: Value) -> ToolResult;
}

#[async_trait]
impl<S: ToolSource + ?Sized> ToolSource for Box<S> {
    #[inline]
    fn definitions(&self) -> Vec<ModelTool> {
        (**self).definitions()
    }

    #[inline]
    async fn call(&self, name: &str, arguments: Value) -> ToolResult {
        (**self).call(name, arguments).await
    }
}

#[async_trait]
impl<S: ToolSource + ?Sized> ToolSource for Arc<S> {
    #[inline]
    fn definitions(&self) -> Vec<ModelTool> {
        (**self).definitions()
    }

    #[inline]
    async fn call(&self, name: &str, arguments: Value) -> ToolResult {
        (**self).call(name, arguments).await
    }
}
