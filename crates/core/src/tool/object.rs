use std::future::ready;
use std::pin::Pin;
use std::sync::Arc;

use fx_agent_model::ModelTool;
use serde_json::Value;
use tracing::Instrument;

use super::{Error, Tool, ToolResult};

pub(crate) type ToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;

/// A [`Tool`] with its input type erased, called with raw JSON arguments.
pub(crate) trait DynTool: Send + Sync + 'static {
    fn definition(&self) -> ModelTool;

    fn call(self: Arc<Self>, arguments: Value) -> ToolFuture;
}

pub(crate) struct Erased<T>(pub T);

impl<T: Tool> DynTool for Erased<T> {
    fn definition(&self) -> ModelTool {
        let Self(tool) = self;
        ModelTool {
            name: tool.name().to_owned(),
            description: tool.description().to_owned(),
            parameters: tool.parameter_schema().clone(),
        }
    }

    fn call(self: Arc<Self>, arguments: Value) -> ToolFuture {
        let Self(tool) = &*self;
        match serde_json::from_value::<T::Input>(arguments) {
            Ok(input) => {
                let span = debug_span!("tool execute", name = tool.name());
                Box::pin(tool.execute(input).instrument(span))
            }
            Err(err) => Box::pin(ready(Err(Error::invalid_input()
                .with_reason(format!("Invalid arguments: {err}"))))),
        }
    }
}
