use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use fx_agent_model::ModelTool;
use serde_json::Value;

use crate::tool::object::{DynTool, Erased};
use crate::tool::{Error, Tool, ToolResult, ToolSource};

/// A [`ToolSource`] made of tools implemented in this process.
#[derive(Clone, Default)]
pub struct Toolbox {
    tools: HashMap<String, Arc<dyn DynTool>>,
}

impl Toolbox {
    /// Registers a tool, replacing any tool with the same name.
    pub fn add_tool<T: Tool>(&mut self, tool: T) {
        let name = tool.name().to_owned();
        if self.tools.insert(name, Arc::new(Erased(tool))).is_some() {
            warn!("a tool with the same name has been replaced");
        }
    }

    /// Registers a tool and returns the toolbox, for chaining.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.add_tool(tool);
        self
    }

    /// Returns the number of registered tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tool is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolSource for Toolbox {
    fn definitions(&self) -> Vec<ModelTool> {
        let mut definitions: Vec<_> =
            self.tools.values().map(|tool| tool.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    async fn call(&self, name: &str, arguments: Value) -> ToolResult {
        let Some(tool) = self.tools.get(name) else {
            warn!("tool not found: {name}");
            return Err(Error::not_found()
                .with_reason(format!("Tool not found: {name}")));
        };
        trace!("calling {name} with args: {arguments}");
        Arc::clone(tool).call(arguments).await
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;

    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::tool::ErrorKind;

    #[derive(Deserialize)]
    struct ShoutInput {
        text: String,
    }

    struct ShoutTool {
        schema: Value,
    }

    impl ShoutTool {
        fn new() -> Self {
            Self {
                schema: json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"]
                }),
            }
        }
    }

    impl Tool for ShoutTool {
        type Input = ShoutInput;

        fn name(&self) -> &str {
            "shout"
        }

        fn description(&self) -> &str {
            "Upper-cases the text"
        }

        fn parameter_schema(&self) -> &Value {
            &self.schema
        }

        fn execute(
            &self,
            input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(Ok(input.text.to_uppercase()))
        }
    }

    #[tokio::test]
    async fn test_call_by_name() {
        let toolbox = Toolbox::default().with_tool(ShoutTool::new());
        assert_eq!(toolbox.len(), 1);

        let definitions = toolbox.definitions();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].name, "shout");
        assert_eq!(definitions[0].parameters["required"], json!(["text"]));

        let result = toolbox.call("shout", json!({ "text": "usd" })).await;
        assert_eq!(result.unwrap(), "USD");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let toolbox = Toolbox::default().with_tool(ShoutTool::new());
        let err = toolbox.call("whisper", json!({})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.reason().contains("whisper"));
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let toolbox = Toolbox::default().with_tool(ShoutTool::new());
        let err = toolbox.call("shout", json!({})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.reason().contains("text"));
    }
}
