use fx_agent_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use crate::RateClient;

/// Input of [`ConvertCurrencyTool`].
#[derive(Clone, Debug, Deserialize, JsonSchema)]
pub struct ConvertParameters {
    /// The currency to convert from.
    #[schemars(description = "Base currency")]
    pub base: String,
    /// The currency to convert to.
    #[schemars(description = "Target currency")]
    pub target: String,
    /// The amount in the base currency.
    #[schemars(
        description = "The amount to convert from the base currency to the target currency."
    )]
    pub amount: f64,
}

/// A tool converting an amount between two currencies at the latest rate.
pub struct ConvertCurrencyTool {
    client: RateClient,
    parameter_schema: Value,
}

impl ConvertCurrencyTool {
    /// The name the tool is offered to the model under.
    pub const NAME: &'static str = "convert_exchange_rate";

    /// Creates a tool backed by `client`.
    #[inline]
    pub fn new(client: RateClient) -> Self {
        Self {
            client,
            parameter_schema: parameter_schema(),
        }
    }
}

/// The schema of [`ConvertParameters`] without the root `title` and
/// `description`, which schemars takes from the Rust type.
fn parameter_schema() -> Value {
    let mut schema = schema_for!(ConvertParameters).to_value();
    if let Value::Object(root) = &mut schema {
        root.remove("title");
        root.remove("description");
    }
    schema
}

impl Tool for ConvertCurrencyTool {
    type Input = ConvertParameters;

    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Convert any currency based the latest exchange rate and convert a \
         specific amount between two currencies."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: ConvertParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        async move {
            match client.convert(&input.base, &input.target, input.amount).await
            {
                Ok(conversion) => Ok(conversion.to_string()),
                Err(err) => {
                    warn!("conversion failed: {err}");
                    Err(ToolError::execution_error()
                        .with_reason(err.to_string()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_schema() {
        let tool = ConvertCurrencyTool::new(RateClient::new(
            crate::DEFAULT_BASE_URL,
        ));
        let schema = tool.parameter_schema();
        assert_eq!(schema["type"], "object");

        let mut required: Vec<_> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        required.sort_unstable();
        assert_eq!(required, ["amount", "base", "target"]);
        assert_eq!(schema["properties"]["amount"]["type"], "number");
        assert_eq!(
            schema["properties"]["base"]["description"],
            "Base currency"
        );
    }

    #[test]
    fn test_schema_hides_the_rust_type() {
        let schema = parameter_schema();
        assert!(schema.get("title").is_none());
        assert!(schema.get("description").is_none());
        assert!(!schema.to_string().contains("ConvertParameters"));
    }
}
