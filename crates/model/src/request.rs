use serde_json::{Value, json};

use crate::OpaqueMessage;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelRequest {
    /// The conversation so far, oldest first.
    pub messages: Vec<ModelMessage>,
    /// Tools that are available to the model.
    pub tools: Vec<ModelTool>,
    /// Sampling temperature. `None` leaves the provider default.
    pub temperature: Option<f32>,
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// An assistant text.
    Assistant(String),
    /// The results of every tool call requested in one model turn.
    ///
    /// Providers send this back as a single user-origin turn.
    ToolResults(Vec<ToolCallResult>),
    /// An opaque message (usually the history message from the model)
    Opaque(OpaqueMessage),
}

/// The result of calling a tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCallResult {
    /// The identifier of the tool call request this result answers.
    pub id: String,
    /// The name of the tool that was called.
    pub name: String,
    /// What the tool produced.
    pub outcome: ToolOutcome,
}

/// The outcome of a single tool call.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ToolOutcome {
    /// The tool ran and returned a value.
    Success(String),
    /// The tool could not be found, rejected its input, or failed.
    Error(String),
}

impl ToolOutcome {
    /// Returns `true` if the outcome is an error.
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutcome::Error(_))
    }

    /// Returns the carried text, whether it is a result or an error.
    #[inline]
    pub fn text(&self) -> &str {
        match self {
            ToolOutcome::Success(text) | ToolOutcome::Error(text) => text,
        }
    }

    /// Builds the JSON object handed back to the model, either
    /// `{"result": ...}` or `{"error": ...}`.
    pub fn to_response_value(&self) -> Value {
        match self {
            ToolOutcome::Success(result) => json!({ "result": result }),
            ToolOutcome::Error(error) => json!({ "error": error }),
        }
    }
}

/// Describes a tool that can be used by the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelTool {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// Parameters definition of the tool.
    ///
    /// For most model providers, the parameters should typically be
    /// defined by a [JSON schema](https://json-schema.org/).
    pub parameters: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_response_value() {
        let ok = ToolOutcome::Success("100 USD = 90.00 EUR".to_owned());
        assert_eq!(
            ok.to_response_value(),
            json!({ "result": "100 USD = 90.00 EUR" })
        );
        assert!(!ok.is_error());

        let err = ToolOutcome::Error("tool not found".to_owned());
        assert_eq!(err.to_response_value(), json!({ "error": "tool not found" }));
        assert_eq!(err.text(), "tool not found");
    }
}
