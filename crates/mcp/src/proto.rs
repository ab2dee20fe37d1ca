//! The subset of JSON-RPC 2.0 and MCP messages this crate speaks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The JSON-RPC version every message carries.
pub const JSONRPC_VERSION: &str = "2.0";

/// The MCP revision implemented here.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Invalid JSON was received.
pub const PARSE_ERROR: i64 = -32700;
/// The JSON sent is not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;
/// The method does not exist.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;
/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i64 = -32603;

/// A JSON-RPC message of any shape.
///
/// A request has `id` and `method`, a notification only `method`, and a
/// response `id` plus one of `result` and `error`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Always [`JSONRPC_VERSION`].
    pub jsonrpc: String,
    /// The request id, `Value::Null` for errors about unreadable requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// The method of a request or notification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// The parameters of a request or notification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// The result of a successful request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error of a failed request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Message {
    /// Creates a request.
    pub fn request(id: u64, method: &str, params: Option<Value>) -> Self {
        Self {
            id: Some(Value::from(id)),
            method: Some(method.to_owned()),
            params,
            ..Self::empty()
        }
    }

    /// Creates a notification, a request that expects no response.
    pub fn notification(method: &str, params: Option<Value>) -> Self {
        Self {
            method: Some(method.to_owned()),
            params,
            ..Self::empty()
        }
    }

    /// Creates a successful response.
    pub fn response(id: Value, result: Value) -> Self {
        Self {
            id: Some(id),
            result: Some(result),
            ..Self::empty()
        }
    }

    /// Creates an error response.
    pub fn error_response(id: Value, error: RpcError) -> Self {
        Self {
            id: Some(id),
            error: Some(error),
            ..Self::empty()
        }
    }

    fn empty() -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id: None,
            method: None,
            params: None,
            result: None,
            error: None,
        }
    }

    /// Returns `true` if this is a response (it has an id but no method).
    #[inline]
    pub fn is_response(&self) -> bool {
        self.method.is_none() && self.id.is_some()
    }
}

/// The error object of a failed request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// One of the error codes defined above, or an application code.
    pub code: i64,
    /// A short description of the error.
    pub message: String,
    /// Extra information about the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Creates an error without data.
    #[inline]
    pub fn new<S: Into<String>>(code: i64, message: S) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Name and version of a client or server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    /// The program name.
    pub name: String,
    /// The program version.
    #[serde(default)]
    pub version: String,
}

/// Parameters of `initialize`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// The latest revision the client supports.
    pub protocol_version: String,
    /// What the client can do. No client capability is used here.
    #[serde(default)]
    pub capabilities: Value,
    /// Who the client is.
    pub client_info: Implementation,
}

/// Result of `initialize`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// The revision the server chose.
    pub protocol_version: String,
    /// What the server offers.
    #[serde(default)]
    pub capabilities: Value,
    /// Who the server is.
    pub server_info: Implementation,
}

/// A tool as listed by `tools/list`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    /// The unique tool name.
    pub name: String,
    /// What the tool does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The JSON schema of the arguments object.
    pub input_schema: Value,
}

/// Result of `tools/list`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    /// One page of tools.
    pub tools: Vec<ToolInfo>,
    /// Set when more pages follow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Parameters of `tools/call`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallToolParams {
    /// The tool to call.
    pub name: String,
    /// The arguments object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// One piece of a tool result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// A base64-encoded image.
    Image {
        /// The encoded image.
        data: String,
        /// The image type, e.g. `image/png`.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// An embedded resource.
    Resource {
        /// The resource object, kept as is.
        resource: Value,
    },
}

/// Result of `tools/call`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallToolResult {
    /// What the tool produced.
    #[serde(default)]
    pub content: Vec<Content>,
    /// Whether the tool failed. A failing tool is still a successful
    /// request.
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Creates a successful result holding `text`.
    #[inline]
    pub fn success<S: Into<String>>(text: S) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates a failed result describing the failure in `text`.
    #[inline]
    pub fn failure<S: Into<String>>(text: S) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: true,
        }
    }

    /// Returns the first text content, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|content| match content {
            Content::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Joins all text contents with newlines. Other contents are shown as
    /// placeholders.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|content| match content {
                Content::Text { text } => text.as_str(),
                Content::Image { .. } => "[image]",
                Content::Resource { .. } => "[resource]",
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_message_shapes() {
        let request = Message::request(1, "tools/list", None);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" })
        );
        assert!(!request.is_response());

        let notification =
            Message::notification("notifications/initialized", None);
        assert_eq!(
            serde_json::to_value(&notification).unwrap(),
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" })
        );

        let error = Message::error_response(
            Value::Null,
            RpcError::new(PARSE_ERROR, "Parse error"),
        );
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": { "code": -32700, "message": "Parse error" }
            })
        );
    }

    #[test]
    fn test_call_tool_result() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                { "type": "image", "data": "aGk=", "mimeType": "image/png" },
                { "type": "text", "text": "Failed to fetch exchange rate" }
            ],
            "isError": true
        }))
        .unwrap();
        assert!(result.is_error);
        assert_eq!(result.first_text(), Some("Failed to fetch exchange rate"));
        assert_eq!(
            result.joined_text(),
            "[image]\nFailed to fetch exchange rate"
        );

        let result: CallToolResult =
            serde_json::from_value(json!({ "content": [] })).unwrap();
        assert!(!result.is_error);
        assert_eq!(result.first_text(), None);
    }

    #[test]
    fn test_tool_info() {
        let info: ToolInfo = serde_json::from_value(json!({
            "name": "convert_exchange_rate",
            "inputSchema": { "type": "object" }
        }))
        .unwrap();
        assert_eq!(info.description, None);
        assert_eq!(info.input_schema, json!({ "type": "object" }));
    }
}
