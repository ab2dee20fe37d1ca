use fx_agent_core::tool::{ErrorKind as ToolErrorKind, ToolSource};
use serde_json::{Value, json};

use crate::proto::{
    CallToolParams, CallToolResult, INTERNAL_ERROR, INVALID_PARAMS,
    INVALID_REQUEST, Implementation, InitializeResult, JSONRPC_VERSION,
    ListToolsResult, METHOD_NOT_FOUND, Message, PARSE_ERROR,
    PROTOCOL_VERSION, RpcError, ToolInfo,
};
use crate::{Error, LineTransport};

/// Serves the tools of a [`ToolSource`] to one MCP client.
pub struct McpServer {
    info: Implementation,
    tools: Box<dyn ToolSource>,
}

impl McpServer {
    /// Creates a server announcing itself as `name` `version`.
    pub fn new<S, V, T>(name: S, version: V, tools: T) -> Self
    where
        S: Into<String>,
        V: Into<String>,
        T: ToolSource + 'static,
    {
        Self {
            info: Implementation {
                name: name.into(),
                version: version.into(),
            },
            tools: Box::new(tools),
        }
    }

    /// Answers requests until the client closes its side.
    ///
    /// Malformed input is answered with a JSON-RPC error and does not end
    /// the session; only I/O failures do.
    pub async fn serve(&self, transport: &mut LineTransport) -> Result<(), Error> {
        info!("serving {} tools", self.tools.definitions().len());
        while let Some(line) = transport.read_line().await? {
            if let Some(reply) = self.handle_line(&line).await {
                transport.send(&reply).await?;
            }
        }
        info!("client disconnected");
        Ok(())
    }

    /// Handles one line and returns the reply, if one is due.
    pub async fn handle_line(&self, line: &str) -> Option<Message> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(err) => {
                warn!("unreadable message: {err}");
                return Some(Message::error_response(
                    Value::Null,
                    RpcError::new(PARSE_ERROR, format!("Parse error: {err}")),
                ));
            }
        };
        let id = value.get("id").cloned();
        let message = match serde_json::from_value::<Message>(value) {
            Ok(message) if message.jsonrpc == JSONRPC_VERSION => message,
            _ => {
                return Some(Message::error_response(
                    id.unwrap_or(Value::Null),
                    RpcError::new(INVALID_REQUEST, "Invalid Request"),
                ));
            }
        };

        let Some(method) = message.method else {
            // Responses to requests we never send.
            debug!("ignoring a response");
            return None;
        };
        if id == Some(Value::Null) {
            warn!("{method} has a null id");
            return Some(Message::error_response(
                Value::Null,
                RpcError::new(INVALID_REQUEST, "Invalid Request: null id"),
            ));
        }
        let Some(id) = message.id else {
            match method.as_str() {
                "notifications/initialized" => info!("client initialized"),
                _ => debug!("ignoring notification {method}"),
            }
            return None;
        };

        debug!("handling {method}");
        Some(match self.handle_request(&method, message.params).await {
            Ok(result) => Message::response(id, result),
            Err(err) => {
                warn!("{method} failed: {}", err.message);
                Message::error_response(id, err)
            }
        })
    }

    async fn handle_request(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, RpcError> {
        match method {
            "initialize" => to_result(&InitializeResult {
                protocol_version: PROTOCOL_VERSION.to_owned(),
                capabilities: json!({ "tools": { "listChanged": false } }),
                server_info: self.info.clone(),
            }),
            "ping" => Ok(json!({})),
            "tools/list" => to_result(&ListToolsResult {
                tools: self
                    .tools
                    .definitions()
                    .into_iter()
                    .map(|tool| ToolInfo {
                        name: tool.name,
                        description: Some(tool.description),
                        input_schema: tool.parameters,
                    })
                    .collect(),
                next_cursor: None,
            }),
            "tools/call" => {
                let params: CallToolParams =
                    serde_json::from_value(params.unwrap_or(Value::Null))
                        .map_err(|err| {
                            RpcError::new(
                                INVALID_PARAMS,
                                format!("Invalid params: {err}"),
                            )
                        })?;
                let arguments =
                    params.arguments.unwrap_or_else(|| json!({}));
                let result = match self.tools.call(&params.name, arguments).await
                {
                    Ok(text) => CallToolResult::success(text),
                    Err(err) if err.kind() == ToolErrorKind::NotFound => {
                        return Err(RpcError::new(
                            INVALID_PARAMS,
                            format!("Unknown tool: {}", params.name),
                        ));
                    }
                    Err(err) => CallToolResult::failure(err.reason()),
                };
                to_result(&result)
            }
            _ => Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
            )),
        }
    }
}

fn to_result<T: serde::Serialize>(result: &T) -> Result<Value, RpcError> {
    serde_json::to_value(result)
        .map_err(|err| RpcError::new(INTERNAL_ERROR, format!("{err}")))
}

#[cfg(test)]
mod tests {
    use std::future::ready;

    use fx_agent_core::tool::{Error as ToolError, Tool, ToolResult, Toolbox};
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize)]
    struct DivideInput {
        a: f64,
        b: f64,
    }

    struct DivideTool {
        schema: Value,
    }

    impl Tool for DivideTool {
        type Input = DivideInput;

        fn name(&self) -> &str {
            "divide"
        }

        fn description(&self) -> &str {
            "Divides a by b"
        }

        fn parameter_schema(&self) -> &Value {
            &self.schema
        }

        fn execute(
            &self,
            input: DivideInput,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(if input.b == 0.0 {
                Err(ToolError::execution_error().with_reason("division by zero"))
            } else {
                Ok(format!("{}", input.a / input.b))
            })
        }
    }

    fn server() -> McpServer {
        let toolbox = Toolbox::default().with_tool(DivideTool {
            schema: json!({ "type": "object" }),
        });
        McpServer::new("test-server", "1.0.0", toolbox)
    }

    async fn reply_to(server: &McpServer, line: &str) -> Value {
        let reply = server.handle_line(line).await.unwrap();
        serde_json::to_value(reply).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let reply = reply_to(
            &server(),
            r#"{"jsonrpc":"2.0","id":0,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"t","version":"0"}}}"#,
        )
        .await;
        assert_eq!(reply["id"], 0);
        assert_eq!(reply["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(reply["result"]["serverInfo"]["name"], "test-server");
        assert!(reply["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_tool_calls() {
        let server = server();
        let reply = reply_to(
            &server,
            r#"{"jsonrpc":"2.0","id":"a","method":"tools/call","params":{"name":"divide","arguments":{"a":1,"b":4}}}"#,
        )
        .await;
        assert_eq!(reply["id"], "a");
        assert_eq!(
            reply["result"],
            json!({ "content": [{ "type": "text", "text": "0.25" }], "isError": false })
        );

        let reply = reply_to(
            &server,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"divide","arguments":{"a":1,"b":0}}}"#,
        )
        .await;
        assert_eq!(reply["result"]["isError"], true);
        assert_eq!(reply["result"]["content"][0]["text"], "division by zero");

        let reply = reply_to(
            &server,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"divide"}}"#,
        )
        .await;
        assert_eq!(reply["result"]["isError"], true);

        let reply = reply_to(
            &server,
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"multiply"}}"#,
        )
        .await;
        assert_eq!(reply["error"]["code"], INVALID_PARAMS);

        let reply = reply_to(
            &server,
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"arguments":{}}}"#,
        )
        .await;
        assert_eq!(reply["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let server = server();
        let reply = reply_to(&server, "{not json").await;
        assert_eq!(reply["id"], Value::Null);
        assert_eq!(reply["error"]["code"], PARSE_ERROR);

        let reply = reply_to(&server, r#"{"jsonrpc":"1.0","id":1,"method":"ping"}"#).await;
        assert_eq!(reply["id"], 1);
        assert_eq!(reply["error"]["code"], INVALID_REQUEST);

        let reply = reply_to(
            &server,
            r#"{"jsonrpc":"2.0","id":1,"method":"resources/list"}"#,
        )
        .await;
        assert_eq!(reply["error"]["code"], METHOD_NOT_FOUND);

        let reply =
            reply_to(&server, r#"{"jsonrpc":"2.0","id":9,"method":"ping"}"#).await;
        assert_eq!(reply["result"], json!({}));
    }

    #[tokio::test]
    async fn test_notifications_get_no_reply() {
        let server = server();
        let reply = server
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert_eq!(reply, None);

        let reply = server
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#)
            .await;
        assert_eq!(reply, None);
    }

    #[tokio::test]
    async fn test_null_id_is_rejected() {
        let reply = reply_to(
            &server(),
            r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#,
        )
        .await;
        assert_eq!(reply["id"], Value::Null);
        assert_eq!(reply["error"]["code"], INVALID_REQUEST);
    }
}
