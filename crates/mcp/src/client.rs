use std::collections::HashSet;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::proto::{
    CallToolParams, CallToolResult, Implementation, InitializeParams,
    InitializeResult, ListToolsResult, METHOD_NOT_FOUND, Message,
    PROTOCOL_VERSION, RpcError, ToolInfo,
};
use crate::{Error, LineTransport};

/// A client session with an MCP server.
///
/// Requests are sent one at a time; a response is matched by its id, and
/// notifications arriving in between are skipped.
pub struct McpClient {
    transport: LineTransport,
    next_id: u64,
    server_info: Implementation,
}

impl McpClient {
    /// Performs the `initialize` handshake over `transport`.
    pub async fn connect(transport: LineTransport) -> Result<Self, Error> {
        let mut client = Self {
            transport,
            next_id: 1,
            server_info: Implementation {
                name: String::new(),
                version: String::new(),
            },
        };

        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_owned(),
            capabilities: json!({}),
            client_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_owned(),
                version: env!("CARGO_PKG_VERSION").to_owned(),
            },
        };
        let result: InitializeResult =
            client.request("initialize", Some(&params)).await?;
        if result.protocol_version != PROTOCOL_VERSION {
            warn!(
                "server speaks protocol {}, continuing anyway",
                result.protocol_version
            );
        }
        info!(
            "connected to {} {}",
            result.server_info.name, result.server_info.version
        );
        client.server_info = result.server_info;

        client
            .transport
            .send(&Message::notification("notifications/initialized", None))
            .await?;
        Ok(client)
    }

    /// Returns who the server said it is.
    #[inline]
    pub fn server_info(&self) -> &Implementation {
        &self.server_info
    }

    /// Returns the process id of a spawned server.
    #[inline]
    pub fn server_pid(&self) -> Option<u32> {
        self.transport.server_pid()
    }

    /// Lists every tool the server offers, following pagination.
    ///
    /// Listing stops at a cursor that was already visited.
    pub async fn list_tools(&mut self) -> Result<Vec<ToolInfo>, Error> {
        let mut tools = Vec::new();
        let mut visited = HashSet::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = cursor.map(|cursor| json!({ "cursor": cursor }));
            let page: ListToolsResult =
                self.request("tools/list", params.as_ref()).await?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if visited.insert(next.clone()) => {
                    cursor = Some(next)
                }
                Some(next) => {
                    warn!("tools/list repeated cursor {next:?}, stopping");
                    break;
                }
                None => break,
            }
        }
        debug!("server offers {} tools", tools.len());
        Ok(tools)
    }

    /// Calls a tool. A tool that failed is reported through
    /// [`CallToolResult::is_error`], not as an `Err`.
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<CallToolResult, Error> {
        let params = CallToolParams {
            name: name.to_owned(),
            arguments: Some(arguments),
        };
        self.request("tools/call", Some(&params)).await
    }

    /// Checks that the server is responsive.
    pub async fn ping(&mut self) -> Result<(), Error> {
        let _: Value = self.request("ping", None::<&Value>).await?;
        Ok(())
    }

    /// Ends the session, see [`LineTransport::close`].
    #[inline]
    pub async fn close(self) -> Result<(), Error> {
        self.transport.close().await
    }

    async fn request<P, R>(
        &mut self,
        method: &str,
        params: Option<&P>,
    ) -> Result<R, Error>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let id = self.next_id;
        self.next_id += 1;

        let params = params
            .map(serde_json::to_value)
            .transpose()
            .map_err(|err| Error::protocol(format!("bad params: {err}")))?;
        self.transport
            .send(&Message::request(id, method, params))
            .await?;

        loop {
            let Some(message) = self.transport.receive().await? else {
                return Err(Error::closed());
            };

            if let Some(incoming) = &message.method {
                // The server may send notifications any time, and
                // requests we don't serve.
                match &message.id {
                    Some(request_id) => {
                        debug!("declining server request {incoming}");
                        let reply = Message::error_response(
                            request_id.clone(),
                            RpcError::new(
                                METHOD_NOT_FOUND,
                                format!("Method not found: {incoming}"),
                            ),
                        );
                        self.transport.send(&reply).await?;
                    }
                    None => debug!("skipping notification {incoming}"),
                }
                continue;
            }

            // An error without id means the server could not read the
            // request at all.
            if message.id.is_none() {
                if let Some(err) = message.error {
                    return Err(Error::rpc(method, err));
                }
            }
            if message.id != Some(Value::from(id)) {
                warn!("skipping a response to another request");
                continue;
            }
            if let Some(err) = message.error {
                return Err(Error::rpc(method, err));
            }
            let result = message.result.unwrap_or(Value::Null);
            return serde_json::from_value(result).map_err(|err| {
                Error::protocol(format!("unexpected {method} result: {err}"))
            });
        }
    }
}
