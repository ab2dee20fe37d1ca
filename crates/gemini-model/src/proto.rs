use std::collections::HashSet;

use fx_agent_model::{ModelMessage, ModelRequest, ModelTool, ToolCallResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ------------------------------------
// Types shared by requests and replies
// ------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub response: Value,
}

/// One part of a content. Exactly one of the data fields is set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought_signature: Option<String>,
}

impl Part {
    #[inline]
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Returns `true` for a part holding nothing but visible text, which
    /// can be merged with a neighbouring one.
    #[inline]
    pub fn is_plain_text(&self) -> bool {
        self.text.is_some()
            && self.thought.is_none()
            && self.function_call.is_none()
            && self.function_response.is_none()
            && self.thought_signature.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    #[inline]
    fn with_role(role: &str, parts: Vec<Part>) -> Self {
        Self {
            role: Some(role.to_owned()),
            parts,
        }
    }

    /// Appends a part, merging consecutive plain text.
    pub fn push_part(&mut self, part: Part) {
        match self.parts.last_mut() {
            Some(Part {
                text: Some(text),
                thought: None,
                function_call: None,
                function_response: None,
                thought_signature: None,
            }) if part.is_plain_text() => {
                text.push_str(part.text.as_deref().unwrap_or_default());
            }
            _ => self.parts.push(part),
        }
    }
}

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub response_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Extracts the message of an API error body, falling back to the raw
/// body.
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body.trim().to_owned(),
    }
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters_json_schema: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

// -----------
// Conversions
// -----------

pub fn create_request(req: &ModelRequest) -> GenerateContentRequest {
    let mut contents = Vec::with_capacity(req.messages.len());
    let mut system_parts = Vec::new();
    // Ids the model itself gave to its function calls. Only those may be
    // echoed back, the others were made up locally.
    let mut call_ids = HashSet::new();

    for msg in &req.messages {
        match msg {
            ModelMessage::System(text) => {
                system_parts.push(Part::text(text.as_str()));
            }
            ModelMessage::User(text) => {
                contents
                    .push(Content::with_role("user", vec![Part::text(text)]));
            }
            ModelMessage::Assistant(text) => {
                if text.is_empty() {
                    continue;
                }
                contents
                    .push(Content::with_role("model", vec![Part::text(text)]));
            }
            ModelMessage::ToolResults(results) => {
                let parts = results
                    .iter()
                    .map(|result| create_response_part(result, &call_ids))
                    .collect();
                contents.push(Content::with_role("user", parts));
            }
            ModelMessage::Opaque(opaque_msg) => {
                // Opaque messages from this provider always have `Content`
                // type.
                let Some(content) = opaque_msg.to_raw::<Content>() else {
                    warn!("skipping a foreign opaque message: {opaque_msg:?}");
                    continue;
                };
                call_ids.extend(content.parts.iter().filter_map(|part| {
                    part.function_call.as_ref()?.id.clone()
                }));
                contents.push(content.clone());
            }
        }
    }

    let tools = if req.tools.is_empty() {
        vec![]
    } else {
        vec![Tool {
            function_declarations: req.tools.iter().map(create_tool).collect(),
        }]
    };

    GenerateContentRequest {
        contents,
        system_instruction: if system_parts.is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: system_parts,
            })
        },
        tools,
        generation_config: req
            .temperature
            .map(|temperature| GenerationConfig { temperature }),
    }
}

#[inline]
fn create_response_part(
    result: &ToolCallResult,
    call_ids: &HashSet<String>,
) -> Part {
    Part {
        function_response: Some(FunctionResponse {
            id: call_ids.get(&result.id).cloned(),
            name: result.name.clone(),
            response: result.outcome.to_response_value(),
        }),
        ..Default::default()
    }
}

#[inline]
fn create_tool(tool: &ModelTool) -> FunctionDeclaration {
    FunctionDeclaration {
        name: tool.name.clone(),
        description: tool.description.clone(),
        parameters_json_schema: tool.parameters.clone(),
    }
}
