//! Wire types for the completion service.
//!
//! These mirror the OpenAI Chat Completions API with function/tool calling,
//! used for both request building and response parsing.

use serde::{Deserialize, Serialize};

// ─── Request Types ───────────────────────────────────────────────────────────

/// A single message in the outbound message list.
///
/// - `content` is serialized as `""` (not `null`) when absent. Assistant turns
///   that only carry tool calls would otherwise be rejected by stricter
///   OpenAI-compatible servers.
/// - `name`, `tool_call_id` and `tool_calls` are skipped when `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(serialize_with = "serialize_content")]
    pub content: Option<String>,
    /// Author name for `user` messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Tool results are sent back as `tool` role messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Assistant messages may contain tool calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallResponse>>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            name: None,
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn user(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            name: Some(name.into()),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Option<Vec<ToolCallResponse>>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            name: None,
            tool_call_id: None,
            tool_calls,
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            name: None,
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        }
    }
}

/// Emit `""` instead of `null` when `content` is `None`.
fn serialize_content<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(s) => serializer.serialize_str(s),
        None => serializer.serialize_str(""),
    }
}

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Tool definition sent in the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub r#type: String,
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    /// Wrap a function descriptor as a `"function"` tool.
    pub fn function(function: FunctionDefinition) -> Self {
        Self {
            r#type: "function".to_string(),
            function,
        }
    }
}

/// Function definition within a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Request body for `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    /// Number of candidate completions to generate.
    pub n: u32,
    /// End-user identifier forwarded to the service.
    pub user: String,
}

impl ChatCompletionRequest {
    /// A single-candidate request without tools.
    pub fn new(
        model: impl Into<String>,
        temperature: f32,
        messages: Vec<ChatMessage>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            temperature,
            messages,
            tools: None,
            n: 1,
            user: user.into(),
        }
    }

    /// Attach tools. An empty list is omitted from the request entirely.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = if tools.is_empty() { None } else { Some(tools) };
        self
    }

    /// Request `n` candidates (clamped to at least one).
    pub fn with_candidates(mut self, n: u32) -> Self {
        self.n = n.max(1);
        self
    }
}

// ─── Response Types ──────────────────────────────────────────────────────────

/// Tool call as returned in the OpenAI response format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResponse {
    pub id: String,
    #[serde(default = "default_tool_type")]
    pub r#type: String,
    pub function: FunctionCallResponse,
}

fn default_tool_type() -> String {
    "function".to_string()
}

/// Function call details in a response. `arguments` is a JSON-encoded string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallResponse {
    pub name: String,
    pub arguments: String,
}

/// Response body of `POST /chat/completions`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatCompletionResponse {
    /// Tool calls requested by the top candidate, if any.
    pub fn top_tool_calls(&self) -> Option<&[ToolCallResponse]> {
        self.choices
            .first()
            .and_then(|c| c.message.tool_calls.as_deref())
            .filter(|calls| !calls.is_empty())
    }

    /// Text of the top candidate, if any.
    pub fn top_content(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.message.content.as_deref())
    }
}

/// One candidate completion.
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// The assistant message inside a candidate.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallResponse>>,
}

/// Token accounting reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tools_omitted_when_empty() {
        let req = ChatCompletionRequest::new("gpt-4o", 0.2, vec![], "alice").with_tools(vec![]);
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("tools"), "empty tool list should be omitted");
        assert!(json.contains("\"n\":1"));
        assert!(json.contains("\"user\":\"alice\""));
    }

    #[test]
    fn test_candidates_clamped_to_one() {
        let req = ChatCompletionRequest::new("m", 0.0, vec![], "u").with_candidates(0);
        assert_eq!(req.n, 1);
        let req = req.with_candidates(3);
        assert_eq!(req.n, 3);
    }

    #[test]
    fn test_user_message_carries_name() {
        let json = serde_json::to_value(ChatMessage::user("bob", "hi")).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["name"], "bob");
        assert!(json.get("tool_call_id").is_none());
    }

    #[test]
    fn test_none_content_serializes_as_empty_string() {
        let mut msg = ChatMessage::assistant("x", None);
        msg.content = None;
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["content"], "");
    }

    #[test]
    fn test_response_with_tool_calls() {
        let body = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "add", "arguments": "{\"a\":2,\"b\":3}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let resp: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        let calls = resp.top_tool_calls().expect("tool calls");
        assert_eq!(calls[0].function.name, "add");
        assert!(resp.top_content().is_none());
        assert_eq!(resp.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_empty_tool_call_list_is_not_a_request() {
        let body = r#"{"choices": [{"message": {"content": "hi", "tool_calls": []}}]}"#;
        let resp: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert!(resp.top_tool_calls().is_none());
        assert_eq!(resp.top_content(), Some("hi"));
        assert!(resp.usage.is_none());
    }
}
