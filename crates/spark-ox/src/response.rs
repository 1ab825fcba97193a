use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Usage, message::Role};

/// Terminal server-sent event of a streamed completion.
pub const DONE_EVENT: &str = "data: [DONE]\n\n";

/// Spark returns at most one function call per answer, so its id is fixed.
pub const TOOL_CALL_ID: &str = "tool-call-1";

/// Generate a completion id in OpenAI's `chatcmpl-...` form.
pub fn completion_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())
}

/// An aggregated, OpenAI-compatible chat completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: AssistantMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Legacy single-function form of `tool_calls`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub r#type: String,
    pub function: Value,
}

impl ChatCompletion {
    /// Text of the first choice.
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .map_or("", |choice| choice.message.content.as_str())
    }

    /// Function call of the first choice, if the model asked for one.
    pub fn function_call(&self) -> Option<&Value> {
        self.choices
            .first()
            .and_then(|choice| choice.message.function_call.as_ref())
    }
}

/// One streamed delta in OpenAI's `chat.completion.chunk` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChoice {
    pub index: u32,
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub role: Role,
    pub content: String,
}

impl ChatCompletionChunk {
    /// An assistant content delta stamped with the current time.
    pub fn content_delta(id: &str, model: &str, content: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            object: "chat.completion.chunk".to_string(),
            created: chrono::Utc::now().timestamp(),
            model: model.to_string(),
            choices: vec![StreamChoice {
                index: 0,
                delta: Delta {
                    role: Role::Assistant,
                    content: content.into(),
                },
                finish_reason: None,
            }],
        }
    }

    /// Serialize as a `data: {json}\n\n` server-sent event.
    pub fn to_sse(&self) -> Result<String, serde_json::Error> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }
}
