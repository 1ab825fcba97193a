use serde_json::Value;

use crate::{
    Usage,
    frame::StreamFrame,
    message::Role,
    response::{AssistantMessage, ChatCompletion, Choice, TOOL_CALL_ID, ToolCall, completion_id},
};

/// Per-call state of an aggregated completion.
///
/// Content is appended in arrival order; function call and usage keep the
/// last value seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulator {
    pub answer: String,
    pub function_call: Option<Value>,
    pub usage: Option<Usage>,
    done: bool,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one frame in. Returns `true` once the terminal frame has been seen.
    pub fn push(&mut self, frame: StreamFrame) -> bool {
        let done = frame.is_done();
        self.answer.push_str(&frame.content);
        if frame.function_call.is_some() {
            self.function_call = frame.function_call;
        }
        if frame.usage.is_some() {
            self.usage = frame.usage;
        }
        self.done |= done;
        self.done
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn finish(self, model: &str) -> ChatCompletion {
        let tool_calls = self.function_call.as_ref().map(|function| {
            vec![ToolCall {
                id: TOOL_CALL_ID.to_string(),
                r#type: "function".to_string(),
                function: function.clone(),
            }]
        });

        ChatCompletion {
            id: completion_id(),
            object: "chat.completion".to_string(),
            created: chrono::Utc::now().timestamp(),
            model: model.to_string(),
            choices: vec![Choice {
                index: 0,
                message: AssistantMessage {
                    role: Role::Assistant,
                    content: self.answer,
                    tool_calls,
                    function_call: self.function_call,
                },
                finish_reason: Some("stop".to_string()),
            }],
            usage: self.usage,
        }
    }
}
