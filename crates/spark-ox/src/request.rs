use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::{Function, Message};

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// A chat completion request in the generic, vendor-neutral shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct ChatRequest {
    /// Conversation so far, oldest first
    #[builder(field)]
    pub messages: Vec<Message>,

    /// Functions the model may call
    #[builder(default)]
    #[serde(default)]
    pub functions: Vec<Function>,

    #[builder(default = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    #[builder(default = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,

    /// Sample from the k most likely tokens (1..=6 on Spark)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
}

impl<S: chat_request_builder::State> ChatRequestBuilder<S> {
    pub fn message(mut self, message: impl Into<Message>) -> Self {
        self.messages.push(message.into());
        self
    }

    pub fn messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn system(self, content: impl Into<String>) -> Self {
        self.message(Message::system(content))
    }

    pub fn user(self, content: impl Into<String>) -> Self {
        self.message(Message::user(content))
    }

    pub fn assistant(self, content: impl Into<String>) -> Self {
        self.message(Message::assistant(content))
    }
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            functions: Vec::new(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            top_k: None,
        }
    }

    /// Encode into the vendor's nested request frame.
    pub fn to_payload<'a>(&'a self, app_id: &'a str, uid: &'a str, domain: &'a str) -> SparkPayload<'a> {
        SparkPayload {
            header: RequestHeader { app_id, uid },
            parameter: Parameter {
                chat: ChatParameter {
                    domain,
                    temperature: self.temperature,
                    max_tokens: self.max_tokens,
                    top_k: self.top_k,
                    auditing: "default",
                },
            },
            payload: RequestPayload {
                message: TextList {
                    text: &self.messages,
                },
                functions: (!self.functions.is_empty()).then_some(TextList {
                    text: &self.functions,
                }),
            },
        }
    }
}

/// The first (and only) client frame of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SparkPayload<'a> {
    pub header: RequestHeader<'a>,
    pub parameter: Parameter<'a>,
    pub payload: RequestPayload<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestHeader<'a> {
    pub app_id: &'a str,
    pub uid: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Parameter<'a> {
    pub chat: ChatParameter<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatParameter<'a> {
    pub domain: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    pub auditing: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestPayload<'a> {
    pub message: TextList<'a, Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions: Option<TextList<'a, Function>>,
}

/// Spark wraps every list in a `{"text": [...]}` object.
#[derive(Debug, Clone, Serialize)]
pub struct TextList<'a, T> {
    pub text: &'a [T],
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_defaults() {
        let request = ChatRequest::builder().user("Hello").build();
        assert_eq!(request.messages, vec![Message::user("Hello")]);
        assert!(request.functions.is_empty());
        assert!((request.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(request.max_tokens, 2048);
        assert_eq!(request.top_k, None);
    }

    #[test]
    fn test_payload_shape() {
        let request = ChatRequest::builder()
            .system("Be brief")
            .user("Hi")
            .temperature(0.5)
            .max_tokens(256)
            .build();
        let value = serde_json::to_value(request.to_payload("app", "uid-1", "generalv3.5")).unwrap();

        assert_eq!(
            value,
            json!({
                "header": {"app_id": "app", "uid": "uid-1"},
                "parameter": {"chat": {
                    "domain": "generalv3.5",
                    "temperature": 0.5,
                    "max_tokens": 256,
                    "auditing": "default"
                }},
                "payload": {"message": {"text": [
                    {"role": "system", "content": "Be brief"},
                    {"role": "user", "content": "Hi"}
                ]}}
            })
        );
    }

    #[test]
    fn test_empty_functions_omitted() {
        let request = ChatRequest::new(vec![Message::user("Hi")]);
        let value = serde_json::to_value(request.to_payload("app", "uid", "lite")).unwrap();
        assert!(value["payload"].get("functions").is_none());
    }

    #[test]
    fn test_functions_forwarded_verbatim() {
        let functions = vec![
            Function::new("get_weather", "Weather by city")
                .with_parameters(json!({"type": "object", "properties": {"city": {"type": "string"}}})),
            Function::new("get_time", "Current time"),
        ];
        let request = ChatRequest::builder()
            .user("Weather in Hefei?")
            .functions(functions.clone())
            .build();
        let value = serde_json::to_value(request.to_payload("app", "uid", "generalv3.5")).unwrap();

        assert_eq!(
            value["payload"]["functions"]["text"],
            serde_json::to_value(&functions).unwrap()
        );
    }

    #[test]
    fn test_top_k_forwarded_when_set() {
        let request = ChatRequest::builder().user("Hi").top_k(4).build();
        let value = serde_json::to_value(request.to_payload("app", "uid", "lite")).unwrap();
        assert_eq!(value["parameter"]["chat"]["top_k"], 4);
    }
}
