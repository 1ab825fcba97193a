//! Decoding of inbound Spark frames.

use serde::Deserialize;
use serde_json::Value;

use crate::{SparkRequestError, Usage};

/// Completion status carried in `payload.choices.status`.
///
/// Spark sends 0 on the first frame and 1 on the ones after it; only 2 ends
/// the session, so everything else is treated as in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "i64")]
pub enum Status {
    InProgress,
    Done,
}

impl From<i64> for Status {
    fn from(value: i64) -> Self {
        if value == 2 { Status::Done } else { Status::InProgress }
    }
}

/// One decoded server frame.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamFrame {
    pub status: Status,
    /// Text fragment, possibly empty
    pub content: String,
    /// Opaque function call, forwarded as received
    pub function_call: Option<Value>,
    pub usage: Option<Usage>,
}

impl StreamFrame {
    pub fn is_done(&self) -> bool {
        self.status == Status::Done
    }
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    header: FrameHeader,
    payload: Option<FramePayload>,
}

#[derive(Debug, Deserialize)]
struct FrameHeader {
    code: i64,
    #[serde(default)]
    message: String,
    sid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FramePayload {
    choices: Choices,
    usage: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Choices {
    status: Status,
    #[serde(default)]
    text: Vec<TextFragment>,
}

#[derive(Debug, Deserialize)]
struct TextFragment {
    #[serde(default)]
    content: String,
    function_call: Option<Value>,
}

/// Token counts live under `usage.text`; a bare counts object is accepted
/// too. Anything else is dropped rather than failing the frame.
fn decode_usage(usage: Value) -> Option<Usage> {
    let counts = match usage {
        Value::Object(mut map) => match map.remove("text") {
            Some(text) => text,
            None => Value::Object(map),
        },
        Value::Null => return None,
        other => other,
    };

    match serde_json::from_value(counts) {
        Ok(usage) => Some(usage),
        Err(e) => {
            log::warn!("Ignoring unrecognised Spark usage object: {e}");
            None
        }
    }
}

/// Decode one text frame.
///
/// A non-zero `header.code` is returned as [`SparkRequestError::Api`]; the
/// session must not be continued after it.
pub fn decode_frame(text: &str) -> Result<StreamFrame, SparkRequestError> {
    let raw: RawFrame =
        serde_json::from_str(text).map_err(|e| SparkRequestError::InvalidFrame(e.to_string()))?;

    if raw.header.code != 0 {
        return Err(SparkRequestError::Api {
            code: raw.header.code,
            message: raw.header.message,
            sid: raw.header.sid,
        });
    }

    let payload = raw
        .payload
        .ok_or_else(|| SparkRequestError::InvalidFrame("frame has no payload".to_string()))?;
    let fragment = payload.choices.text.into_iter().next();

    Ok(StreamFrame {
        status: payload.choices.status,
        content: fragment.as_ref().map(|f| f.content.clone()).unwrap_or_default(),
        function_call: fragment.and_then(|f| f.function_call),
        usage: payload.usage.and_then(decode_usage),
    })
}
