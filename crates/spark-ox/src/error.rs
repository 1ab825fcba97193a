use serde::{Serialize, Serializer, ser::SerializeStruct};
use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

/// Errors that can occur while talking to the Spark chat API
#[derive(Debug, Error)]
pub enum SparkRequestError {
    /// JSON serialization errors
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    /// The vendor rejected the request (`header.code != 0`)
    #[error("Spark API error {code}: {message}")]
    Api {
        code: i64,
        message: String,
        sid: Option<String>,
    },

    /// An inbound frame could not be decoded
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// The peer closed the connection
    #[error("WebSocket connection closed")]
    ConnectionClosed,

    /// The WebSocket upgrade was refused, usually a bad signature or clock skew
    #[error("WebSocket handshake rejected: {0}")]
    HandshakeRejected(String),

    /// Any other transport failure
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// URL building error
    #[error("URL build failed: {0}")]
    UrlBuildError(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    /// The detached send task panicked or was cancelled
    #[error("Send task failed: {0}")]
    SendTask(String),

    /// I/O errors
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

impl SparkRequestError {
    /// True for failures of the connection itself rather than of the conversation.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed | Self::WebSocket(_) | Self::IoError(_)
        )
    }
}

/// Map tungstenite errors to `SparkRequestError`
pub(crate) fn map_tungstenite_error(error: WsError) -> SparkRequestError {
    match error {
        WsError::ConnectionClosed | WsError::AlreadyClosed => SparkRequestError::ConnectionClosed,
        WsError::Io(io_err) => SparkRequestError::IoError(io_err),
        WsError::Url(url_err) => SparkRequestError::UrlBuildError(url_err.to_string()),
        WsError::Http(response) => {
            let body = response
                .body()
                .as_deref()
                .map(String::from_utf8_lossy)
                .unwrap_or_default();
            SparkRequestError::HandshakeRejected(format!("HTTP {} {body}", response.status()))
        }
        other => SparkRequestError::WebSocket(other.to_string()),
    }
}

impl Serialize for SparkRequestError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            SparkRequestError::Api { code, message, sid } => {
                let field_count = 3 + usize::from(sid.is_some());
                let mut state = serializer.serialize_struct("SparkRequestError", field_count)?;
                state.serialize_field("type", "Api")?;
                state.serialize_field("code", code)?;
                state.serialize_field("message", message)?;
                if let Some(sid) = sid {
                    state.serialize_field("sid", sid)?;
                }
                state.end()
            }
            SparkRequestError::ConnectionClosed => {
                let mut state = serializer.serialize_struct("SparkRequestError", 1)?;
                state.serialize_field("type", "ConnectionClosed")?;
                state.end()
            }
            other => {
                let kind = match other {
                    SparkRequestError::SerdeError(_) => "SerdeError",
                    SparkRequestError::InvalidFrame(_) => "InvalidFrame",
                    SparkRequestError::HandshakeRejected(_) => "HandshakeRejected",
                    SparkRequestError::WebSocket(_) => "WebSocket",
                    SparkRequestError::UrlBuildError(_) => "UrlBuildError",
                    SparkRequestError::Signing(_) => "Signing",
                    SparkRequestError::SendTask(_) => "SendTask",
                    _ => "IoError",
                };
                let mut state = serializer.serialize_struct("SparkRequestError", 2)?;
                state.serialize_field("type", kind)?;
                state.serialize_field("error", &other.to_string())?;
                state.end()
            }
        }
    }
}
