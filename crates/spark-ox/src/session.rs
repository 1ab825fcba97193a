use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{
    Error as WsError, Message,
    protocol::{WebSocketConfig, frame::CloseFrame, frame::coding::CloseCode},
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_with_config};

use crate::{
    SparkRequestError,
    auth::SignedEndpoint,
    error::map_tungstenite_error,
    frame::{StreamFrame, decode_frame},
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsSender = SplitSink<WsStream, Message>;
pub(crate) type WsReceiver = SplitStream<WsStream>;

/// One open connection to the Spark chat endpoint.
///
/// A session serves exactly one request. Dropping it releases the socket.
pub struct SparkSession {
    pub(crate) ws_sender: WsSender,
    pub(crate) ws_receiver: WsReceiver,
}

impl SparkSession {
    /// Open a WebSocket against a freshly signed endpoint.
    ///
    /// # Errors
    ///
    /// Returns `SparkRequestError` if the handshake fails. Spark answers a bad
    /// signature or a stale date with an HTTP 401/403 during the upgrade, which
    /// surfaces as [`SparkRequestError::HandshakeRejected`].
    pub async fn open(endpoint: &SignedEndpoint) -> Result<Self, SparkRequestError> {
        let _ = rustls::crypto::ring::default_provider().install_default();

        let mut ws_config = WebSocketConfig::default();
        ws_config.max_message_size = Some(16 << 20);
        ws_config.max_frame_size = Some(16 << 20);

        let (ws_stream, response) =
            connect_async_with_config(endpoint.url.as_str(), Some(ws_config), false)
                .await
                .map_err(map_tungstenite_error)?;
        log::debug!(
            "Connected to Spark at {} (HTTP {})",
            endpoint.host,
            response.status()
        );

        let (ws_sender, ws_receiver) = ws_stream.split();
        Ok(Self {
            ws_sender,
            ws_receiver,
        })
    }

    /// Send the request frame.
    pub async fn send_payload<T: Serialize>(&mut self, payload: &T) -> Result<(), SparkRequestError> {
        let text = serde_json::to_string(payload)?;
        send_text(&mut self.ws_sender, text).await
    }

    pub async fn send_text(&mut self, text: String) -> Result<(), SparkRequestError> {
        send_text(&mut self.ws_sender, text).await
    }

    /// Receive the next decoded frame.
    ///
    /// * `Some(Ok(frame))` - a frame was decoded
    /// * `Some(Err(error))` - the frame was rejected by the vendor, malformed, or the transport failed
    /// * `None` - the peer closed the connection
    pub async fn receive(&mut self) -> Option<Result<StreamFrame, SparkRequestError>> {
        receive_frame(&mut self.ws_receiver).await
    }

    /// Send a close frame and flush the connection.
    pub async fn close(&mut self) -> Result<(), SparkRequestError> {
        close_sender(&mut self.ws_sender).await
    }

    /// Close, ignoring failures from a peer that is already gone.
    pub(crate) async fn close_quietly(&mut self) {
        if let Err(e) = self.close().await {
            log::debug!("Spark close handshake skipped: {e}");
        }
    }

    pub(crate) fn into_split(self) -> (WsSender, WsReceiver) {
        (self.ws_sender, self.ws_receiver)
    }
}

pub(crate) async fn send_text(sender: &mut WsSender, text: String) -> Result<(), SparkRequestError> {
    log::trace!("Spark request frame: {text}");
    sender
        .send(Message::Text(text.into()))
        .await
        .map_err(map_tungstenite_error)
}

pub(crate) async fn receive_frame(
    receiver: &mut WsReceiver,
) -> Option<Result<StreamFrame, SparkRequestError>> {
    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                log::trace!("Spark frame: {}", text.as_str());
                return Some(decode_frame(text.as_str()));
            }
            Some(Ok(Message::Binary(data))) => {
                return Some(match std::str::from_utf8(&data) {
                    Ok(text) => decode_frame(text),
                    Err(e) => Err(SparkRequestError::InvalidFrame(format!(
                        "Invalid UTF-8 in binary message: {e}"
                    ))),
                });
            }
            // tungstenite answers pings itself
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(close_frame))) => {
                match close_frame {
                    Some(frame) => log::debug!(
                        "Spark closed the connection: {:?} '{}'",
                        frame.code,
                        frame.reason
                    ),
                    None => log::debug!("Spark closed the connection"),
                }
                return None;
            }
            Some(Ok(Message::Frame(_))) => {
                return Some(Err(SparkRequestError::InvalidFrame(
                    "Received unexpected raw WebSocket frame".to_string(),
                )));
            }
            Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => return None,
            Some(Err(e)) => return Some(Err(map_tungstenite_error(e))),
        }
    }
}

pub(crate) async fn close_sender(sender: &mut WsSender) -> Result<(), SparkRequestError> {
    let close_frame = CloseFrame {
        code: CloseCode::Normal,
        reason: "Client initiated close".into(),
    };
    sender
        .send(Message::Close(Some(close_frame)))
        .await
        .map_err(map_tungstenite_error)?;
    sender.close().await.map_err(map_tungstenite_error)
}
