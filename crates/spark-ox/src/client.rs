use async_stream::try_stream;
use bon::Builder;
use core::fmt;
use futures_util::stream::BoxStream;

use crate::{
    ChatRequest, Model, SparkRequestError,
    accumulator::Accumulator,
    auth::{self, SignedEndpoint},
    response::{ChatCompletion, ChatCompletionChunk, DONE_EVENT, completion_id},
    session::{self, SparkSession},
};

/// Placeholder user id sent in every request header.
pub const DEFAULT_UID: &str = "spark-ox";

/// Spark chat API client.
///
/// The client holds credentials only. Every call signs a new URL, opens its
/// own connection and owns its own result state, so one client can serve
/// concurrent calls.
#[derive(Clone, Builder)]
pub struct Spark {
    #[builder(into)]
    pub(crate) app_id: String,
    #[builder(into)]
    pub(crate) api_key: String,
    #[builder(into)]
    pub(crate) api_secret: String,
    /// WebSocket endpoint; host and path of the signature are taken from it
    #[builder(default = Model::Max.endpoint().to_string(), into)]
    pub(crate) base_url: String,
    #[builder(default = Model::Max.to_string(), into)]
    pub(crate) domain: String,
    #[builder(default = DEFAULT_UID.to_string(), into)]
    pub(crate) uid: String,
}

impl Spark {
    /// Create a client for one of the catalogued models.
    pub fn new(
        app_id: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        model: Model,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            base_url: model.endpoint().to_string(),
            domain: model.to_string(),
            uid: DEFAULT_UID.to_string(),
        }
    }

    /// Read `SPARK_APP_ID`, `SPARK_API_KEY` and `SPARK_API_SECRET`, plus the
    /// optional `SPARK_API_URL` and `SPARK_DOMAIN`.
    pub fn load_from_env() -> Result<Self, std::env::VarError> {
        let app_id = std::env::var("SPARK_APP_ID")?;
        let api_key = std::env::var("SPARK_API_KEY")?;
        let api_secret = std::env::var("SPARK_API_SECRET")?;
        let base_url = std::env::var("SPARK_API_URL").unwrap_or_else(|_| Model::Max.endpoint().to_string());
        let domain = std::env::var("SPARK_DOMAIN").unwrap_or_else(|_| Model::Max.to_string());

        Ok(Self::builder()
            .app_id(app_id)
            .api_key(api_key)
            .api_secret(api_secret)
            .base_url(base_url)
            .domain(domain)
            .build())
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The catalogued model behind the configured domain, if there is one.
    pub fn model(&self) -> Option<Model> {
        self.domain.parse().ok()
    }

    /// Sign the endpoint for the current instant.
    pub fn sign(&self) -> Result<SignedEndpoint, SparkRequestError> {
        auth::sign_now(&self.base_url, &self.api_key, &self.api_secret)
    }

    /// Open a raw session for callers that drive the protocol themselves.
    pub async fn connect(&self) -> Result<SparkSession, SparkRequestError> {
        SparkSession::open(&self.sign()?).await
    }

    /// Encode a request into the first client frame.
    pub fn encode(&self, request: &ChatRequest) -> Result<String, SparkRequestError> {
        if !request.functions.is_empty() && self.model().is_some_and(|model| !model.supports_functions()) {
            log::warn!(
                "Spark domain {} does not support function calling; sending {} function(s) anyway",
                self.domain,
                request.functions.len()
            );
        }
        Ok(serde_json::to_string(&request.to_payload(
            &self.app_id,
            &self.uid,
            &self.domain,
        ))?)
    }

    /// Run one request to completion and aggregate the answer.
    ///
    /// The request frame is written by a spawned task while this task reads
    /// frames; only the reading side touches the accumulated state.
    ///
    /// # Errors
    ///
    /// A vendor error frame aborts the session and is returned as
    /// [`SparkRequestError::Api`]. A connection that drops before the final
    /// frame is not an error: whatever arrived so far is returned.
    pub async fn send(&self, request: &ChatRequest) -> Result<ChatCompletion, SparkRequestError> {
        let payload = self.encode(request)?;
        let (mut ws_sender, mut ws_receiver) = self.connect().await?.into_split();

        let send_task = tokio::spawn(async move {
            let sent = session::send_text(&mut ws_sender, payload).await;
            sent.map(|()| ws_sender)
        });

        let mut accumulator = Accumulator::new();
        let outcome = loop {
            match session::receive_frame(&mut ws_receiver).await {
                Some(Ok(frame)) => {
                    if accumulator.push(frame) {
                        break Ok(());
                    }
                }
                Some(Err(e)) if e.is_transport() => {
                    log::warn!("Spark connection lost before the final frame: {e}");
                    break Ok(());
                }
                Some(Err(e)) => break Err(e),
                None => {
                    log::debug!("Spark closed the session");
                    break Ok(());
                }
            }
        };

        let sent = send_task
            .await
            .map_err(|e| SparkRequestError::SendTask(e.to_string()))?;
        match sent {
            Ok(mut ws_sender) => {
                if let Err(e) = session::close_sender(&mut ws_sender).await {
                    log::debug!("Spark close handshake skipped: {e}");
                }
            }
            // a request that never went out explains an empty answer
            Err(send_error) if outcome.is_ok() => return Err(send_error),
            Err(_) => {}
        }

        outcome?;
        Ok(accumulator.finish(&self.domain))
    }

    /// Stream typed OpenAI-style chunks.
    ///
    /// Frames with empty content produce no chunk. Vendor error frames and
    /// transport failures are yielded as errors and end the stream.
    pub fn stream(
        &self,
        request: &ChatRequest,
    ) -> BoxStream<'static, Result<ChatCompletionChunk, SparkRequestError>> {
        let client = self.clone();
        let request = request.clone();

        Box::pin(try_stream! {
            let mut session = client.connect().await?;
            session.send_text(client.encode(&request)?).await?;

            let id = completion_id();
            while let Some(frame) = session.receive().await {
                let frame = frame?;
                let done = frame.is_done();
                if !frame.content.is_empty() {
                    yield ChatCompletionChunk::content_delta(&id, &client.domain, frame.content);
                }
                if done {
                    break;
                }
            }

            session.close_quietly().await;
        })
    }

    /// Stream server-sent event lines, ending with `data: [DONE]\n\n`.
    ///
    /// Once the request is on the wire the stream always ends with the DONE
    /// marker: vendor error frames, malformed frames and dropped connections
    /// are logged and then reported as a normal end of stream, which is what
    /// OpenAI-style consumers of this endpoint expect. Use [`Spark::stream`] to
    /// observe those errors.
    ///
    /// # Errors
    ///
    /// Only failures to connect or to send the request are yielded as `Err`.
    pub fn stream_sse(&self, request: &ChatRequest) -> BoxStream<'static, Result<String, SparkRequestError>> {
        let client = self.clone();
        let request = request.clone();

        Box::pin(try_stream! {
            let mut session = client.connect().await?;
            session.send_text(client.encode(&request)?).await?;

            let id = completion_id();
            loop {
                match session.receive().await {
                    Some(Ok(frame)) => {
                        let done = frame.is_done();
                        if !frame.content.is_empty() {
                            yield ChatCompletionChunk::content_delta(&id, &client.domain, frame.content).to_sse()?;
                        }
                        if done {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        log::warn!("Spark stream ended early: {e}");
                        break;
                    }
                    None => {
                        log::debug!("Spark closed the stream before the final frame");
                        break;
                    }
                }
            }

            yield DONE_EVENT.to_string();
            session.close_quietly().await;
        })
    }
}

impl fmt::Debug for Spark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spark")
            .field("app_id", &self.app_id)
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}
