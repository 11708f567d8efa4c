//! The HTTP seam between a chat session and the model endpoint.

use bytes::Bytes;
use futures_util::Stream;
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use tokio_stream::StreamExt;

use crate::config::AssistantConfig;
use crate::error::{ChatError, Result};
use crate::providers::ChatRequest;

/// Body chunks as delivered by the transport.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Status and body of an accepted POST. `body` is `None` when the server
/// sent no readable body at all.
pub struct TransportResponse {
    pub status: u16,
    pub body: Option<ByteStream>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Sends one chat request and hands back the streaming response.
pub trait ChatTransport {
    fn post_chat(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<TransportResponse>> + Send;
}

/// reqwest-backed transport: `POST endpoint` with bearer authorization.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &AssistantConfig) -> Result<Self> {
        config.validate()?;
        // No overall timeout: replies stream for as long as the model writes.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone().unwrap_or_default().trim().to_string(),
            api_key: config.api_key.clone().unwrap_or_default(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ChatTransport for HttpTransport {
    async fn post_chat(&self, request: &ChatRequest) -> Result<TransportResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body: ByteStream =
            Box::pin(response.bytes_stream().map(|chunk| chunk.map_err(ChatError::from)));
        Ok(TransportResponse { status, body: Some(body) })
    }
}

/// Collect a whole body as text, for error responses.
pub async fn read_body_text(mut body: ByteStream) -> Result<String> {
    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        bytes.extend_from_slice(&chunk?);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
