use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::debug;

use crate::decoder::{DecoderConfig, DEFAULT_MAX_BUFFERED_BYTES};
use crate::stream::ReplyStream;
use crate::{AgentRequest, BreezeAiError, StreamDeltaHandler, StreamSummary};

pub const DEFAULT_AGENT_URL: &str =
    "https://millions-screeching-vultur.mastra.cloud/api/agents/weatherAgent/stream";
pub const DEV_PLAYGROUND_HEADER: &str = "x-mastra-dev-playground";

#[async_trait]
/// Trait contract for anything that can stream an agent reply.
pub trait AgentClient: Send + Sync {
    async fn open_reply(&self, request: &AgentRequest) -> Result<ReplyStream, BreezeAiError>;

    /// Streams a whole reply, calling `on_chunk` once per non-empty delta.
    async fn stream_reply(
        &self,
        request: &AgentRequest,
        on_chunk: StreamDeltaHandler,
    ) -> Result<StreamSummary, BreezeAiError> {
        let mut reply = self.open_reply(request).await?;
        while let Some(batch) = reply.next_deltas().await {
            for delta in batch? {
                on_chunk(delta);
            }
        }
        Ok(reply.into_summary())
    }
}

#[derive(Debug, Clone)]
/// Connection settings for `AgentStreamClient`.
pub struct AgentClientConfig {
    pub endpoint: String,
    /// Whole-request timeout including the streamed body; 0 disables it.
    pub request_timeout_ms: u64,
    pub max_buffered_bytes: usize,
    pub dev_playground_header: bool,
}

impl Default for AgentClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_AGENT_URL.to_string(),
            request_timeout_ms: 0,
            max_buffered_bytes: DEFAULT_MAX_BUFFERED_BYTES,
            dev_playground_header: true,
        }
    }
}

#[derive(Debug, Clone)]
/// HTTP client for the agent's streaming endpoint.
pub struct AgentStreamClient {
    client: reqwest::Client,
    config: AgentClientConfig,
}

impl AgentStreamClient {
    pub fn new(config: AgentClientConfig) -> Result<Self, BreezeAiError> {
        let endpoint = config.endpoint.trim();
        if endpoint.is_empty() {
            return Err(BreezeAiError::InvalidConfig(
                "agent endpoint must not be empty".to_string(),
            ));
        }
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(BreezeAiError::InvalidConfig(format!(
                "agent endpoint must be an http(s) URL: {endpoint}"
            )));
        }
        if config.max_buffered_bytes == 0 {
            return Err(BreezeAiError::InvalidConfig(
                "max buffered bytes must be greater than zero".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if config.dev_playground_header {
            headers.insert(DEV_PLAYGROUND_HEADER, HeaderValue::from_static("true"));
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if config.request_timeout_ms > 0 {
            builder = builder.timeout(std::time::Duration::from_millis(config.request_timeout_ms));
        }
        let client = builder.build()?;

        Ok(Self { client, config })
    }

    fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig {
            max_buffered_bytes: self.config.max_buffered_bytes,
        }
    }
}

#[async_trait]
impl AgentClient for AgentStreamClient {
    async fn open_reply(&self, request: &AgentRequest) -> Result<ReplyStream, BreezeAiError> {
        let url = self.config.endpoint.trim();
        debug!(
            url,
            messages = request.messages.len(),
            thread_id = %request.thread_id,
            "sending weather agent request"
        );
        let response = self.client.post(url).json(request).send().await?;

        let status = response.status();
        debug!(status = status.as_u16(), "weather agent responded");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BreezeAiError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        if is_null_body_status(status) {
            return Err(BreezeAiError::StreamUnavailable);
        }

        let chunks = response
            .bytes_stream()
            .map(|chunk| {
                chunk.map(|bytes| bytes.to_vec()).map_err(|error| {
                    BreezeAiError::Decode(format!("failed to read reply stream: {error}"))
                })
            })
            .boxed();
        Ok(ReplyStream::new(chunks, self.decoder_config()))
    }
}

fn is_null_body_status(status: StatusCode) -> bool {
    matches!(status, StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT)
}
