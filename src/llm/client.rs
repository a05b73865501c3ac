use crate::error::{CampaignMetricsError, Result};
use crate::llm::types::*;
use futures::StreamExt;
use log::{debug, warn};
use reqwest::Client;
use tokio::sync::mpsc::Sender;

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub base_url: String,
    pub api_version: String,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            base_url: ANTHROPIC_BASE_URL.to_string(),
            api_version: ANTHROPIC_API_VERSION.to_string(),
        }
    }

    /// Reads `ANTHROPIC_API_KEY` and, if set, `ANTHROPIC_MODEL`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(CampaignMetricsError::MissingApiKey)?;

        let mut config = Self::new(api_key);
        if let Ok(model) = std::env::var("ANTHROPIC_MODEL") {
            config.model = model;
        }
        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Thin wrapper over the Anthropic Messages API.
#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    config: LlmConfig,
}

impl AnthropicClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn request(&self, body: &MessagesRequest<'_>) -> reqwest::RequestBuilder {
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        self.client
            .post(url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(body)
    }

    pub async fn create_message(&self, system: &str, messages: &[ApiMessage]) -> Result<String> {
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system,
            messages,
            stream: false,
        };

        debug!(
            "Sending {} messages to {}",
            messages.len(),
            self.config.model
        );

        let res = self.request(&body).send().await?;
        let status = res.status();
        if !status.is_success() {
            let text = res.text().await?;
            return Err(api_error(status.as_u16(), &text));
        }

        let body: MessagesResponse = res.json().await?;
        Ok(body.text())
    }

    /// Streams the reply, forwarding each text delta to `events` and returning the full text.
    pub async fn stream_message(
        &self,
        system: &str,
        messages: &[ApiMessage],
        events: &Sender<ChatEvent>,
    ) -> Result<String> {
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system,
            messages,
            stream: true,
        };

        let res = self.request(&body).send().await?;
        let status = res.status();
        if !status.is_success() {
            let text = res.text().await?;
            return Err(api_error(status.as_u16(), &text));
        }

        let mut stream = res.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut full_text = String::new();
        let mut forwarder = DeltaForwarder::new(events);

        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw);

                match parse_sse_line(line.trim_end())? {
                    Some(SseData::Text(text)) => {
                        full_text.push_str(&text);
                        forwarder.forward(text).await;
                    }
                    Some(SseData::Stop) => return Ok(full_text),
                    None => {}
                }
            }
        }

        Ok(full_text)
    }
}

/// Sends text deltas until the receiver goes away, then keeps quiet.
struct DeltaForwarder<'a> {
    events: &'a Sender<ChatEvent>,
    open: bool,
}

impl<'a> DeltaForwarder<'a> {
    fn new(events: &'a Sender<ChatEvent>) -> Self {
        Self { events, open: true }
    }

    async fn forward(&mut self, text: String) {
        if !self.open {
            return;
        }
        if self.events.send(ChatEvent::Delta { text }).await.is_err() {
            warn!("Stream receiver dropped; finishing without forwarding");
            self.open = false;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SseData {
    Text(String),
    Stop,
}

/// Interprets one server-sent-event line. Only `data:` lines carry payloads.
pub(crate) fn parse_sse_line(line: &str) -> Result<Option<SseData>> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };

    let event: StreamEvent = serde_json::from_str(data.trim())?;
    match event {
        StreamEvent::ContentBlockDelta {
            delta: Delta::TextDelta { text },
        } => Ok(Some(SseData::Text(text))),
        StreamEvent::MessageStop => Ok(Some(SseData::Stop)),
        StreamEvent::Error { error } => Err(CampaignMetricsError::Stream(format!(
            "{}: {}",
            error.kind, error.message
        ))),
        _ => Ok(None),
    }
}

fn api_error(status: u16, body: &str) -> CampaignMetricsError {
    let message = serde_json::from_str::<ApiErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string());
    CampaignMetricsError::Api { status, message }
}
