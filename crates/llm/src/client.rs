//! HTTP chat client.

use crate::LlmError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{Client, ClientBuilder, RequestBuilder};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const OPENAI_BASE_URL: &str = "https://api.openai.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// An image passed to a multimodal model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    /// Raw bytes
    pub data: Vec<u8>,
    /// Media type, e.g. `image/png`
    pub media_type: String,
}

impl ImageInput {
    /// A PNG image.
    pub fn png(data: Vec<u8>) -> Self {
        Self {
            data,
            media_type: "image/png".to_string(),
        }
    }

    fn base64(&self) -> String {
        STANDARD.encode(&self.data)
    }
}

/// Sampling options for one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerateOptions {
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl GenerateOptions {
    /// Defaults for content generation.
    pub const fn generation() -> Self {
        Self {
            max_tokens: 16384,
            temperature: 0.7,
        }
    }

    /// Defaults for judging: deterministic and shorter.
    pub const fn judging() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.0,
        }
    }
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self::generation()
    }
}

/// A chat-capable model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier as configured.
    fn model(&self) -> &str;

    /// Text-only completion.
    async fn generate(&self, system: &str, user: &str, options: GenerateOptions) -> Result<String, LlmError>;

    /// Completion over labelled images (`Image A:`, `Image B:`, ...) followed
    /// by `user`, with [`GenerateOptions::judging`].
    async fn evaluate_with_images(&self, system: &str, user: &str, images: &[ImageInput]) -> Result<String, LlmError>;
}

/// API flavour spoken by an [`LlmClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// Anthropic Messages API
    Anthropic,
    /// OpenAI-compatible Chat Completions
    OpenAi {
        /// Base URL without the `/v1/...` path
        base_url: String,
    },
}

impl Provider {
    /// Split `provider/model` into a provider and the model name sent on the wire.
    ///
    /// `anthropic/` selects the Messages API, `openai/` is stripped, and any
    /// other identifier is passed through unchanged to an OpenAI-compatible
    /// endpoint.
    pub fn parse(model: &str, openai_base_url: Option<String>) -> (Provider, String) {
        let openai = || Provider::OpenAi {
            base_url: openai_base_url.clone().unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
        };
        match model.split_once('/') {
            Some(("anthropic", name)) => (Provider::Anthropic, name.to_string()),
            Some(("openai", name)) => (openai(), name.to_string()),
            _ => (openai(), model.to_string()),
        }
    }

    fn key_var(&self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAi { .. } => "OPENAI_API_KEY",
        }
    }
}

/// HTTP client bound to one model.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    provider: Provider,
    identifier: String,
    model: String,
    api_key: String,
}

impl LlmClient {
    /// Create a client from a `provider/model` identifier, reading the API key
    /// (and `OPENAI_BASE_URL`) from the environment.
    pub fn from_model(identifier: &str) -> Result<Self, LlmError> {
        let (provider, model) = Provider::parse(identifier, std::env::var("OPENAI_BASE_URL").ok());
        let key_var = provider.key_var();
        let api_key = std::env::var(key_var).map_err(|_| LlmError::MissingApiKey(key_var))?;
        Self::new(provider, identifier, model, api_key)
    }

    /// Create a client with explicit settings.
    pub fn new(
        provider: Provider,
        identifier: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let client = ClientBuilder::new().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            provider,
            identifier: identifier.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    async fn complete(&self, system: &str, content: Value, options: GenerateOptions) -> Result<String, LlmError> {
        debug!(model = %self.identifier, max_tokens = options.max_tokens, "Sending completion request");

        match &self.provider {
            Provider::Anthropic => {
                let body = anthropic_body(&self.model, system, content, options);
                let request = self
                    .client
                    .post(ANTHROPIC_URL)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION);
                anthropic_text(&send(request, &body).await?)
            }
            Provider::OpenAi { base_url } => {
                let body = openai_body(&self.model, system, content, options);
                let request = self
                    .client
                    .post(format!("{}/v1/chat/completions", base_url.trim_end_matches('/')))
                    .bearer_auth(&self.api_key);
                openai_text(&send(request, &body).await?)
            }
        }
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    fn model(&self) -> &str {
        &self.identifier
    }

    async fn generate(&self, system: &str, user: &str, options: GenerateOptions) -> Result<String, LlmError> {
        self.complete(system, Value::String(user.to_string()), options).await
    }

    async fn evaluate_with_images(&self, system: &str, user: &str, images: &[ImageInput]) -> Result<String, LlmError> {
        let content = match self.provider {
            Provider::Anthropic => anthropic_image_content(user, images),
            Provider::OpenAi { .. } => openai_image_content(user, images),
        };
        self.complete(system, content, GenerateOptions::judging()).await
    }
}

async fn send(request: RequestBuilder, body: &Value) -> Result<Value, LlmError> {
    let response = request.json(body).send().await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(LlmError::Api {
            status: status.as_u16(),
            message: api_error_message(&text),
        });
    }

    serde_json::from_str(&text).map_err(|e| LlmError::Parse(e.to_string()))
}

/// Pull `error.message` out of an error body, or fall back to the body itself.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

fn image_label(index: usize) -> String {
    let letter = char::from(b'A' + (index % 26) as u8);
    format!("Image {}:", letter)
}

fn anthropic_body(model: &str, system: &str, content: Value, options: GenerateOptions) -> Value {
    json!({
        "model": model,
        "max_tokens": options.max_tokens,
        "temperature": options.temperature,
        "system": system,
        "messages": [{"role": "user", "content": content}],
    })
}

fn openai_body(model: &str, system: &str, content: Value, options: GenerateOptions) -> Value {
    json!({
        "model": model,
        "max_tokens": options.max_tokens,
        "temperature": options.temperature,
        "messages": [
            {"role": "system", "content": system},
            {"role": "user", "content": content},
        ],
    })
}

fn anthropic_image_content(user: &str, images: &[ImageInput]) -> Value {
    let mut blocks = Vec::with_capacity(images.len() * 2 + 1);
    for (i, image) in images.iter().enumerate() {
        blocks.push(json!({"type": "text", "text": image_label(i)}));
        blocks.push(json!({
            "type": "image",
            "source": {"type": "base64", "media_type": image.media_type, "data": image.base64()},
        }));
    }
    blocks.push(json!({"type": "text", "text": user}));
    Value::Array(blocks)
}

fn openai_image_content(user: &str, images: &[ImageInput]) -> Value {
    let mut blocks = Vec::with_capacity(images.len() * 2 + 1);
    for (i, image) in images.iter().enumerate() {
        blocks.push(json!({"type": "text", "text": image_label(i)}));
        blocks.push(json!({
            "type": "image_url",
            "image_url": {"url": format!("data:{};base64,{}", image.media_type, image.base64())},
        }));
    }
    blocks.push(json!({"type": "text", "text": user}));
    Value::Array(blocks)
}

fn anthropic_text(response: &Value) -> Result<String, LlmError> {
    let blocks = response["content"]
        .as_array()
        .ok_or_else(|| LlmError::Parse("missing content array".to_string()))?;

    let text: String = blocks
        .iter()
        .filter(|b| b["type"] == "text")
        .filter_map(|b| b["text"].as_str())
        .collect();

    if text.is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text)
}

fn openai_text(response: &Value) -> Result<String, LlmError> {
    let message = &response["choices"][0]["message"];
    if message.is_null() {
        return Err(LlmError::Parse("missing choices[0].message".to_string()));
    }
    match message["content"].as_str() {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(LlmError::EmptyResponse),
    }
}
