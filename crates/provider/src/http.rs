//! HTTP implementation of the model-provider capability.
//!
//! Speaks the OpenAI-style REST shape: `POST /chat/completions` for
//! text models and `POST /images/generations` for image models. The
//! base URL and API key come from configuration, so any compatible
//! gateway can stand in.

use async_trait::async_trait;

use weave_core::catalog::Modality;

use crate::error::ProviderError;
use crate::{ImageOutput, ModelProvider, ProviderOutput, ProviderRequest};

/// Default image size requested from image models.
const DEFAULT_IMAGE_SIZE: &str = "1024x1024";

/// HTTP client for an OpenAI-compatible generation backend.
pub struct HttpProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpProvider {
    /// Create a provider targeting `base_url` (no trailing slash).
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    /// Create a provider reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling).
    pub fn with_client(client: reqwest::Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let mut request = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), path, "provider request failed");
            return Err(classify_http_failure(status.as_u16(), text));
        }

        serde_json::from_str(&text)
            .map_err(|e| ProviderError::Malformed(format!("invalid JSON: {e}")))
    }

    async fn generate_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderOutput, ProviderError> {
        let mut messages = Vec::new();
        if let Some(system) = &request.system_prompt {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": request.prompt }));

        let body = serde_json::json!({
            "model": request.model_id,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        let response = self.post("/chat/completions", &body).await?;
        let text = parse_chat_response(&response)?;
        Ok(ProviderOutput::text(text))
    }

    async fn generate_image(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderOutput, ProviderError> {
        let body = serde_json::json!({
            "model": request.model_id,
            "prompt": request.prompt,
            "n": 1,
            "size": DEFAULT_IMAGE_SIZE,
        });

        let response = self.post("/images/generations", &body).await?;
        let image = parse_image_response(&response)?;
        Ok(ProviderOutput {
            text: None,
            image: Some(image),
        })
    }
}

#[async_trait]
impl ModelProvider for HttpProvider {
    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderOutput, ProviderError> {
        match request.modality {
            Modality::TextToText => self.generate_text(request).await,
            Modality::TextToImage => self.generate_image(request).await,
            other => Err(ProviderError::Unsupported(other.to_string())),
        }
    }
}

/// Map a non-2xx provider response onto the error taxonomy.
fn classify_http_failure(status: u16, body: String) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited(body),
        404 => ProviderError::UnknownModel(body),
        400 if body.contains("content_policy") => ProviderError::ContentPolicy(body),
        _ => ProviderError::Api { status, body },
    }
}

/// Extract the assistant text from a chat-completions response.
fn parse_chat_response(response: &serde_json::Value) -> Result<String, ProviderError> {
    response
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ProviderError::Malformed("missing choices[0].message.content".into()))
}

/// Extract the image reference and dimensions from an image-generation
/// response.
fn parse_image_response(response: &serde_json::Value) -> Result<ImageOutput, ProviderError> {
    let entry = response
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| ProviderError::Malformed("missing data[0]".into()))?;

    let url = entry
        .get("url")
        .and_then(|u| u.as_str())
        .ok_or_else(|| ProviderError::Malformed("missing data[0].url".into()))?
        .to_string();

    let (width, height) = entry
        .get("size")
        .and_then(|s| s.as_str())
        .and_then(parse_size)
        .unwrap_or_else(|| {
            // Providers that omit the size echo get the requested default.
            parse_size(DEFAULT_IMAGE_SIZE).expect("default size parses")
        });

    Ok(ImageOutput {
        url,
        width,
        height,
        aspect_ratio: width as f64 / height as f64,
    })
}

/// Parse a `"WIDTHxHEIGHT"` size string.
fn parse_size(size: &str) -> Option<(i64, i64)> {
    let (w, h) = size.split_once('x')?;
    let width = w.parse().ok()?;
    let height: i64 = h.parse().ok()?;
    if width <= 0 || height <= 0 {
        return None;
    }
    Some((width, height))
}
