//! Model-provider capability boundary.
//!
//! The orchestrator talks to "something that can turn a prompt into
//! content" through the [`ModelProvider`] trait and nothing else. Two
//! implementations ship here: [`HttpProvider`] for an OpenAI-style HTTP
//! backend, and [`ScriptedProvider`] for tests.

pub mod error;
pub mod http;
pub mod scripted;

pub use error::ProviderError;
pub use http::HttpProvider;
pub use scripted::ScriptedProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use weave_core::catalog::Modality;

/// Everything a provider needs to produce content for one generation.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderRequest {
    pub model_id: String,
    pub modality: Modality,
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i64>,
}

/// Reference to a generated image held in external object storage.
///
/// Only the reference and its dimensions travel through this service;
/// the bytes stay with the object store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageOutput {
    pub url: String,
    pub width: i64,
    pub height: i64,
    pub aspect_ratio: f64,
}

/// What a provider produced: text, an image reference, or both.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderOutput {
    pub text: Option<String>,
    pub image: Option<ImageOutput>,
}

impl ProviderOutput {
    /// Output carrying only text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            image: None,
        }
    }
}

/// An opaque, possibly slow, possibly failing content backend.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Produce content for one generation request.
    ///
    /// Implementations must not retry internally; the orchestrator owns
    /// the retry/backoff policy and classifies failures via
    /// [`ProviderError::is_transient`].
    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderOutput, ProviderError>;
}
