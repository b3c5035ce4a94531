//! Scriptable in-memory provider for tests and local development.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::{ImageOutput, ModelProvider, ProviderOutput, ProviderRequest};

/// A provider that replays a queue of canned outcomes.
///
/// Each call to [`generate`](ModelProvider::generate) pops the front of
/// the queue; an empty queue behaves like an unreachable backend, which
/// keeps a mis-scripted test failing loudly instead of hanging.
#[derive(Default)]
pub struct ScriptedProvider {
    outcomes: Mutex<VecDeque<Result<ProviderOutput, ProviderError>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful text outcome.
    pub fn push_text(&self, text: impl Into<String>) {
        self.push(Ok(ProviderOutput::text(text)));
    }

    /// Queue a successful image outcome.
    pub fn push_image(&self, url: impl Into<String>, width: i64, height: i64) {
        self.push(Ok(ProviderOutput {
            text: None,
            image: Some(ImageOutput {
                url: url.into(),
                width,
                height,
                aspect_ratio: width as f64 / height as f64,
            }),
        }));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: ProviderError) {
        self.push(Err(error));
    }

    /// Queue a raw outcome.
    pub fn push(&self, outcome: Result<ProviderOutput, ProviderError>) {
        self.outcomes
            .lock()
            .expect("scripted provider lock poisoned")
            .push_back(outcome);
    }

    /// How many times `generate` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn generate(&self, _request: &ProviderRequest) -> Result<ProviderOutput, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .expect("scripted provider lock poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                Err(ProviderError::Connection(
                    "scripted provider has no outcome queued".into(),
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_core::catalog::Modality;

    fn request() -> ProviderRequest {
        ProviderRequest {
            model_id: "gpt-4o-mini".into(),
            modality: Modality::TextToText,
            prompt: "expand".into(),
            system_prompt: None,
            temperature: None,
            max_tokens: None,
        }
    }

    #[tokio::test]
    async fn replays_outcomes_in_order() {
        let provider = ScriptedProvider::new();
        provider.push_text("first");
        provider.push_error(ProviderError::Timeout);

        assert_eq!(
            provider.generate(&request()).await.unwrap().text.as_deref(),
            Some("first")
        );
        assert!(matches!(
            provider.generate(&request()).await,
            Err(ProviderError::Timeout)
        ));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn empty_queue_acts_unreachable() {
        let provider = ScriptedProvider::new();
        assert!(matches!(
            provider.generate(&request()).await,
            Err(ProviderError::Connection(_))
        ));
    }
}
