//! Provider error taxonomy with transient/terminal classification.

/// Errors from the model-provider layer.
///
/// The orchestrator retries transient failures with backoff and fails
/// the generation immediately on terminal ones.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider call exceeded the per-attempt timeout.
    #[error("provider call timed out")]
    Timeout,

    /// The provider is shedding load (HTTP 429).
    #[error("provider rate limit: {0}")]
    RateLimited(String),

    /// The request never reached the provider (network, DNS, TLS).
    #[error("provider connection error: {0}")]
    Connection(String),

    /// The provider answered with a non-2xx status.
    #[error("provider API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The model id is not known to the provider.
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// The provider rejected the prompt on content-policy grounds.
    #[error("content policy rejection: {0}")]
    ContentPolicy(String),

    /// The requested modality has no backend route.
    #[error("unsupported modality: {0}")]
    Unsupported(String),

    /// The provider answered 2xx but the body was not in the expected
    /// shape.
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Whether the orchestrator should retry this failure.
    ///
    /// Timeouts, rate limits, connection failures, and provider-side
    /// 5xx responses are worth retrying; everything else will fail the
    /// same way on every attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout
            | ProviderError::RateLimited(_)
            | ProviderError::Connection(_) => true,
            ProviderError::Api { status, .. } => *status >= 500,
            ProviderError::UnknownModel(_)
            | ProviderError::ContentPolicy(_)
            | ProviderError::Unsupported(_)
            | ProviderError::Malformed(_) => false,
        }
    }
}
