//! Generation (asynchronous work item) model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;
use weave_core::types::{DbId, Timestamp};

use crate::models::status::StatusId;

/// A generation row from the `generations` table.
///
/// Tracks one request through `queued -> running -> {succeeded |
/// failed | cancelled}`. Terminal rows never change again, which makes
/// status reads idempotent.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Generation {
    pub id: DbId,
    pub snippet_id: DbId,
    pub model_id: String,
    pub modality: String,
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i64>,
    pub status_id: StatusId,
    /// Provider attempts made so far (retries included).
    pub attempts: i64,
    /// Set iff the generation succeeded.
    pub result_version_id: Option<DbId>,
    /// Set iff the generation failed.
    pub error_message: Option<String>,
    pub claimed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for requesting a generation on a snippet.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RequestGeneration {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub model_id: String,
    #[validate(length(min = 1, max = 50000, message = "must be 1-50000 characters"))]
    pub prompt: String,
    #[validate(length(max = 10000, message = "must be at most 10000 characters"))]
    pub system_prompt: Option<String>,
    #[validate(range(min = 0.0, max = 2.0, message = "must be between 0 and 2"))]
    pub temperature: Option<f64>,
    #[validate(range(min = 1, max = 8192, message = "must be between 1 and 8192"))]
    pub max_tokens: Option<i64>,
}

/// Query parameters for a snippet's generation history.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationHistoryQuery {
    pub limit: Option<i64>,
}

/// Provider output handed to the success write-back.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub image_width: Option<i64>,
    pub image_height: Option<i64>,
    pub image_aspect_ratio: Option<f64>,
}

/// Outcome of attempting the success write-back.
#[derive(Debug)]
pub enum WriteBack {
    /// Version appended, snippet repointed, generation marked
    /// succeeded.
    Committed(super::version::Version),
    /// The generation reached a terminal state first (cancelled or
    /// swept); nothing was written.
    Discarded,
}

/// A running generation forcibly failed by the timeout sweep.
#[derive(Debug, Clone, FromRow)]
pub struct SweptGeneration {
    pub generation_id: DbId,
    pub snippet_id: DbId,
    pub project_id: DbId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_core::error::CoreError;
    use weave_core::validation::validate_input;

    fn base_request() -> RequestGeneration {
        RequestGeneration {
            model_id: "gpt-4o-mini".to_string(),
            prompt: "expand".to_string(),
            system_prompt: None,
            temperature: Some(0.7),
            max_tokens: Some(1024),
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(validate_input(&base_request()).is_ok());
    }

    #[test]
    fn empty_prompt_rejected() {
        let mut input = base_request();
        input.prompt = String::new();
        assert!(validate_input(&input).is_err());
    }

    #[test]
    fn temperature_out_of_range_rejected() {
        let mut input = base_request();
        input.temperature = Some(3.0);
        assert!(validate_input(&input).is_err());
    }

    #[test]
    fn max_tokens_out_of_range_rejected() {
        let mut input = base_request();
        input.max_tokens = Some(0);
        assert!(validate_input(&input).is_err());
    }

    #[test]
    fn every_violation_reported_at_once() {
        let input = RequestGeneration {
            model_id: String::new(),
            prompt: String::new(),
            system_prompt: None,
            temperature: Some(5.0),
            max_tokens: Some(100_000),
        };
        match validate_input(&input).unwrap_err() {
            CoreError::Validation(violations) => assert_eq!(violations.0.len(), 4),
            other => panic!("expected Validation, got {other:?}"),
        }
    }
}
