//! Generation runner: claims queued generations, executes them against
//! the model provider, and commits the result.
//!
//! The runner holds no lock on a snippet while a provider call is in
//! flight; only the final write-back transaction is serialized against
//! other snippet writers. Retries of transient provider failures happen
//! while the generation stays `running`; terminal failures and
//! exhausted retries fail it with the error recorded.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use weave_core::error::CoreError;
use weave_core::generation::{
    backoff_delay, MAX_ATTEMPTS, PROVIDER_ATTEMPT_TIMEOUT, WRITEBACK_RETRIES,
};
use weave_core::types::DbId;
use weave_db::models::generation::{Generation, GenerationResult, WriteBack};
use weave_db::models::status::GenerationStatus;
use weave_db::repositories::{GenerationRepo, SnippetRepo};
use weave_db::DbPool;
use weave_events::{
    EventBus, LifecycleEvent, EVENT_GENERATION_FAILED, EVENT_GENERATION_SUCCEEDED,
};
use weave_provider::{ModelProvider, ProviderError, ProviderOutput, ProviderRequest};

/// Default polling interval while the queue is empty.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Executes queued generations one at a time.
///
/// A single long-lived Tokio task per process; the claim update keeps
/// multiple processes from running the same request.
pub struct GenerationRunner {
    pool: DbPool,
    provider: Arc<dyn ModelProvider>,
    bus: Arc<EventBus>,
    poll_interval: Duration,
}

impl GenerationRunner {
    /// Create a runner with the default poll interval.
    pub fn new(pool: DbPool, provider: Arc<dyn ModelProvider>, bus: Arc<EventBus>) -> Self {
        Self {
            pool,
            provider,
            bus,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Run the claim/execute loop until the cancellation token fires.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "generation runner started"
        );
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("generation runner shutting down");
                    break;
                }
                did_work = self.tick() => {
                    match did_work {
                        // Queue drained: sleep before polling again.
                        Ok(false) => tokio::time::sleep(self.poll_interval).await,
                        Ok(true) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "runner tick failed");
                            tokio::time::sleep(self.poll_interval).await;
                        }
                    }
                }
            }
        }
    }

    /// Claim and fully process at most one queued generation.
    ///
    /// Returns `Ok(true)` if a generation was processed. Exposed so
    /// tests can drive the engine deterministically.
    pub async fn tick(&self) -> Result<bool, CoreError> {
        let Some(generation) = GenerationRepo::claim_next(&self.pool).await? else {
            return Ok(false);
        };
        self.execute(generation).await?;
        Ok(true)
    }

    /// Execute one claimed generation to a terminal state.
    async fn execute(&self, generation: Generation) -> Result<(), CoreError> {
        let request = match build_request(&generation) {
            Ok(r) => r,
            Err(message) => {
                self.fail_with_event(&generation, &message).await?;
                return Ok(());
            }
        };

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            GenerationRepo::record_attempt(&self.pool, generation.id, attempt as i64).await?;

            let outcome =
                tokio::time::timeout(PROVIDER_ATTEMPT_TIMEOUT, self.provider.generate(&request))
                    .await
                    .unwrap_or(Err(ProviderError::Timeout));

            match outcome {
                Ok(output) => {
                    self.write_back(&generation, output).await?;
                    return Ok(());
                }
                Err(error) if error.is_transient() && attempt < MAX_ATTEMPTS => {
                    tracing::warn!(
                        generation_id = generation.id,
                        attempt,
                        error = %error,
                        "transient provider failure, backing off"
                    );
                    tokio::time::sleep(backoff_delay(attempt)).await;

                    // The owner may have cancelled during the backoff;
                    // skip further provider calls if so.
                    let current = GenerationRepo::find_by_id(&self.pool, generation.id).await?;
                    let still_running = current
                        .map(|g| g.status_id == GenerationStatus::Running.id())
                        .unwrap_or(false);
                    if !still_running {
                        tracing::info!(
                            generation_id = generation.id,
                            "generation no longer running, abandoning retries"
                        );
                        return Ok(());
                    }
                }
                Err(error) => {
                    self.fail_with_event(&generation, &error.to_string()).await?;
                    return Ok(());
                }
            }
        }
    }

    /// Commit a successful provider output, retrying bounded revision
    /// races against concurrent snippet writers.
    async fn write_back(
        &self,
        generation: &Generation,
        output: ProviderOutput,
    ) -> Result<(), CoreError> {
        let result = to_generation_result(output);

        for round in 0..WRITEBACK_RETRIES {
            match GenerationRepo::commit_success(&self.pool, generation.id, &result).await {
                Ok(WriteBack::Committed(version)) => {
                    self.publish(generation, EVENT_GENERATION_SUCCEEDED, Some(version.id))
                        .await?;
                    tracing::info!(
                        generation_id = generation.id,
                        version_id = version.id,
                        "generation succeeded"
                    );
                    return Ok(());
                }
                Ok(WriteBack::Discarded) => {
                    // Cancellation or sweep won the terminal-state race.
                    tracing::info!(generation_id = generation.id, "write-back discarded");
                    return Ok(());
                }
                Err(CoreError::Conflict(_)) => {
                    tracing::debug!(
                        generation_id = generation.id,
                        round,
                        "write-back lost a revision race, retrying"
                    );
                }
                Err(other) => return Err(other),
            }
        }

        self.fail_with_event(generation, "write-back contention exhausted retries")
            .await
    }

    /// Fail the generation (if it is still non-terminal) and publish
    /// the event.
    async fn fail_with_event(
        &self,
        generation: &Generation,
        error: &str,
    ) -> Result<(), CoreError> {
        let failed = GenerationRepo::fail(&self.pool, generation.id, error).await?;
        if failed {
            tracing::warn!(generation_id = generation.id, error, "generation failed");
            self.publish(generation, EVENT_GENERATION_FAILED, None).await?;
        }
        Ok(())
    }

    async fn publish(
        &self,
        generation: &Generation,
        event_type: &'static str,
        version_id: Option<DbId>,
    ) -> Result<(), CoreError> {
        let project_id = SnippetRepo::find_any(&self.pool, generation.snippet_id)
            .await?
            .map(|s| s.project_id)
            .unwrap_or_default();
        let mut event =
            LifecycleEvent::new(event_type, generation.id, generation.snippet_id, project_id);
        if let Some(version_id) = version_id {
            event = event.with_payload(serde_json::json!({ "result_version_id": version_id }));
        }
        self.bus.publish(event);
        Ok(())
    }
}

/// Build the provider request from a stored generation row.
///
/// Fails (terminally) if the stored modality no longer parses — that
/// can only happen if the catalog changed underneath a queued row.
fn build_request(generation: &Generation) -> Result<ProviderRequest, String> {
    let modality = generation
        .modality
        .parse()
        .map_err(|e: String| format!("stored modality is invalid: {e}"))?;
    Ok(ProviderRequest {
        model_id: generation.model_id.clone(),
        modality,
        prompt: generation.prompt.clone(),
        system_prompt: generation.system_prompt.clone(),
        temperature: generation.temperature,
        max_tokens: generation.max_tokens,
    })
}

fn to_generation_result(output: ProviderOutput) -> GenerationResult {
    let (image_url, image_width, image_height, image_aspect_ratio) = match output.image {
        Some(image) => (
            Some(image.url),
            Some(image.width),
            Some(image.height),
            Some(image.aspect_ratio),
        ),
        None => (None, None, None, None),
    };
    GenerationResult {
        text: output.text,
        image_url,
        image_width,
        image_height,
        image_aspect_ratio,
    }
}
