//! Periodic sweep of generations stuck in `running`.
//!
//! A generation whose runner died (process crash, lost provider
//! connection) would otherwise stay `running` forever. This task
//! forcibly fails anything running longer than the policy bound. The
//! sweep is a background task, not a cooperative check: the stuck
//! runner does not need to participate.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use weave_core::generation::{RUNNING_TIMEOUT, SWEEP_INTERVAL};
use weave_db::repositories::GenerationRepo;
use weave_db::DbPool;
use weave_events::{EventBus, LifecycleEvent, EVENT_GENERATION_TIMED_OUT};

/// Run the stuck-generation sweep loop until `cancel` is triggered.
pub async fn run(pool: DbPool, bus: Arc<EventBus>, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = SWEEP_INTERVAL.as_secs(),
        timeout_secs = RUNNING_TIMEOUT.as_secs(),
        "generation timeout sweep started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("generation timeout sweep stopping");
                break;
            }
            _ = interval.tick() => {
                let cutoff = Utc::now()
                    - chrono::Duration::from_std(RUNNING_TIMEOUT)
                        .expect("running timeout fits in chrono duration");
                match GenerationRepo::sweep_stuck(&pool, cutoff).await {
                    Ok(swept) if swept.is_empty() => {
                        tracing::debug!("timeout sweep: nothing stuck");
                    }
                    Ok(swept) => {
                        tracing::warn!(count = swept.len(), "timeout sweep: generations failed");
                        for item in &swept {
                            bus.publish(LifecycleEvent::new(
                                EVENT_GENERATION_TIMED_OUT,
                                item.generation_id,
                                item.snippet_id,
                                item.project_id,
                            ));
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "timeout sweep failed");
                    }
                }
            }
        }
    }
}
