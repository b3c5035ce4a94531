//! Admin-only maintenance handlers.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use weave_core::error::CoreError;
use weave_core::generation::RUNNING_TIMEOUT;
use weave_db::repositories::GenerationRepo;
use weave_events::{LifecycleEvent, EVENT_GENERATION_TIMED_OUT};

use crate::error::AppResult;
use crate::middleware::auth::Principal;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SweepReport {
    pub swept: usize,
}

/// POST /api/v1/admin/generations/sweep
///
/// Force one stuck-generation sweep immediately instead of waiting for
/// the background interval. Admin role required.
pub async fn sweep_generations(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<SweepReport>>> {
    if !principal.is_admin() {
        return Err(CoreError::Forbidden("admin role required".to_string()).into());
    }

    let cutoff = Utc::now()
        - chrono::Duration::from_std(RUNNING_TIMEOUT)
            .expect("running timeout fits in chrono duration");
    let swept = GenerationRepo::sweep_stuck(&state.pool, cutoff).await?;

    for item in &swept {
        state.event_bus.publish(LifecycleEvent::new(
            EVENT_GENERATION_TIMED_OUT,
            item.generation_id,
            item.snippet_id,
            item.project_id,
        ));
    }
    if !swept.is_empty() {
        tracing::warn!(count = swept.len(), "stuck generations swept on demand");
    }

    Ok(Json(DataResponse {
        data: SweepReport { swept: swept.len() },
    }))
}
