//! Handlers for generation requests, status, cancellation, and
//! history.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use weave_core::catalog;
use weave_core::types::DbId;
use weave_core::validation::{validate_input, Violations};
use weave_db::models::generation::{Generation, GenerationHistoryQuery, RequestGeneration};
use weave_db::models::status::GenerationStatus;
use weave_db::repositories::{GenerationRepo, ProjectRepo, SnippetRepo};
use weave_events::{LifecycleEvent, EVENT_GENERATION_CANCELLED, EVENT_GENERATION_QUEUED};

use crate::error::AppResult;
use crate::middleware::auth::Principal;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/projects/{project_id}/snippets/{id}/generations
///
/// Validation runs before anything is stored: a bad prompt or an
/// unknown model creates no generation record. The call returns as soon
/// as the request is queued; execution is asynchronous.
pub async fn request(
    principal: Principal,
    State(state): State<AppState>,
    Path((project_id, snippet_id)): Path<(DbId, DbId)>,
    Json(input): Json<RequestGeneration>,
) -> AppResult<(StatusCode, Json<DataResponse<Generation>>)> {
    validate_input(&input)?;
    let model = catalog::find_model(&input.model_id).ok_or_else(|| {
        weave_core::error::CoreError::Validation(Violations::single(
            "model_id",
            format!("unknown model '{}'", input.model_id),
        ))
    })?;

    ProjectRepo::get_for_update(&state.pool, principal.user_id, project_id).await?;
    let snippet = SnippetRepo::find_in_project(&state.pool, project_id, snippet_id)
        .await?
        .ok_or(weave_core::error::CoreError::NotFound {
            entity: "Snippet",
            id: snippet_id,
        })?;

    let generation =
        GenerationRepo::create(&state.pool, snippet.id, model.modality.as_str(), &input).await?;

    state.event_bus.publish(LifecycleEvent::new(
        EVENT_GENERATION_QUEUED,
        generation.id,
        snippet.id,
        project_id,
    ));
    tracing::info!(
        generation_id = generation.id,
        snippet_id = snippet.id,
        model_id = %generation.model_id,
        "generation queued"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: generation })))
}

/// GET /api/v1/generations/{id}
///
/// Terminal generations always answer with the same status and
/// `result_version_id`.
pub async fn get_status(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Generation>>> {
    let generation = GenerationRepo::get_visible(&state.pool, principal.user_id, id).await?;
    Ok(Json(DataResponse { data: generation }))
}

/// POST /api/v1/generations/{id}/cancel
///
/// Cancels a queued or running generation; cancelling one that already
/// reached a terminal state is a no-op and returns the row unchanged.
pub async fn cancel(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Generation>>> {
    let generation = GenerationRepo::cancel(&state.pool, principal.user_id, id).await?;

    if generation.status_id == GenerationStatus::Cancelled.id() {
        // Project id is only needed for the event; resolve it lazily.
        if let Some(snippet) = SnippetRepo::find_any(&state.pool, generation.snippet_id).await? {
            state.event_bus.publish(LifecycleEvent::new(
                EVENT_GENERATION_CANCELLED,
                generation.id,
                generation.snippet_id,
                snippet.project_id,
            ));
        }
        tracing::info!(generation_id = generation.id, "generation cancelled");
    }

    Ok(Json(DataResponse { data: generation }))
}

/// GET /api/v1/projects/{project_id}/snippets/{id}/generations
///
/// Past generations for a snippet, newest first.
pub async fn history(
    principal: Principal,
    State(state): State<AppState>,
    Path((project_id, snippet_id)): Path<(DbId, DbId)>,
    Query(params): Query<GenerationHistoryQuery>,
) -> AppResult<Json<DataResponse<Vec<Generation>>>> {
    SnippetRepo::get(&state.pool, principal.user_id, project_id, snippet_id).await?;
    let generations =
        GenerationRepo::list_for_snippet(&state.pool, snippet_id, params.limit).await?;
    Ok(Json(DataResponse { data: generations }))
}
