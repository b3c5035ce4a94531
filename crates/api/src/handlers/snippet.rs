//! Handlers for the `/projects/{project_id}/snippets` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use weave_core::types::DbId;
use weave_core::validation::validate_input;
use weave_db::models::snippet::{CreateSnippet, Snippet, UpdateSnippet};
use weave_db::repositories::SnippetRepo;

use crate::error::AppResult;
use crate::middleware::auth::Principal;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/projects/{project_id}/snippets
pub async fn create(
    principal: Principal,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Json(input): Json<CreateSnippet>,
) -> AppResult<(StatusCode, Json<DataResponse<Snippet>>)> {
    validate_input(&input)?;
    let snippet = SnippetRepo::create(&state.pool, principal.user_id, project_id, &input).await?;
    tracing::info!(snippet_id = snippet.id, project_id, "snippet created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: snippet })))
}

/// GET /api/v1/projects/{project_id}/snippets
pub async fn list_by_project(
    principal: Principal,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Snippet>>>> {
    let snippets =
        SnippetRepo::list_by_project(&state.pool, principal.user_id, project_id).await?;
    Ok(Json(DataResponse { data: snippets }))
}

/// GET /api/v1/projects/{project_id}/snippets/{id}
pub async fn get_by_id(
    principal: Principal,
    State(state): State<AppState>,
    Path((project_id, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<Snippet>>> {
    let snippet = SnippetRepo::get(&state.pool, principal.user_id, project_id, id).await?;
    Ok(Json(DataResponse { data: snippet }))
}

/// PUT /api/v1/projects/{project_id}/snippets/{id}
pub async fn update(
    principal: Principal,
    State(state): State<AppState>,
    Path((project_id, id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateSnippet>,
) -> AppResult<Json<DataResponse<Snippet>>> {
    validate_input(&input)?;
    let snippet =
        SnippetRepo::update(&state.pool, principal.user_id, project_id, id, &input).await?;
    Ok(Json(DataResponse { data: snippet }))
}

/// DELETE /api/v1/projects/{project_id}/snippets/{id}
pub async fn delete(
    principal: Principal,
    State(state): State<AppState>,
    Path((project_id, id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    SnippetRepo::delete(&state.pool, principal.user_id, project_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
