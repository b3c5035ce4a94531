//! Handlers for the `/projects/{project_id}/connections` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use weave_core::types::DbId;
use weave_core::validation::validate_input;
use weave_db::models::connection::{Connection, CreateConnection, UpdateConnection};
use weave_db::repositories::ConnectionRepo;

use crate::error::AppResult;
use crate::middleware::auth::Principal;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/projects/{project_id}/connections
pub async fn create(
    principal: Principal,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Json(input): Json<CreateConnection>,
) -> AppResult<(StatusCode, Json<DataResponse<Connection>>)> {
    validate_input(&input)?;
    let connection =
        ConnectionRepo::create(&state.pool, principal.user_id, project_id, &input).await?;
    tracing::info!(
        connection_id = connection.id,
        source = connection.source_snippet_id,
        target = connection.target_snippet_id,
        "connection created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: connection })))
}

/// GET /api/v1/projects/{project_id}/connections
pub async fn list_by_project(
    principal: Principal,
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Connection>>>> {
    let connections =
        ConnectionRepo::list_by_project(&state.pool, principal.user_id, project_id).await?;
    Ok(Json(DataResponse { data: connections }))
}

/// GET /api/v1/projects/{project_id}/connections/{id}
pub async fn get_by_id(
    principal: Principal,
    State(state): State<AppState>,
    Path((project_id, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<Connection>>> {
    let connection = ConnectionRepo::get(&state.pool, principal.user_id, project_id, id).await?;
    Ok(Json(DataResponse { data: connection }))
}

/// PUT /api/v1/projects/{project_id}/connections/{id}
pub async fn update(
    principal: Principal,
    State(state): State<AppState>,
    Path((project_id, id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateConnection>,
) -> AppResult<Json<DataResponse<Connection>>> {
    validate_input(&input)?;
    let connection =
        ConnectionRepo::update(&state.pool, principal.user_id, project_id, id, &input).await?;
    Ok(Json(DataResponse { data: connection }))
}

/// DELETE /api/v1/projects/{project_id}/connections/{id}
pub async fn delete(
    principal: Principal,
    State(state): State<AppState>,
    Path((project_id, id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    ConnectionRepo::delete(&state.pool, principal.user_id, project_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
