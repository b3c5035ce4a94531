//! Handler for a snippet's version ledger.

use axum::extract::{Path, Query, State};
use axum::Json;
use weave_core::types::DbId;
use weave_db::models::version::{Version, VersionQuery};
use weave_db::repositories::{SnippetRepo, VersionRepo};

use crate::error::AppResult;
use crate::middleware::auth::Principal;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/projects/{project_id}/snippets/{id}/versions
///
/// Oldest-to-newest with keyset pagination (`after_seq`, `limit`).
pub async fn list(
    principal: Principal,
    State(state): State<AppState>,
    Path((project_id, snippet_id)): Path<(DbId, DbId)>,
    Query(params): Query<VersionQuery>,
) -> AppResult<Json<DataResponse<Vec<Version>>>> {
    // Authorizes the project and confirms the snippet is in it.
    SnippetRepo::get(&state.pool, principal.user_id, project_id, snippet_id).await?;
    let versions = VersionRepo::list_for_snippet(&state.pool, snippet_id, &params).await?;
    Ok(Json(DataResponse { data: versions }))
}
