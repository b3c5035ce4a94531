//! Route tree for the `/api/v1` prefix.

pub mod admin;
pub mod generation;
pub mod health;
pub mod models;
pub mod project;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /projects                                        list, create
/// /projects/{id}                                   get, update, delete
/// /projects/{project_id}/snippets                  list, create
/// /projects/{project_id}/snippets/{id}             get, update, delete
/// /projects/{project_id}/snippets/{id}/versions    ledger (oldest first)
/// /projects/{project_id}/snippets/{id}/generations history, request
/// /projects/{project_id}/connections               list, create
/// /projects/{project_id}/connections/{id}          get, update, delete
///
/// /generations/{id}                                status
/// /generations/{id}/cancel                         cancel (POST)
///
/// /models                                          catalog (?modality=)
///
/// /admin/generations/sweep                         force sweep (admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/projects", project::router())
        .nest("/generations", generation::router())
        .nest("/models", models::router())
        .nest("/admin", admin::router())
}
