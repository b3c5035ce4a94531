//! Route definitions for the `/projects` resource.
//!
//! Nests snippet, connection, version, and generation routes under
//! `/projects/{project_id}/...`.

use axum::routing::get;
use axum::Router;

use crate::handlers::{connection, generation, project, snippet, version};
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET    /                                      -> list
/// POST   /                                      -> create
/// GET    /{id}                                  -> get_by_id
/// PUT    /{id}                                  -> update
/// DELETE /{id}                                  -> delete
///
/// GET    /{project_id}/snippets                 -> list_by_project
/// POST   /{project_id}/snippets                 -> create
/// GET    /{project_id}/snippets/{id}            -> get_by_id
/// PUT    /{project_id}/snippets/{id}            -> update
/// DELETE /{project_id}/snippets/{id}            -> delete
/// GET    /{project_id}/snippets/{id}/versions   -> version ledger
/// GET    /{project_id}/snippets/{id}/generations-> history
/// POST   /{project_id}/snippets/{id}/generations-> request
///
/// GET    /{project_id}/connections              -> list_by_project
/// POST   /{project_id}/connections              -> create
/// GET    /{project_id}/connections/{id}         -> get_by_id
/// PUT    /{project_id}/connections/{id}         -> update
/// DELETE /{project_id}/connections/{id}         -> delete
/// ```
pub fn router() -> Router<AppState> {
    let snippet_routes = Router::new()
        .route("/", get(snippet::list_by_project).post(snippet::create))
        .route(
            "/{id}",
            get(snippet::get_by_id)
                .put(snippet::update)
                .delete(snippet::delete),
        )
        .route("/{id}/versions", get(version::list))
        .route(
            "/{id}/generations",
            get(generation::history).post(generation::request),
        );

    let connection_routes = Router::new()
        .route(
            "/",
            get(connection::list_by_project).post(connection::create),
        )
        .route(
            "/{id}",
            get(connection::get_by_id)
                .put(connection::update)
                .delete(connection::delete),
        );

    Router::new()
        .route("/", get(project::list).post(project::create))
        .route(
            "/{id}",
            get(project::get_by_id)
                .put(project::update)
                .delete(project::delete),
        )
        .nest("/{project_id}/snippets", snippet_routes)
        .nest("/{project_id}/connections", connection_routes)
}
