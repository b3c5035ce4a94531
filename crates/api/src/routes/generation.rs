//! Route definitions for the top-level `/generations` resource.
//!
//! Requesting a generation lives under the owning snippet
//! (`/projects/{project_id}/snippets/{id}/generations`); status and
//! cancellation are addressed by generation id alone.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

/// Routes mounted at `/generations`.
///
/// ```text
/// GET  /{id}         -> get_status
/// POST /{id}/cancel  -> cancel
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(generation::get_status))
        .route("/{id}/cancel", post(generation::cancel))
}
