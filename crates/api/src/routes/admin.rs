//! Route definitions for admin maintenance endpoints.

use axum::routing::post;
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// POST /generations/sweep -> sweep_generations (admin only)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/generations/sweep", post(admin::sweep_generations))
}
