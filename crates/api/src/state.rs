use std::sync::Arc;

use weave_provider::ModelProvider;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc` or is already
/// `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: weave_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Model-provider capability used by the generation engine.
    pub provider: Arc<dyn ModelProvider>,
    /// Event bus publishing generation lifecycle events.
    pub event_bus: Arc<weave_events::EventBus>,
}
