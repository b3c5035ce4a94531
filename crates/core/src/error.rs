//! Domain error taxonomy shared by every layer.

use crate::types::DbId;
use crate::validation::Violations;

/// Domain-level error for store, ledger, and orchestration operations.
///
/// The API layer maps each variant onto an HTTP status; lower layers
/// construct them directly.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The entity does not exist, or is not visible to the caller.
    ///
    /// Reads of entities owned by someone else also produce this variant
    /// so that callers cannot probe for existence.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// Input failed schema validation. Carries every violated field,
    /// not just the first, so callers can render full feedback in one
    /// round trip.
    #[error("{0}")]
    Validation(Violations),

    /// A concurrent-write collision on an entity's revision token.
    /// Retryable: re-read the entity and reapply the change.
    #[error("{0}")]
    Conflict(String),

    /// No authenticated principal on the request.
    #[error("{0}")]
    Unauthorized(String),

    /// The caller is authenticated but does not own the entity.
    #[error("{0}")]
    Forbidden(String),

    /// Unexpected failure (storage, serialization, ...). Details are
    /// logged at the point of origin, not exposed to callers.
    #[error("{0}")]
    Internal(String),
}

impl CoreError {
    /// Single-field validation failure.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Validation(Violations::single(field, message))
    }
}
