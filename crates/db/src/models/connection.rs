//! Connection (directed edge) entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;
use weave_core::types::{DbId, Timestamp};

/// A connection row from the `connections` table.
///
/// Both endpoints always belong to the same project as the connection;
/// parallel edges between the same pair are allowed, self-loops are
/// not.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Connection {
    pub id: DbId,
    pub project_id: DbId,
    pub source_snippet_id: DbId,
    pub target_snippet_id: DbId,
    pub label: Option<String>,
    /// Optimistic-concurrency token; bumped by every committed write.
    pub revision: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new connection.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateConnection {
    pub source_snippet_id: DbId,
    pub target_snippet_id: DbId,
    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub label: Option<String>,
}

/// DTO for updating a connection. Endpoints are immutable; only the
/// label can change.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateConnection {
    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub label: Option<String>,
    /// Base revision the caller read.
    pub revision: i64,
}
