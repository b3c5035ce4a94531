//! Version (ledger entry) model.
//!
//! Versions are immutable once written; there is deliberately no
//! update or delete DTO here.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use weave_core::types::{DbId, Timestamp};

/// A version row from the `versions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Version {
    pub id: DbId,
    pub snippet_id: DbId,
    /// Position in the snippet's ledger; strictly increasing, starts
    /// at 1.
    pub seq: i64,
    pub text_primary: String,
    pub text_secondary: Option<String>,
    pub image_url: Option<String>,
    pub image_width: Option<i64>,
    pub image_height: Option<i64>,
    pub image_aspect_ratio: Option<f64>,
    /// `"user"` or `"generation"` (see `weave_core::generation`).
    pub created_by: String,
    /// Set when `created_by` is `"generation"`.
    pub generation_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// Content snapshot appended to a ledger.
#[derive(Debug, Clone)]
pub struct VersionSnapshot {
    pub text_primary: String,
    pub text_secondary: Option<String>,
    pub image_url: Option<String>,
    pub image_width: Option<i64>,
    pub image_height: Option<i64>,
    pub image_aspect_ratio: Option<f64>,
    pub created_by: &'static str,
    pub generation_id: Option<DbId>,
}

/// Query parameters for listing a snippet's ledger.
///
/// Keyset pagination: pass the `seq` of the last version seen to resume
/// from that point; the listing is oldest-to-newest and restartable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionQuery {
    pub after_seq: Option<i64>,
    pub limit: Option<i64>,
}
