//! Repository for the `versions` table — the append-only ledger.
//!
//! Append is the sole mutation primitive and only runs inside the
//! transaction of an owning snippet write, which is what serializes
//! concurrent appends per snippet.

use chrono::Utc;
use sqlx::SqliteConnection;
use weave_core::types::{DbId, Timestamp};

use crate::error::map_db_err;
use crate::models::version::{Version, VersionQuery, VersionSnapshot};
use crate::DbPool;

/// Column list shared across queries.
const COLUMNS: &str = "id, snippet_id, seq, text_primary, text_secondary, image_url, \
    image_width, image_height, image_aspect_ratio, created_by, generation_id, created_at";

/// Default page size for ledger listing.
const DEFAULT_LIMIT: i64 = 50;

/// Maximum page size for ledger listing.
const MAX_LIMIT: i64 = 200;

/// Provides append and lookup operations for version ledgers.
pub struct VersionRepo;

impl VersionRepo {
    /// Append a snapshot to a snippet's ledger.
    ///
    /// Assigns `seq = MAX(seq) + 1` and a `created_at` strictly greater
    /// than the previous entry's, both read inside the caller's
    /// transaction. Callers must repoint the snippet's
    /// `current_version_id` at the returned row before committing.
    pub(crate) async fn append(
        conn: &mut SqliteConnection,
        snippet_id: DbId,
        snapshot: &VersionSnapshot,
    ) -> Result<Version, sqlx::Error> {
        let now = Utc::now();
        let last: Option<(i64, Timestamp)> = sqlx::query_as(
            "SELECT seq, created_at FROM versions WHERE snippet_id = ?1 \
             ORDER BY seq DESC LIMIT 1",
        )
        .bind(snippet_id)
        .fetch_optional(&mut *conn)
        .await?;

        let (seq, created_at) = match last {
            Some((last_seq, last_at)) => {
                let at = if last_at >= now {
                    last_at + chrono::Duration::milliseconds(1)
                } else {
                    now
                };
                (last_seq + 1, at)
            }
            None => (1, now),
        };

        let query = format!(
            "INSERT INTO versions \
                (snippet_id, seq, text_primary, text_secondary, image_url, \
                 image_width, image_height, image_aspect_ratio, created_by, \
                 generation_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Version>(&query)
            .bind(snippet_id)
            .bind(seq)
            .bind(&snapshot.text_primary)
            .bind(&snapshot.text_secondary)
            .bind(&snapshot.image_url)
            .bind(snapshot.image_width)
            .bind(snapshot.image_height)
            .bind(snapshot.image_aspect_ratio)
            .bind(snapshot.created_by)
            .bind(snapshot.generation_id)
            .bind(created_at)
            .fetch_one(&mut *conn)
            .await
    }

    /// Find a version by its primary key.
    pub async fn find_by_id(
        pool: &DbPool,
        id: DbId,
    ) -> Result<Option<Version>, weave_core::error::CoreError> {
        let query = format!("SELECT {COLUMNS} FROM versions WHERE id = ?1");
        sqlx::query_as::<_, Version>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| map_db_err(e, "version lookup"))
    }

    /// List a snippet's ledger oldest-to-newest with keyset pagination.
    ///
    /// Restartable: pass the `seq` of the last version seen as
    /// `after_seq` to continue from that point.
    pub async fn list_for_snippet(
        pool: &DbPool,
        snippet_id: DbId,
        params: &VersionQuery,
    ) -> Result<Vec<Version>, weave_core::error::CoreError> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let after_seq = params.after_seq.unwrap_or(0);

        let query = format!(
            "SELECT {COLUMNS} FROM versions \
             WHERE snippet_id = ?1 AND seq > ?2 \
             ORDER BY seq ASC \
             LIMIT ?3"
        );
        sqlx::query_as::<_, Version>(&query)
            .bind(snippet_id)
            .bind(after_seq)
            .bind(limit)
            .fetch_all(pool)
            .await
            .map_err(|e| map_db_err(e, "version list"))
    }

    /// Number of ledger entries for a snippet.
    pub async fn count_for_snippet(
        pool: &DbPool,
        snippet_id: DbId,
    ) -> Result<i64, weave_core::error::CoreError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM versions WHERE snippet_id = ?1")
            .bind(snippet_id)
            .fetch_one(pool)
            .await
            .map_err(|e| map_db_err(e, "version count"))
    }
}
