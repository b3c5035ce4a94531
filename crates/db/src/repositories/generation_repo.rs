//! Repository for the `generations` table.
//!
//! Every state transition is a status-conditional update, which makes
//! the terminal-state field last-writer-wins under races (cancel vs.
//! write-back vs. sweep) without any lock being held during provider
//! calls.

use chrono::Utc;
use weave_core::error::CoreError;
use weave_core::generation::CREATED_BY_GENERATION;
use weave_core::types::{DbId, Timestamp};

use crate::error::map_db_err;
use crate::models::generation::{
    Generation, GenerationResult, RequestGeneration, SweptGeneration, WriteBack,
};
use crate::models::status::GenerationStatus;
use crate::models::version::VersionSnapshot;
use crate::repositories::{ProjectRepo, VersionRepo};
use crate::DbPool;

/// Column list shared across queries.
const COLUMNS: &str = "id, snippet_id, model_id, modality, prompt, system_prompt, temperature, \
    max_tokens, status_id, attempts, result_version_id, error_message, claimed_at, \
    completed_at, created_at, updated_at";

/// Column list with the `g.` alias for joined queries.
const COLUMNS_G: &str = "g.id, g.snippet_id, g.model_id, g.modality, g.prompt, \
    g.system_prompt, g.temperature, g.max_tokens, g.status_id, g.attempts, \
    g.result_version_id, g.error_message, g.claimed_at, g.completed_at, \
    g.created_at, g.updated_at";

/// Maximum page size for generation history.
const MAX_LIMIT: i64 = 100;

/// Default page size for generation history.
const DEFAULT_LIMIT: i64 = 50;

/// Provides lifecycle operations for generations.
pub struct GenerationRepo;

impl GenerationRepo {
    /// Enqueue a new generation for a snippet. Returns immediately with
    /// the row in `queued` status.
    pub async fn create(
        pool: &DbPool,
        snippet_id: DbId,
        modality: &str,
        input: &RequestGeneration,
    ) -> Result<Generation, CoreError> {
        let now = Utc::now();
        let query = format!(
            "INSERT INTO generations \
                (snippet_id, model_id, modality, prompt, system_prompt, temperature, \
                 max_tokens, status_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(snippet_id)
            .bind(&input.model_id)
            .bind(modality)
            .bind(&input.prompt)
            .bind(&input.system_prompt)
            .bind(input.temperature)
            .bind(input.max_tokens)
            .bind(GenerationStatus::Queued.id())
            .bind(now)
            .fetch_one(pool)
            .await
            .map_err(|e| map_db_err(e, "generation create"))
    }

    /// Find a generation by id regardless of owner.
    pub async fn find_by_id(pool: &DbPool, id: DbId) -> Result<Option<Generation>, CoreError> {
        let query = format!("SELECT {COLUMNS} FROM generations WHERE id = ?1");
        sqlx::query_as::<_, Generation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| map_db_err(e, "generation lookup"))
    }

    /// Fetch a generation visible to `owner_id` (for reads).
    ///
    /// Generations reached through another owner's project are reported
    /// as `NotFound`.
    pub async fn get_visible(
        pool: &DbPool,
        owner_id: DbId,
        id: DbId,
    ) -> Result<Generation, CoreError> {
        let query = format!(
            "SELECT {COLUMNS_G} FROM generations g \
             JOIN snippets s ON s.id = g.snippet_id \
             JOIN projects p ON p.id = s.project_id \
             WHERE g.id = ?1 AND p.owner_id = ?2"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
            .map_err(|e| map_db_err(e, "generation lookup"))?
            .ok_or(CoreError::NotFound {
                entity: "Generation",
                id,
            })
    }

    /// List a snippet's generations, newest first. Callers must have
    /// authorized the snippet.
    pub async fn list_for_snippet(
        pool: &DbPool,
        snippet_id: DbId,
        limit: Option<i64>,
    ) -> Result<Vec<Generation>, CoreError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let query = format!(
            "SELECT {COLUMNS} FROM generations \
             WHERE snippet_id = ?1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT ?2"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(snippet_id)
            .bind(limit)
            .fetch_all(pool)
            .await
            .map_err(|e| map_db_err(e, "generation history"))
    }

    /// Atomically claim the oldest queued generation for execution.
    ///
    /// The status-conditional update guarantees at-most-one active run
    /// per request even with several runner instances.
    pub async fn claim_next(pool: &DbPool) -> Result<Option<Generation>, CoreError> {
        let now = Utc::now();
        let query = format!(
            "UPDATE generations \
             SET status_id = ?1, claimed_at = ?2, updated_at = ?2 \
             WHERE id = (SELECT id FROM generations WHERE status_id = ?3 ORDER BY id LIMIT 1) \
               AND status_id = ?3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(GenerationStatus::Running.id())
            .bind(now)
            .bind(GenerationStatus::Queued.id())
            .fetch_optional(pool)
            .await
            .map_err(|e| map_db_err(e, "generation claim"))
    }

    /// Record that another provider attempt was made.
    pub async fn record_attempt(pool: &DbPool, id: DbId, attempts: i64) -> Result<(), CoreError> {
        sqlx::query("UPDATE generations SET attempts = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(attempts)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| map_db_err(e, "generation attempt"))?;
        Ok(())
    }

    /// Mark a non-terminal generation as failed.
    ///
    /// Returns `false` if the generation was already terminal (e.g.
    /// cancelled won the race) — the terminal state is left untouched.
    pub async fn fail(pool: &DbPool, id: DbId, error: &str) -> Result<bool, CoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE generations \
             SET status_id = ?1, error_message = ?2, completed_at = ?3, updated_at = ?3 \
             WHERE id = ?4 AND status_id IN (?5, ?6)",
        )
        .bind(GenerationStatus::Failed.id())
        .bind(error)
        .bind(now)
        .bind(id)
        .bind(GenerationStatus::Queued.id())
        .bind(GenerationStatus::Running.id())
        .execute(pool)
        .await
        .map_err(|e| map_db_err(e, "generation fail"))?;
        Ok(result.rows_affected() > 0)
    }

    /// Cancel a queued or running generation on behalf of its owner.
    ///
    /// Cancelling an already-terminal generation is a no-op; the row is
    /// returned unchanged either way, so the call is idempotent.
    pub async fn cancel(pool: &DbPool, owner_id: DbId, id: DbId) -> Result<Generation, CoreError> {
        let (_, project_owner) = Self::owner_of(pool, id).await?.ok_or(CoreError::NotFound {
            entity: "Generation",
            id,
        })?;
        if project_owner != owner_id {
            return Err(CoreError::Forbidden(
                "cannot cancel another user's generation".to_string(),
            ));
        }

        let now = Utc::now();
        sqlx::query(
            "UPDATE generations \
             SET status_id = ?1, completed_at = ?2, updated_at = ?2 \
             WHERE id = ?3 AND status_id IN (?4, ?5)",
        )
        .bind(GenerationStatus::Cancelled.id())
        .bind(now)
        .bind(id)
        .bind(GenerationStatus::Queued.id())
        .bind(GenerationStatus::Running.id())
        .execute(pool)
        .await
        .map_err(|e| map_db_err(e, "generation cancel"))?;

        Self::find_by_id(pool, id).await?.ok_or(CoreError::NotFound {
            entity: "Generation",
            id,
        })
    }

    /// Commit a successful provider result.
    ///
    /// One transaction: append the version (`created_by =
    /// "generation"`), repoint the snippet's `current_version_id`,
    /// carry image fields onto the snippet when an image was produced,
    /// mark the generation succeeded, and bump the project's
    /// `last_modified`.
    ///
    /// The generation update is conditional on `running`, so a
    /// cancellation or sweep that won the race discards the write-back
    /// ([`WriteBack::Discarded`]); a concurrent snippet writer that got
    /// in between surfaces as `Conflict` for the caller to retry.
    pub async fn commit_success(
        pool: &DbPool,
        id: DbId,
        result: &GenerationResult,
    ) -> Result<WriteBack, CoreError> {
        let now = Utc::now();
        let mut txn = pool
            .begin()
            .await
            .map_err(|e| map_db_err(e, "generation write-back"))?;

        let query = format!("SELECT {COLUMNS} FROM generations WHERE id = ?1");
        let generation = sqlx::query_as::<_, Generation>(&query)
            .bind(id)
            .fetch_optional(&mut *txn)
            .await
            .map_err(|e| map_db_err(e, "generation write-back"))?;

        let generation = match generation {
            Some(g) if g.status_id == GenerationStatus::Running.id() => g,
            // Cancelled, swept, or cascade-deleted: nothing to write.
            _ => return Ok(WriteBack::Discarded),
        };

        let snippet = sqlx::query_as::<_, crate::models::snippet::Snippet>(
            "SELECT id, project_id, text_primary, text_secondary, pos_x, pos_y, tags, \
                category, image_url, image_width, image_height, image_aspect_ratio, \
                current_version_id, revision, created_at, updated_at \
             FROM snippets WHERE id = ?1",
        )
        .bind(generation.snippet_id)
        .fetch_optional(&mut *txn)
        .await
        .map_err(|e| map_db_err(e, "generation write-back"))?;

        let Some(snippet) = snippet else {
            // The snippet vanished between claim and write-back; the
            // generation row (if still present) has nothing to attach to.
            drop(txn);
            let _ = Self::fail(pool, id, "snippet no longer exists").await?;
            return Ok(WriteBack::Discarded);
        };

        let image_url = result.image_url.clone().or_else(|| snippet.image_url.clone());
        let (image_width, image_height, image_aspect_ratio) = if result.image_url.is_some() {
            (
                result.image_width,
                result.image_height,
                result.image_aspect_ratio,
            )
        } else {
            (
                snippet.image_width,
                snippet.image_height,
                snippet.image_aspect_ratio,
            )
        };

        let snapshot = VersionSnapshot {
            text_primary: result
                .text
                .clone()
                .unwrap_or_else(|| snippet.text_primary.clone()),
            text_secondary: snippet.text_secondary.clone(),
            image_url: image_url.clone(),
            image_width,
            image_height,
            image_aspect_ratio,
            created_by: CREATED_BY_GENERATION,
            generation_id: Some(id),
        };
        let version = VersionRepo::append(&mut txn, snippet.id, &snapshot)
            .await
            .map_err(|e| map_db_err(e, "generation write-back"))?;

        let updated = sqlx::query(
            "UPDATE snippets \
             SET current_version_id = ?1, image_url = ?2, image_width = ?3, \
                 image_height = ?4, image_aspect_ratio = ?5, \
                 revision = revision + 1, updated_at = ?6 \
             WHERE id = ?7 AND revision = ?8",
        )
        .bind(version.id)
        .bind(&image_url)
        .bind(image_width)
        .bind(image_height)
        .bind(image_aspect_ratio)
        .bind(now)
        .bind(snippet.id)
        .bind(snippet.revision)
        .execute(&mut *txn)
        .await
        .map_err(|e| map_db_err(e, "generation write-back"))?;

        if updated.rows_affected() == 0 {
            return Err(CoreError::Conflict(format!(
                "snippet {} was modified during write-back; retry",
                snippet.id
            )));
        }

        let finished = sqlx::query(
            "UPDATE generations \
             SET status_id = ?1, result_version_id = ?2, completed_at = ?3, updated_at = ?3 \
             WHERE id = ?4 AND status_id = ?5",
        )
        .bind(GenerationStatus::Succeeded.id())
        .bind(version.id)
        .bind(now)
        .bind(id)
        .bind(GenerationStatus::Running.id())
        .execute(&mut *txn)
        .await
        .map_err(|e| map_db_err(e, "generation write-back"))?;

        if finished.rows_affected() == 0 {
            // Lost the terminal-state race inside the transaction window.
            return Ok(WriteBack::Discarded);
        }

        ProjectRepo::touch(&mut txn, snippet.project_id, now)
            .await
            .map_err(|e| map_db_err(e, "generation write-back"))?;

        txn.commit()
            .await
            .map_err(|e| map_db_err(e, "generation write-back"))?;

        Ok(WriteBack::Committed(version))
    }

    /// Forcibly fail generations stuck in `running` since before
    /// `cutoff`. Returns the affected rows for event publication.
    pub async fn sweep_stuck(
        pool: &DbPool,
        cutoff: Timestamp,
    ) -> Result<Vec<SweptGeneration>, CoreError> {
        let mut txn = pool
            .begin()
            .await
            .map_err(|e| map_db_err(e, "generation sweep"))?;

        let stuck: Vec<SweptGeneration> = sqlx::query_as(
            "SELECT g.id AS generation_id, g.snippet_id, s.project_id \
             FROM generations g \
             JOIN snippets s ON s.id = g.snippet_id \
             WHERE g.status_id = ?1 AND g.claimed_at < ?2",
        )
        .bind(GenerationStatus::Running.id())
        .bind(cutoff)
        .fetch_all(&mut *txn)
        .await
        .map_err(|e| map_db_err(e, "generation sweep"))?;

        let now = Utc::now();
        for swept in &stuck {
            sqlx::query(
                "UPDATE generations \
                 SET status_id = ?1, error_message = ?2, completed_at = ?3, updated_at = ?3 \
                 WHERE id = ?4 AND status_id = ?5",
            )
            .bind(GenerationStatus::Failed.id())
            .bind("generation timed out")
            .bind(now)
            .bind(swept.generation_id)
            .bind(GenerationStatus::Running.id())
            .execute(&mut *txn)
            .await
            .map_err(|e| map_db_err(e, "generation sweep"))?;
        }

        txn.commit()
            .await
            .map_err(|e| map_db_err(e, "generation sweep"))?;

        Ok(stuck)
    }

    /// Resolve the project and owner a generation belongs to.
    async fn owner_of(pool: &DbPool, id: DbId) -> Result<Option<(DbId, DbId)>, CoreError> {
        sqlx::query_as(
            "SELECT p.id, p.owner_id \
             FROM generations g \
             JOIN snippets s ON s.id = g.snippet_id \
             JOIN projects p ON p.id = s.project_id \
             WHERE g.id = ?1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| map_db_err(e, "generation lookup"))
    }
}
