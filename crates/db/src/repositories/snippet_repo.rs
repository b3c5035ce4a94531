//! Repository for the `snippets` table.
//!
//! Snippet writes are the ledger's write path: creation appends the
//! initial version, and any update that changes content (text fields or
//! image reference) appends another — all inside one transaction with a
//! revision-conditional snippet update, so the ledger gains exactly one
//! entry per committed content write.

use chrono::Utc;
use sqlx::types::Json;
use weave_core::error::CoreError;
use weave_core::generation::CREATED_BY_USER;
use weave_core::types::DbId;

use crate::error::map_db_err;
use crate::models::snippet::{CreateSnippet, Snippet, UpdateSnippet};
use crate::models::version::VersionSnapshot;
use crate::repositories::{ProjectRepo, VersionRepo};
use crate::DbPool;

/// Column list shared across queries.
const COLUMNS: &str = "id, project_id, text_primary, text_secondary, pos_x, pos_y, tags, \
    category, image_url, image_width, image_height, image_aspect_ratio, current_version_id, \
    revision, created_at, updated_at";

/// Provides CRUD operations for snippets.
pub struct SnippetRepo;

impl SnippetRepo {
    /// Insert a new snippet and its initial ledger entry (seq 1).
    ///
    /// `current_version_id` is set before the transaction commits, so
    /// it is never observable as dangling.
    pub async fn create(
        pool: &DbPool,
        owner_id: DbId,
        project_id: DbId,
        input: &CreateSnippet,
    ) -> Result<Snippet, CoreError> {
        ProjectRepo::get_for_update(pool, owner_id, project_id).await?;

        let now = Utc::now();
        let mut txn = pool
            .begin()
            .await
            .map_err(|e| map_db_err(e, "snippet create"))?;

        let (width, height, aspect) = match &input.image_metadata {
            Some(meta) => (Some(meta.width), Some(meta.height), Some(meta.aspect_ratio)),
            None => (None, None, None),
        };

        let snippet_id: DbId = sqlx::query_scalar(
            "INSERT INTO snippets \
                (project_id, text_primary, text_secondary, pos_x, pos_y, tags, category, \
                 image_url, image_width, image_height, image_aspect_ratio, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12) \
             RETURNING id",
        )
        .bind(project_id)
        .bind(&input.text_primary)
        .bind(&input.text_secondary)
        .bind(input.position.x)
        .bind(input.position.y)
        .bind(Json(&input.tags))
        .bind(&input.category)
        .bind(&input.image_url)
        .bind(width)
        .bind(height)
        .bind(aspect)
        .bind(now)
        .fetch_one(&mut *txn)
        .await
        .map_err(|e| map_db_err(e, "snippet create"))?;

        let snapshot = VersionSnapshot {
            text_primary: input.text_primary.clone(),
            text_secondary: input.text_secondary.clone(),
            image_url: input.image_url.clone(),
            image_width: width,
            image_height: height,
            image_aspect_ratio: aspect,
            created_by: CREATED_BY_USER,
            generation_id: None,
        };
        let version = VersionRepo::append(&mut txn, snippet_id, &snapshot)
            .await
            .map_err(|e| map_db_err(e, "snippet create"))?;

        let query = format!(
            "UPDATE snippets SET current_version_id = ?1 WHERE id = ?2 RETURNING {COLUMNS}"
        );
        let snippet = sqlx::query_as::<_, Snippet>(&query)
            .bind(version.id)
            .bind(snippet_id)
            .fetch_one(&mut *txn)
            .await
            .map_err(|e| map_db_err(e, "snippet create"))?;

        ProjectRepo::touch(&mut txn, project_id, now)
            .await
            .map_err(|e| map_db_err(e, "snippet create"))?;

        txn.commit()
            .await
            .map_err(|e| map_db_err(e, "snippet create"))?;

        Ok(snippet)
    }

    /// Fetch a snippet within a project the caller can read.
    pub async fn get(
        pool: &DbPool,
        owner_id: DbId,
        project_id: DbId,
        id: DbId,
    ) -> Result<Snippet, CoreError> {
        ProjectRepo::get(pool, owner_id, project_id).await?;
        Self::find_in_project(pool, project_id, id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Snippet",
                id,
            })
    }

    /// List a project's snippets, oldest first.
    pub async fn list_by_project(
        pool: &DbPool,
        owner_id: DbId,
        project_id: DbId,
    ) -> Result<Vec<Snippet>, CoreError> {
        ProjectRepo::get(pool, owner_id, project_id).await?;
        let query =
            format!("SELECT {COLUMNS} FROM snippets WHERE project_id = ?1 ORDER BY created_at ASC");
        sqlx::query_as::<_, Snippet>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
            .map_err(|e| map_db_err(e, "snippet list"))
    }

    /// Update a snippet. `None` fields are left unchanged.
    ///
    /// Appends a ledger entry iff the update changes `text_primary`,
    /// `text_secondary`, or `image_url`; position/tags/category-only
    /// updates bump the revision without a new version.
    pub async fn update(
        pool: &DbPool,
        owner_id: DbId,
        project_id: DbId,
        id: DbId,
        input: &UpdateSnippet,
    ) -> Result<Snippet, CoreError> {
        ProjectRepo::get_for_update(pool, owner_id, project_id).await?;

        let now = Utc::now();
        let mut txn = pool
            .begin()
            .await
            .map_err(|e| map_db_err(e, "snippet update"))?;

        let query = format!("SELECT {COLUMNS} FROM snippets WHERE id = ?1 AND project_id = ?2");
        let current = sqlx::query_as::<_, Snippet>(&query)
            .bind(id)
            .bind(project_id)
            .fetch_optional(&mut *txn)
            .await
            .map_err(|e| map_db_err(e, "snippet update"))?
            .ok_or(CoreError::NotFound {
                entity: "Snippet",
                id,
            })?;

        if input.revision != current.revision {
            return Err(CoreError::Conflict(format!(
                "snippet {id} was modified concurrently; re-read and retry"
            )));
        }

        let text_primary = input
            .text_primary
            .clone()
            .unwrap_or_else(|| current.text_primary.clone());
        let text_secondary = input
            .text_secondary
            .clone()
            .or_else(|| current.text_secondary.clone());
        let (pos_x, pos_y) = match input.position {
            Some(p) => (p.x, p.y),
            None => (current.pos_x, current.pos_y),
        };
        let tags = input
            .tags
            .clone()
            .unwrap_or_else(|| current.tags.0.clone());
        let category = input.category.clone().or_else(|| current.category.clone());
        let image_url = input.image_url.clone().or_else(|| current.image_url.clone());
        let (image_width, image_height, image_aspect_ratio) = match &input.image_metadata {
            Some(meta) => (Some(meta.width), Some(meta.height), Some(meta.aspect_ratio)),
            None => (
                current.image_width,
                current.image_height,
                current.image_aspect_ratio,
            ),
        };

        let content_changed = text_primary != current.text_primary
            || text_secondary != current.text_secondary
            || image_url != current.image_url;

        let current_version_id = if content_changed {
            let snapshot = VersionSnapshot {
                text_primary: text_primary.clone(),
                text_secondary: text_secondary.clone(),
                image_url: image_url.clone(),
                image_width,
                image_height,
                image_aspect_ratio,
                created_by: CREATED_BY_USER,
                generation_id: None,
            };
            VersionRepo::append(&mut txn, id, &snapshot)
                .await
                .map_err(|e| map_db_err(e, "snippet update"))?
                .id
        } else {
            current.current_version_id
        };

        let query = format!(
            "UPDATE snippets SET \
                text_primary = ?1, text_secondary = ?2, pos_x = ?3, pos_y = ?4, tags = ?5, \
                category = ?6, image_url = ?7, image_width = ?8, image_height = ?9, \
                image_aspect_ratio = ?10, current_version_id = ?11, \
                revision = revision + 1, updated_at = ?12 \
             WHERE id = ?13 AND revision = ?14 \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Snippet>(&query)
            .bind(&text_primary)
            .bind(&text_secondary)
            .bind(pos_x)
            .bind(pos_y)
            .bind(Json(&tags))
            .bind(&category)
            .bind(&image_url)
            .bind(image_width)
            .bind(image_height)
            .bind(image_aspect_ratio)
            .bind(current_version_id)
            .bind(now)
            .bind(id)
            .bind(input.revision)
            .fetch_optional(&mut *txn)
            .await
            .map_err(|e| map_db_err(e, "snippet update"))?
            .ok_or_else(|| {
                CoreError::Conflict(format!(
                    "snippet {id} was modified concurrently; re-read and retry"
                ))
            })?;

        ProjectRepo::touch(&mut txn, project_id, now)
            .await
            .map_err(|e| map_db_err(e, "snippet update"))?;

        txn.commit()
            .await
            .map_err(|e| map_db_err(e, "snippet update"))?;

        Ok(updated)
    }

    /// Delete a snippet, its incident connections (either direction),
    /// its version ledger, and its generation history in one
    /// transaction. No dangling edge is ever observable.
    pub async fn delete(
        pool: &DbPool,
        owner_id: DbId,
        project_id: DbId,
        id: DbId,
    ) -> Result<(), CoreError> {
        ProjectRepo::get_for_update(pool, owner_id, project_id).await?;

        let now = Utc::now();
        let mut txn = pool
            .begin()
            .await
            .map_err(|e| map_db_err(e, "snippet delete"))?;

        sqlx::query("DELETE FROM versions WHERE snippet_id = ?1")
            .bind(id)
            .execute(&mut *txn)
            .await
            .map_err(|e| map_db_err(e, "snippet delete"))?;

        sqlx::query("DELETE FROM generations WHERE snippet_id = ?1")
            .bind(id)
            .execute(&mut *txn)
            .await
            .map_err(|e| map_db_err(e, "snippet delete"))?;

        sqlx::query(
            "DELETE FROM connections WHERE source_snippet_id = ?1 OR target_snippet_id = ?1",
        )
        .bind(id)
        .execute(&mut *txn)
        .await
        .map_err(|e| map_db_err(e, "snippet delete"))?;

        let result = sqlx::query("DELETE FROM snippets WHERE id = ?1 AND project_id = ?2")
            .bind(id)
            .bind(project_id)
            .execute(&mut *txn)
            .await
            .map_err(|e| map_db_err(e, "snippet delete"))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound {
                entity: "Snippet",
                id,
            });
        }

        ProjectRepo::touch(&mut txn, project_id, now)
            .await
            .map_err(|e| map_db_err(e, "snippet delete"))?;

        txn.commit()
            .await
            .map_err(|e| map_db_err(e, "snippet delete"))?;

        tracing::info!(snippet_id = id, project_id, "snippet deleted with cascade");
        Ok(())
    }

    /// Find a snippet by id within a project, without an ownership
    /// check. Callers must have authorized the project first.
    pub async fn find_in_project(
        pool: &DbPool,
        project_id: DbId,
        id: DbId,
    ) -> Result<Option<Snippet>, CoreError> {
        let query = format!("SELECT {COLUMNS} FROM snippets WHERE id = ?1 AND project_id = ?2");
        sqlx::query_as::<_, Snippet>(&query)
            .bind(id)
            .bind(project_id)
            .fetch_optional(pool)
            .await
            .map_err(|e| map_db_err(e, "snippet lookup"))
    }

    /// Find a snippet by id alone, without scoping. Reserved for the
    /// engine and event paths that already hold an authorized
    /// generation referencing it.
    pub async fn find_any(pool: &DbPool, id: DbId) -> Result<Option<Snippet>, CoreError> {
        let query = format!("SELECT {COLUMNS} FROM snippets WHERE id = ?1");
        sqlx::query_as::<_, Snippet>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| map_db_err(e, "snippet lookup"))
    }
}
