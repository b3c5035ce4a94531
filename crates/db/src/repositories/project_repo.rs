//! Repository for the `projects` table.
//!
//! Projects are the ownership root: every other repository goes through
//! [`ProjectRepo::get`] / [`ProjectRepo::get_for_update`] to enforce the
//! access boundary before touching child entities.

use chrono::Utc;
use sqlx::SqliteConnection;
use weave_core::error::CoreError;
use weave_core::types::{DbId, Timestamp};

use crate::error::map_db_err;
use crate::models::project::{CreateProject, Project, UpdateProject};
use crate::DbPool;

/// Column list shared across queries.
const COLUMNS: &str =
    "id, owner_id, name, description, revision, last_modified, created_at, updated_at";

/// Provides CRUD operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project owned by `owner_id`.
    pub async fn create(
        pool: &DbPool,
        owner_id: DbId,
        input: &CreateProject,
    ) -> Result<Project, CoreError> {
        let now = Utc::now();
        let query = format!(
            "INSERT INTO projects (owner_id, name, description, last_modified, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4, ?4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(owner_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(now)
            .fetch_one(pool)
            .await
            .map_err(|e| map_db_err(e, "project create"))
    }

    /// Find a project by id regardless of owner.
    pub async fn find_by_id(pool: &DbPool, id: DbId) -> Result<Option<Project>, CoreError> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = ?1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| map_db_err(e, "project lookup"))
    }

    /// Fetch a project for reading.
    ///
    /// A project owned by someone else is reported as `NotFound`, never
    /// as `Forbidden`, so callers cannot probe for existence.
    pub async fn get(pool: &DbPool, owner_id: DbId, id: DbId) -> Result<Project, CoreError> {
        match Self::find_by_id(pool, id).await? {
            Some(project) if project.owner_id == owner_id => Ok(project),
            _ => Err(CoreError::NotFound {
                entity: "Project",
                id,
            }),
        }
    }

    /// Fetch a project for mutation.
    ///
    /// Missing projects are `NotFound`; projects owned by someone else
    /// are `Forbidden`.
    pub async fn get_for_update(
        pool: &DbPool,
        owner_id: DbId,
        id: DbId,
    ) -> Result<Project, CoreError> {
        let project = Self::find_by_id(pool, id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Project",
                id,
            })?;
        if project.owner_id != owner_id {
            return Err(CoreError::Forbidden(
                "cannot modify another user's project".to_string(),
            ));
        }
        Ok(project)
    }

    /// List the caller's projects, most recently created first.
    pub async fn list(pool: &DbPool, owner_id: DbId) -> Result<Vec<Project>, CoreError> {
        let query =
            format!("SELECT {COLUMNS} FROM projects WHERE owner_id = ?1 ORDER BY created_at DESC");
        sqlx::query_as::<_, Project>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
            .map_err(|e| map_db_err(e, "project list"))
    }

    /// Update a project. Only non-`None` fields in `input` are applied.
    ///
    /// Commits only if `input.revision` still matches the stored
    /// revision; a lost race yields `Conflict`.
    pub async fn update(
        pool: &DbPool,
        owner_id: DbId,
        id: DbId,
        input: &UpdateProject,
    ) -> Result<Project, CoreError> {
        Self::get_for_update(pool, owner_id, id).await?;

        let now = Utc::now();
        let query = format!(
            "UPDATE projects SET \
                name = COALESCE(?1, name), \
                description = COALESCE(?2, description), \
                revision = revision + 1, \
                updated_at = ?3, \
                last_modified = ?3 \
             WHERE id = ?4 AND revision = ?5 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(now)
            .bind(id)
            .bind(input.revision)
            .fetch_optional(pool)
            .await
            .map_err(|e| map_db_err(e, "project update"))?
            .ok_or_else(|| {
                CoreError::Conflict(format!(
                    "project {id} was modified concurrently; re-read and retry"
                ))
            })
    }

    /// Delete a project and everything it contains.
    ///
    /// The cascade is one transaction: versions, generations,
    /// connections, and snippets go first so a reader can never observe
    /// an orphaned child.
    pub async fn delete(pool: &DbPool, owner_id: DbId, id: DbId) -> Result<(), CoreError> {
        Self::get_for_update(pool, owner_id, id).await?;

        let mut txn = pool
            .begin()
            .await
            .map_err(|e| map_db_err(e, "project delete"))?;

        sqlx::query(
            "DELETE FROM versions WHERE snippet_id IN \
             (SELECT id FROM snippets WHERE project_id = ?1)",
        )
        .bind(id)
        .execute(&mut *txn)
        .await
        .map_err(|e| map_db_err(e, "project delete"))?;

        sqlx::query(
            "DELETE FROM generations WHERE snippet_id IN \
             (SELECT id FROM snippets WHERE project_id = ?1)",
        )
        .bind(id)
        .execute(&mut *txn)
        .await
        .map_err(|e| map_db_err(e, "project delete"))?;

        sqlx::query("DELETE FROM connections WHERE project_id = ?1")
            .bind(id)
            .execute(&mut *txn)
            .await
            .map_err(|e| map_db_err(e, "project delete"))?;

        sqlx::query("DELETE FROM snippets WHERE project_id = ?1")
            .bind(id)
            .execute(&mut *txn)
            .await
            .map_err(|e| map_db_err(e, "project delete"))?;

        sqlx::query("DELETE FROM projects WHERE id = ?1")
            .bind(id)
            .execute(&mut *txn)
            .await
            .map_err(|e| map_db_err(e, "project delete"))?;

        txn.commit()
            .await
            .map_err(|e| map_db_err(e, "project delete"))?;

        tracing::info!(project_id = id, "project deleted with cascade");
        Ok(())
    }

    /// Bump a project's `last_modified` inside a child-write
    /// transaction.
    pub(crate) async fn touch(
        conn: &mut SqliteConnection,
        project_id: DbId,
        at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE projects SET last_modified = ?1 WHERE id = ?2")
            .bind(at)
            .bind(project_id)
            .execute(conn)
            .await?;
        Ok(())
    }
}
