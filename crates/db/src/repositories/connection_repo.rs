//! Repository for the `connections` table.
//!
//! A connection is a directed edge between two snippets of the same
//! project. Endpoint integrity is checked on create; endpoints are
//! immutable afterwards.

use chrono::Utc;
use weave_core::error::CoreError;
use weave_core::types::DbId;
use weave_core::validation::Violations;

use crate::error::map_db_err;
use crate::models::connection::{Connection, CreateConnection, UpdateConnection};
use crate::repositories::ProjectRepo;
use crate::DbPool;

/// Column list shared across queries.
const COLUMNS: &str = "id, project_id, source_snippet_id, target_snippet_id, label, \
    revision, created_at, updated_at";

/// Provides CRUD operations for connections.
pub struct ConnectionRepo;

impl ConnectionRepo {
    /// Insert a new connection after validating both endpoints.
    ///
    /// Self-loops and endpoints outside the project fail validation;
    /// endpoints that do not exist at all are `NotFound`.
    pub async fn create(
        pool: &DbPool,
        owner_id: DbId,
        project_id: DbId,
        input: &CreateConnection,
    ) -> Result<Connection, CoreError> {
        ProjectRepo::get_for_update(pool, owner_id, project_id).await?;

        if input.source_snippet_id == input.target_snippet_id {
            return Err(CoreError::validation(
                "target_snippet_id",
                "cannot connect a snippet to itself",
            ));
        }

        let mut violations = Violations::new();
        for (field, snippet_id) in [
            ("source_snippet_id", input.source_snippet_id),
            ("target_snippet_id", input.target_snippet_id),
        ] {
            let found: Option<DbId> =
                sqlx::query_scalar("SELECT project_id FROM snippets WHERE id = ?1")
                    .bind(snippet_id)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| map_db_err(e, "connection create"))?;
            match found {
                None => {
                    return Err(CoreError::NotFound {
                        entity: "Snippet",
                        id: snippet_id,
                    })
                }
                Some(other) if other != project_id => {
                    violations.push(
                        field,
                        "cross_project",
                        "snippet must belong to the same project as the connection",
                    );
                }
                Some(_) => {}
            }
        }
        violations.into_result()?;

        let now = Utc::now();
        let mut txn = pool
            .begin()
            .await
            .map_err(|e| map_db_err(e, "connection create"))?;

        let query = format!(
            "INSERT INTO connections \
                (project_id, source_snippet_id, target_snippet_id, label, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5) \
             RETURNING {COLUMNS}"
        );
        let connection = sqlx::query_as::<_, Connection>(&query)
            .bind(project_id)
            .bind(input.source_snippet_id)
            .bind(input.target_snippet_id)
            .bind(&input.label)
            .bind(now)
            .fetch_one(&mut *txn)
            .await
            .map_err(|e| map_db_err(e, "connection create"))?;

        ProjectRepo::touch(&mut txn, project_id, now)
            .await
            .map_err(|e| map_db_err(e, "connection create"))?;

        txn.commit()
            .await
            .map_err(|e| map_db_err(e, "connection create"))?;

        Ok(connection)
    }

    /// Fetch a connection within a project the caller can read.
    pub async fn get(
        pool: &DbPool,
        owner_id: DbId,
        project_id: DbId,
        id: DbId,
    ) -> Result<Connection, CoreError> {
        ProjectRepo::get(pool, owner_id, project_id).await?;
        let query = format!("SELECT {COLUMNS} FROM connections WHERE id = ?1 AND project_id = ?2");
        sqlx::query_as::<_, Connection>(&query)
            .bind(id)
            .bind(project_id)
            .fetch_optional(pool)
            .await
            .map_err(|e| map_db_err(e, "connection lookup"))?
            .ok_or(CoreError::NotFound {
                entity: "Connection",
                id,
            })
    }

    /// List a project's connections, oldest first.
    pub async fn list_by_project(
        pool: &DbPool,
        owner_id: DbId,
        project_id: DbId,
    ) -> Result<Vec<Connection>, CoreError> {
        ProjectRepo::get(pool, owner_id, project_id).await?;
        let query = format!(
            "SELECT {COLUMNS} FROM connections WHERE project_id = ?1 ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, Connection>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
            .map_err(|e| map_db_err(e, "connection list"))
    }

    /// Update a connection's label. Endpoints cannot change.
    pub async fn update(
        pool: &DbPool,
        owner_id: DbId,
        project_id: DbId,
        id: DbId,
        input: &UpdateConnection,
    ) -> Result<Connection, CoreError> {
        ProjectRepo::get_for_update(pool, owner_id, project_id).await?;

        let exists: Option<DbId> =
            sqlx::query_scalar("SELECT id FROM connections WHERE id = ?1 AND project_id = ?2")
                .bind(id)
                .bind(project_id)
                .fetch_optional(pool)
                .await
                .map_err(|e| map_db_err(e, "connection update"))?;
        if exists.is_none() {
            return Err(CoreError::NotFound {
                entity: "Connection",
                id,
            });
        }

        let now = Utc::now();
        let mut txn = pool
            .begin()
            .await
            .map_err(|e| map_db_err(e, "connection update"))?;

        let query = format!(
            "UPDATE connections SET \
                label = COALESCE(?1, label), \
                revision = revision + 1, \
                updated_at = ?2 \
             WHERE id = ?3 AND project_id = ?4 AND revision = ?5 \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Connection>(&query)
            .bind(&input.label)
            .bind(now)
            .bind(id)
            .bind(project_id)
            .bind(input.revision)
            .fetch_optional(&mut *txn)
            .await
            .map_err(|e| map_db_err(e, "connection update"))?
            .ok_or_else(|| {
                CoreError::Conflict(format!(
                    "connection {id} was modified concurrently; re-read and retry"
                ))
            })?;

        ProjectRepo::touch(&mut txn, project_id, now)
            .await
            .map_err(|e| map_db_err(e, "connection update"))?;

        txn.commit()
            .await
            .map_err(|e| map_db_err(e, "connection update"))?;

        Ok(updated)
    }

    /// Delete a connection.
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
            .map_err(|e| map_db_err(e, "connection delete"))?;

        let result = sqlx::query("DELETE FROM connections WHERE id = ?1 AND project_id = ?2")
            .bind(id)
            .bind(project_id)
            .execute(&mut *txn)
            .await
            .map_err(|e| map_db_err(e, "connection delete"))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound {
                entity: "Connection",
                id,
            });
        }

        ProjectRepo::touch(&mut txn, project_id, now)
            .await
            .map_err(|e| map_db_err(e, "connection delete"))?;

        txn.commit()
            .await
            .map_err(|e| map_db_err(e, "connection delete"))?;

        Ok(())
    }
}
