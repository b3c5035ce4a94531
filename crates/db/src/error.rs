//! Mapping of sqlx failures onto the domain error taxonomy.

use weave_core::error::CoreError;

/// Convert a sqlx error into a [`CoreError`], logging the detail at the
/// point of origin.
///
/// `SQLITE_BUSY` surfaces as a retryable [`CoreError::Conflict`] — a
/// writer lost the race for the write lock and should re-read and
/// retry, exactly like a revision-token collision. Everything else is
/// internal.
pub(crate) fn map_db_err(err: sqlx::Error, context: &'static str) -> CoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let code = db_err.code();
        let code = code.as_deref().unwrap_or("");
        // Primary code 5 (SQLITE_BUSY) or extended 261/517 variants.
        if code == "5" || code == "261" || code == "517" || db_err.message().contains("locked") {
            tracing::debug!(context, "database busy, surfacing as conflict");
            return CoreError::Conflict("storage is busy; retry the operation".to_string());
        }
    }
    tracing::error!(context, error = %err, "database error");
    CoreError::Internal(format!("database error during {context}"))
}
