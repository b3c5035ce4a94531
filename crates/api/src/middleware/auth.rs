//! Principal extraction for Axum handlers — the access boundary.
//!
//! Credential verification is the identity provider's job: an
//! authenticated reverse proxy injects `x-principal-id` and
//! `x-principal-role` on every request, and this service trusts them.
//! Use [`Principal`] as an extractor parameter in any handler; requests
//! without a valid principal are rejected with 401.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use weave_core::error::CoreError;
use weave_core::roles::{ROLE_ADMIN, ROLE_STANDARD};
use weave_core::types::DbId;

use crate::error::AppError;

/// Header carrying the authenticated principal's id.
pub const PRINCIPAL_ID_HEADER: &str = "x-principal-id";

/// Header carrying the authenticated principal's role.
pub const PRINCIPAL_ROLE_HEADER: &str = "x-principal-role";

/// The authenticated caller, as asserted by the identity provider.
#[derive(Debug, Clone)]
pub struct Principal {
    /// Owner id used to scope every store operation.
    pub user_id: DbId,
    /// Role name (`"standard"` or `"admin"`).
    pub role: String,
}

impl Principal {
    /// Whether the caller may use admin-only maintenance endpoints.
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(PRINCIPAL_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<DbId>().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "missing or invalid principal header".into(),
                ))
            })?;

        let role = parts
            .headers
            .get(PRINCIPAL_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(ROLE_STANDARD)
            .to_string();

        Ok(Principal { user_id, role })
    }
}
