//! Well-known role name constants.
//!
//! Roles are assigned by the external identity provider and arrive on
//! every request; this service only compares against these names.

pub const ROLE_STANDARD: &str = "standard";
pub const ROLE_ADMIN: &str = "admin";
