//! Request extractors and middleware.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac::RequireClient`] -- Requires the `client` role.
//! - [`rbac::RequireDeveloper`] -- Requires the `developer` role.
//! - [`error_detail::expose_error_detail`] -- Adds internal detail to 500 bodies outside production.

pub mod auth;
pub mod error_detail;
pub mod rbac;
