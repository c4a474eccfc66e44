/// Router Module Index
///
/// Routes are grouped by who may call them, so access control is applied per group
/// (via Axum layers) instead of per route.

/// Routes accessible without credentials: health, registration, login.
pub mod public;

/// Routes protected by the `AuthUser` middleware layer.
pub mod authenticated;

/// Routes restricted to superusers. The role check lives in the handlers.
pub mod admin;
