use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Account management for superusers. Accounts cannot be deleted through the API.
///
/// Access Control:
/// The router is mounted behind the same authentication layer as the authenticated
/// routes; the handlers then reject callers without `is_superuser` with 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET/PATCH /users/{id}
        // Read or edit any account, including `is_active`, `is_superuser` and `is_verified`.
        .route(
            "/users/{id}",
            get(handlers::get_user).patch(handlers::update_user),
        )
}
