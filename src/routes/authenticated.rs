use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Everything a signed-in user can do with their notes and their own account.
/// Ownership and superuser checks happen in the handlers through `policy`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /auth/jwt/logout
        .route("/auth/jwt/logout", post(handlers::logout))
        // GET/PATCH /users/me
        .route(
            "/users/me",
            get(handlers::get_me).patch(handlers::update_me),
        )
        // --- Notes ---
        // GET lists own notes (all notes for a superuser); POST creates one.
        .route(
            "/notes",
            get(handlers::list_notes).post(handlers::create_note),
        )
        // GET /notes/global
        // Public notes of every user. The static segment wins over `/notes/{id}`.
        .route("/notes/global", get(handlers::list_public_notes))
        // GET/PATCH/DELETE /notes/{id}
        .route(
            "/notes/{id}",
            get(handlers::get_note)
                .patch(handlers::update_note)
                .delete(handlers::delete_note),
        )
}
