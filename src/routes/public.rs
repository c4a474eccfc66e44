use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token. Nothing here returns note data.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers; does not touch the database.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/register
        .route("/auth/register", post(handlers::register_user))
        // POST /auth/jwt/login
        // Form-encoded `username` (the email) and `password`; returns a bearer token.
        .route("/auth/jwt/login", post(handlers::login))
}
