use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod repository;

// Routing segregated by access level (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use repository::{
    InMemoryRepository, NoteRepositoryState, PgNoteRepository, PgUserRepository,
    UserRepositoryState,
};

/// ApiDoc
///
/// OpenAPI document aggregated from the `#[utoipa::path]` handlers and the
/// `ToSchema` models, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_note, handlers::list_notes, handlers::list_public_notes,
        handlers::get_note, handlers::update_note, handlers::delete_note,
        handlers::register_user, handlers::login, handlers::logout,
        handlers::get_me, handlers::update_me, handlers::get_user, handlers::update_user,
    ),
    components(
        schemas(
            models::Note, models::CompactNote, models::NoteCreate, models::NoteUpdate,
            models::UserRead, models::UserCreate, models::UserUpdate, models::LoginForm,
            models::AccessToken,
        )
    ),
    tags(
        (name = "notes", description = "Multi-tenant notes API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single, immutable container shared by every request: both repositories and
/// the configuration loaded at startup.
#[derive(Clone)]
pub struct AppState {
    pub notes: NoteRepositoryState,
    pub users: UserRepositoryState,
    pub config: AppConfig,
}

impl AppState {
    /// State backed by a single `InMemoryRepository` for both notes and users.
    pub fn in_memory(repo: std::sync::Arc<InMemoryRepository>, config: AppConfig) -> Self {
        Self {
            notes: repo.clone(),
            users: repo,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for NoteRepositoryState {
    fn from_ref(app_state: &AppState) -> NoteRepositoryState {
        app_state.notes.clone()
    }
}

impl FromRef<AppState> for UserRepositoryState {
    fn from_ref(app_state: &AppState) -> UserRepositoryState {
        app_state.users.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for a whole router. Extracting `AuthUser` rejects the
/// request with 401 before any handler runs; on success the identity is stored in the
/// request extensions so the handlers' own `AuthUser` argument skips the user lookup.
async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// create_router
///
/// Assembles the routing structure, applies global and scoped middleware, and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .merge(admin::admin_routes())
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        )
        .with_state(state);

    // Observability: request id generation, tracing span per request, id propagation.
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span so every log line of a request carries its
/// `x-request-id` next to the method and URI.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
