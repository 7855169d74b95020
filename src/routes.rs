// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, drafts, exams, pattern},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, pattern, drafts, exams).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (stores, curriculum pattern, draft registry).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        // Protected identity route
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .layer(require_auth.clone()),
        );

    let draft_routes = Router::new()
        .route("/", post(drafts::create_draft))
        .route("/{id}", get(drafts::get_draft).delete(drafts::discard_draft))
        .route("/{id}/title", put(drafts::set_title))
        .route("/{id}/questions", post(drafts::add_question))
        .route(
            "/{id}/questions/{section}/{number}",
            delete(drafts::remove_question),
        )
        .route("/{id}/progress", get(drafts::get_progress))
        .route("/{id}/submit", post(drafts::submit_draft))
        .layer(require_auth.clone());

    let exam_routes = Router::new()
        .route("/", post(exams::create_exam).get(exams::list_exams))
        .route("/{id}", get(exams::get_exam))
        .layer(require_auth);

    Router::new()
        .route("/api/pattern", get(pattern::get_pattern))
        .nest("/api/auth", auth_routes)
        .nest("/api/drafts", draft_routes)
        .nest("/api/exams", exam_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
