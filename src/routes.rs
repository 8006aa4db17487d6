// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, analytics, auth, papers, practice, profile, subjects},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, subjects, practice, profile, analytics,
///   papers, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/verify", post(auth::verify_email))
        .route("/login", post(auth::login));

    let subject_routes = Router::new()
        .route("/", get(subjects::list_catalog))
        // Protected personalization routes
        .merge(
            Router::new()
                .route(
                    "/selected",
                    get(subjects::list_selected).post(subjects::add_subject),
                )
                .route("/selected/{code}", delete(subjects::remove_subject))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let practice_routes = Router::new()
        .route("/next", get(practice::next_question))
        .route("/submit", post(practice::submit_answer))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let profile_routes = Router::new()
        .route("/me", get(profile::get_me))
        .route("/history", get(profile::get_history))
        .route("/stats", get(profile::get_stats))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let analytics_routes = Router::new().route(
        "/leaderboard/{subject_code}",
        get(analytics::get_leaderboard),
    );

    let paper_routes = Router::new()
        .route("/", get(papers::list_papers))
        .route("/{id}", get(papers::get_paper));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/{id}/access", put(admin::update_access))
        .route("/questions", post(admin::create_question))
        .route(
            "/questions/{id}",
            put(admin::update_question).delete(admin::delete_question),
        )
        .route("/papers", post(admin::create_paper))
        .route("/maintenance/expire-access", post(admin::expire_access))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/subjects", subject_routes)
        .nest("/api/practice", practice_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/analytics", analytics_routes)
        .nest("/api/papers", paper_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
