pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::assessment::handlers;
use crate::auth::handlers as auth;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/sign-up", post(auth::handle_signup))
        .route("/login", post(auth::handle_login))
        .route("/roles/:id", get(auth::handle_get_role))
        // Question bank
        .route(
            "/self-assessment/category",
            post(handlers::handle_create_category),
        )
        .route(
            "/self-assessment/question",
            post(handlers::handle_create_question),
        )
        .route(
            "/self-assessment/question/:type",
            get(handlers::handle_list_questions),
        )
        .route(
            "/self-assessment/mapping",
            put(handlers::handle_upsert_mappings),
        )
        // Candidate flow
        .route(
            "/self-assessment/submit/:type",
            post(handlers::handle_submit),
        )
        .route("/self-assessment/status", get(handlers::handle_status))
        .route(
            "/self-assessment/sessions",
            get(handlers::handle_list_sessions),
        )
        .route(
            "/self-assessment/sessions/:id/scores",
            get(handlers::handle_session_scores),
        )
        // Recruiter review
        .route(
            "/self-assessment/sessions/:id/rescore",
            post(handlers::handle_rescore),
        )
        .route(
            "/self-assessment/candidate/scores",
            get(handlers::handle_candidate_scores),
        )
        .route(
            "/self-assessment/candidate/details",
            post(handlers::handle_candidate_details),
        )
        .with_state(state)
}
