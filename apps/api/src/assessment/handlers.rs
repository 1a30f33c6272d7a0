//! Axum route handlers for the self-assessment API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::assessment::catalog::{self, MappingRequest, NewCategory, NewQuestion};
use crate::assessment::repository;
use crate::assessment::results::{self, AssessmentStatus, CandidateDetails, CandidateDetailsRequest};
use crate::assessment::scoring::SubmittedAnswer;
use crate::assessment::service::{self, RescoreOutcome, SubmissionOutcome};
use crate::auth::extract::{AuthUser, Recruiter};
use crate::errors::AppError;
use crate::models::assessment::{
    AssessmentType, CandidateScoreRow, CategoryRow, MappingRow, QuestionRow, SessionRow,
    SessionScoreRow,
};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Serialize)]
pub struct SessionScoresResponse {
    pub session_id: i32,
    pub scores: Vec<SessionScoreRow>,
}

fn parse_type(raw: &str) -> Result<AssessmentType, AppError> {
    raw.parse::<AssessmentType>().map_err(AppError::Validation)
}

// ────────────────────────────────────────────────────────────────────────────
// Question bank (recruiter)
// ────────────────────────────────────────────────────────────────────────────

/// POST /self-assessment/category
pub async fn handle_create_category(
    State(state): State<AppState>,
    _recruiter: Recruiter,
    Json(req): Json<NewCategory>,
) -> Result<Json<CategoryRow>, AppError> {
    Ok(Json(catalog::create_category(&state.db, req).await?))
}

/// POST /self-assessment/question
pub async fn handle_create_question(
    State(state): State<AppState>,
    _recruiter: Recruiter,
    Json(req): Json<NewQuestion>,
) -> Result<Json<QuestionRow>, AppError> {
    Ok(Json(catalog::create_question(&state.db, req).await?))
}

/// PUT /self-assessment/mapping
pub async fn handle_upsert_mappings(
    State(state): State<AppState>,
    _recruiter: Recruiter,
    Json(req): Json<MappingRequest>,
) -> Result<Json<Vec<MappingRow>>, AppError> {
    Ok(Json(catalog::upsert_mappings(&state.db, &req).await?))
}

/// GET /self-assessment/question/:type
pub async fn handle_list_questions(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(raw_type): Path<String>,
) -> Result<Json<Vec<QuestionRow>>, AppError> {
    let assessment_type = parse_type(&raw_type)?;
    Ok(Json(catalog::list_questions(&state.db, assessment_type).await?))
}

// ────────────────────────────────────────────────────────────────────────────
// Candidate flow
// ────────────────────────────────────────────────────────────────────────────

/// POST /self-assessment/submit/:type
///
/// Creates a session for the caller, stores every answer, scores the session
/// and marks it complete. The whole submission succeeds or nothing is stored.
pub async fn handle_submit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(raw_type): Path<String>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmissionOutcome>, AppError> {
    let assessment_type = parse_type(&raw_type)?;
    let outcome = service::submit_assessment(
        &state.db,
        user.user_id,
        assessment_type,
        &req.answers,
        state.config.score_aggregation,
    )
    .await?;
    Ok(Json(outcome))
}

/// GET /self-assessment/status
pub async fn handle_status(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<AssessmentStatus>, AppError> {
    Ok(Json(results::assessment_status(&state.db, user.user_id).await?))
}

/// GET /self-assessment/sessions
pub async fn handle_list_sessions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<SessionRow>>, AppError> {
    Ok(Json(repository::get_user_sessions(&state.db, user.user_id).await?))
}

/// GET /self-assessment/sessions/:id/scores
///
/// Candidates can only read their own sessions; recruiters can read any.
pub async fn handle_session_scores(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<i32>,
) -> Result<Json<SessionScoresResponse>, AppError> {
    let session = repository::get_session(&state.db, session_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?;
    if session.user_id != user.user_id && !user.is_recruiter() {
        return Err(AppError::Forbidden);
    }

    let scores = repository::get_session_scores(&state.db, session_id).await?;
    Ok(Json(SessionScoresResponse { session_id, scores }))
}

// ────────────────────────────────────────────────────────────────────────────
// Recruiter review
// ────────────────────────────────────────────────────────────────────────────

/// POST /self-assessment/sessions/:id/rescore
pub async fn handle_rescore(
    State(state): State<AppState>,
    _recruiter: Recruiter,
    Path(session_id): Path<i32>,
) -> Result<Json<RescoreOutcome>, AppError> {
    let outcome =
        service::rescore_session(&state.db, session_id, state.config.score_aggregation).await?;
    Ok(Json(outcome))
}

/// GET /self-assessment/candidate/scores
pub async fn handle_candidate_scores(
    State(state): State<AppState>,
    _recruiter: Recruiter,
) -> Result<Json<Vec<CandidateScoreRow>>, AppError> {
    Ok(Json(repository::list_candidate_scores(&state.db).await?))
}

/// POST /self-assessment/candidate/details
pub async fn handle_candidate_details(
    State(state): State<AppState>,
    _recruiter: Recruiter,
    Json(req): Json<CandidateDetailsRequest>,
) -> Result<Json<CandidateDetails>, AppError> {
    Ok(Json(results::candidate_details(&state.db, req).await?))
}
