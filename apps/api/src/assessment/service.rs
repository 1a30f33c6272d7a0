//! Submission lifecycle: session → answers → scores → completed, in one transaction.

use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::assessment::repository;
use crate::assessment::scoring::{
    build_payloads, check_question_types, compute_category_scores, decode_payload,
    validate_submission, Aggregation, ScoredAnswer, ScoringModel, SubmittedAnswer,
};
use crate::errors::AppError;
use crate::models::assessment::{AssessmentType, SessionScoreRow};

#[derive(Debug, Serialize)]
pub struct SubmissionOutcome {
    pub message: String,
    pub session_id: i32,
    pub scores: Vec<SessionScoreRow>,
}

#[derive(Debug, Serialize)]
pub struct RescoreOutcome {
    pub session_id: i32,
    pub cleared: u64,
    pub scores: Vec<SessionScoreRow>,
}

/// Records a full submission and scores it.
///
/// Payloads are built and every answered question is checked against the bank
/// before anything is written, so a malformed answer never leaves a
/// half-created session behind. If the completion stamp cannot be applied the
/// whole transaction rolls back.
pub async fn submit_assessment(
    pool: &PgPool,
    user_id: i32,
    assessment_type: AssessmentType,
    answers: &[SubmittedAnswer],
    aggregation: Aggregation,
) -> Result<SubmissionOutcome, AppError> {
    validate_submission(answers)?;
    let model = ScoringModel::from(assessment_type);
    let scored = build_payloads(model, answers)?;

    let mut tx = pool.begin().await?;

    let question_ids: Vec<i32> = answers.iter().map(|a| a.question_id).collect();
    let known = repository::get_question_types(&mut tx, &question_ids).await?;
    check_question_types(assessment_type, answers, &known)?;

    let session = repository::create_session(&mut tx, user_id, assessment_type).await?;
    repository::insert_answers(&mut tx, user_id, session.id, &scored).await?;
    score_session(&mut tx, user_id, session.id, model, &scored, aggregation).await?;

    if !repository::complete_session(&mut tx, session.id).await? {
        return Err(AppError::Conflict(format!(
            "Session {} was already completed",
            session.id
        )));
    }
    tx.commit().await?;

    info!(
        user_id,
        session_id = session.id,
        %assessment_type,
        answers = scored.len(),
        "Assessment submitted"
    );

    let scores = repository::get_session_scores(pool, session.id).await?;
    Ok(SubmissionOutcome {
        message: format!("{assessment_type} assessment completed successfully"),
        session_id: session.id,
        scores,
    })
}

/// Recomputes the scores of an existing session from its stored answers.
/// `completed_at` is stamped only if the session never completed.
pub async fn rescore_session(
    pool: &PgPool,
    session_id: i32,
    aggregation: Aggregation,
) -> Result<RescoreOutcome, AppError> {
    let mut tx = pool.begin().await?;

    let session = repository::get_session_for_update(&mut tx, session_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?;
    let assessment_type = session
        .assessment_type
        .parse::<AssessmentType>()
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
    let model = ScoringModel::from(assessment_type);

    let scored = repository::get_session_answers(&mut tx, session_id)
        .await?
        .into_iter()
        .map(|row| decode_payload(row.question_id, row.answer_value))
        .collect::<Result<Vec<_>, _>>()?;
    if scored.is_empty() {
        warn!(session_id, "Rescoring a session without answers");
    }

    let cleared =
        score_session(&mut tx, session.user_id, session_id, model, &scored, aggregation).await?;

    if session.completed_at.is_none() {
        repository::complete_session(&mut tx, session_id).await?;
    }
    tx.commit().await?;

    info!(session_id, cleared, %assessment_type, "Session rescored");

    let scores = repository::get_session_scores(pool, session_id).await?;
    Ok(RescoreOutcome {
        session_id,
        cleared,
        scores,
    })
}

/// Clears and rewrites the session's scores. Returns the number of rows cleared.
async fn score_session(
    conn: &mut sqlx::PgConnection,
    user_id: i32,
    session_id: i32,
    model: ScoringModel,
    scored: &[ScoredAnswer],
    aggregation: Aggregation,
) -> Result<u64, AppError> {
    let question_ids: Vec<i32> = scored.iter().map(|a| a.question_id).collect();
    let mappings = repository::get_mappings_for_questions(conn, &question_ids).await?;
    let scores = compute_category_scores(model, scored, &mappings, aggregation);

    let cleared = repository::clear_session_scores(conn, session_id).await?;
    repository::insert_scores(conn, user_id, session_id, &scores).await?;

    if scores.is_empty() {
        warn!(session_id, "No answer matched a mapping; session has no scores");
    }
    Ok(cleared)
}
