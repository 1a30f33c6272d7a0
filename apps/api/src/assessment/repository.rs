//! SQL for sessions, answers and scores.
//!
//! Functions that take `&mut PgConnection` are meant to run inside the
//! submission/rescore transaction; the rest read straight from the pool.

use sqlx::{PgConnection, PgPool};

use crate::assessment::scoring::{CategoryScore, ScoredAnswer};
use crate::errors::AppError;
use crate::models::assessment::{
    AnswerRow, AssessmentType, CandidateResultRow, CandidateScoreRow, CompletedAssessmentRow,
    MappingRow, SessionRow, SessionScoreRow,
};

pub async fn create_session(
    conn: &mut PgConnection,
    user_id: i32,
    assessment_type: AssessmentType,
) -> Result<SessionRow, AppError> {
    Ok(sqlx::query_as::<_, SessionRow>(
        r#"
        INSERT INTO user_assessment_sessions (user_id, assessment_type)
        VALUES ($1, $2)
        RETURNING id, user_id, assessment_type, started_at, completed_at
        "#,
    )
    .bind(user_id)
    .bind(assessment_type.as_str())
    .fetch_one(conn)
    .await?)
}

/// Locks the session row for the rest of the transaction.
pub async fn get_session_for_update(
    conn: &mut PgConnection,
    session_id: i32,
) -> Result<Option<SessionRow>, AppError> {
    Ok(sqlx::query_as::<_, SessionRow>(
        "SELECT * FROM user_assessment_sessions WHERE id = $1 FOR UPDATE",
    )
    .bind(session_id)
    .fetch_optional(conn)
    .await?)
}

pub async fn get_session(
    pool: &PgPool,
    session_id: i32,
) -> Result<Option<SessionRow>, AppError> {
    Ok(
        sqlx::query_as::<_, SessionRow>("SELECT * FROM user_assessment_sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn insert_answers(
    conn: &mut PgConnection,
    user_id: i32,
    session_id: i32,
    answers: &[ScoredAnswer],
) -> Result<(), AppError> {
    for answer in answers {
        let payload = serde_json::to_value(&answer.payload)
            .map_err(|e| AppError::Internal(e.into()))?;
        sqlx::query(
            r#"
            INSERT INTO user_answers (user_id, session_id, question_id, answer_value)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user_id)
        .bind(session_id)
        .bind(answer.question_id)
        .bind(payload)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn get_session_answers(
    conn: &mut PgConnection,
    session_id: i32,
) -> Result<Vec<AnswerRow>, AppError> {
    Ok(sqlx::query_as::<_, AnswerRow>(
        "SELECT question_id, answer_value FROM user_answers WHERE session_id = $1 ORDER BY id",
    )
    .bind(session_id)
    .fetch_all(conn)
    .await?)
}

/// `(id, type)` of the listed questions that exist.
pub async fn get_question_types(
    conn: &mut PgConnection,
    question_ids: &[i32],
) -> Result<Vec<(i32, String)>, AppError> {
    Ok(sqlx::query_as::<_, (i32, String)>(
        "SELECT id, type FROM self_assessment_questions WHERE id = ANY($1)",
    )
    .bind(question_ids)
    .fetch_all(conn)
    .await?)
}

pub async fn get_mappings_for_questions(
    conn: &mut PgConnection,
    question_ids: &[i32],
) -> Result<Vec<MappingRow>, AppError> {
    Ok(sqlx::query_as::<_, MappingRow>(
        "SELECT * FROM self_assessment_mappings WHERE question_id = ANY($1) ORDER BY id",
    )
    .bind(question_ids)
    .fetch_all(conn)
    .await?)
}

/// Deletes every score of a session, returning how many rows went away.
pub async fn clear_session_scores(
    conn: &mut PgConnection,
    session_id: i32,
) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM user_assessment_scores WHERE session_id = $1")
        .bind(session_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn insert_scores(
    conn: &mut PgConnection,
    user_id: i32,
    session_id: i32,
    scores: &[CategoryScore],
) -> Result<(), AppError> {
    for score in scores {
        sqlx::query(
            r#"
            INSERT INTO user_assessment_scores (user_id, session_id, category_id, score)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user_id)
        .bind(session_id)
        .bind(score.category_id)
        .bind(score.score)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Stamps `completed_at`. Returns false when the session was already complete.
pub async fn complete_session(
    conn: &mut PgConnection,
    session_id: i32,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE user_assessment_sessions
        SET completed_at = NOW()
        WHERE id = $1 AND completed_at IS NULL
        "#,
    )
    .bind(session_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn get_session_scores(
    pool: &PgPool,
    session_id: i32,
) -> Result<Vec<SessionScoreRow>, AppError> {
    Ok(sqlx::query_as::<_, SessionScoreRow>(
        r#"
        SELECT s.id, s.user_id, s.session_id, s.category_id, s.score,
               c.name AS category_name,
               c.description AS category_description
        FROM user_assessment_scores s
        JOIN self_assessment_categories c ON c.id = s.category_id
        WHERE s.session_id = $1
        ORDER BY s.category_id
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?)
}

/// All sessions of a user, newest first.
pub async fn get_user_sessions(
    pool: &PgPool,
    user_id: i32,
) -> Result<Vec<SessionRow>, AppError> {
    Ok(sqlx::query_as::<_, SessionRow>(
        "SELECT * FROM user_assessment_sessions WHERE user_id = $1 ORDER BY started_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

pub async fn get_completed_assessments(
    pool: &PgPool,
    user_id: i32,
) -> Result<Vec<CompletedAssessmentRow>, AppError> {
    Ok(sqlx::query_as::<_, CompletedAssessmentRow>(
        r#"
        SELECT assessment_type
        FROM user_assessment_sessions
        WHERE user_id = $1 AND completed_at IS NOT NULL
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

/// One row per candidate: the highest-scoring category across completed sessions.
/// Ties are broken by category name so the overview is stable.
pub async fn list_candidate_scores(pool: &PgPool) -> Result<Vec<CandidateScoreRow>, AppError> {
    Ok(sqlx::query_as::<_, CandidateScoreRow>(
        r#"
        WITH ranked AS (
            SELECT s.user_id,
                   u.name AS candidate_name,
                   s.session_id,
                   sess.assessment_type,
                   c.name AS top_category,
                   s.score AS top_score,
                   ROW_NUMBER() OVER (
                       PARTITION BY s.user_id
                       ORDER BY s.score DESC, c.name ASC
                   ) AS score_rank
            FROM user_assessment_scores s
            JOIN self_assessment_categories c ON c.id = s.category_id
            JOIN user_assessment_sessions sess ON sess.id = s.session_id
            JOIN users u ON u.id = s.user_id
            WHERE sess.completed_at IS NOT NULL
        )
        SELECT user_id, candidate_name, session_id, assessment_type, top_category, top_score
        FROM ranked
        WHERE score_rank = 1
        ORDER BY user_id
        "#,
    )
    .fetch_all(pool)
    .await?)
}

/// Scores of one candidate for one assessment type, latest session first.
pub async fn get_candidate_results(
    pool: &PgPool,
    user_id: i32,
    assessment_type: AssessmentType,
) -> Result<Vec<CandidateResultRow>, AppError> {
    Ok(sqlx::query_as::<_, CandidateResultRow>(
        r#"
        SELECT s.id, s.user_id, s.session_id, s.category_id, s.score,
               c.name AS category_name,
               c.description AS category_description,
               sess.started_at AS assessment_date,
               sess.assessment_type
        FROM user_assessment_scores s
        JOIN self_assessment_categories c ON c.id = s.category_id
        JOIN user_assessment_sessions sess ON sess.id = s.session_id
        WHERE s.user_id = $1 AND sess.assessment_type = $2
        ORDER BY sess.started_at DESC, sess.id DESC, c.name
        "#,
    )
    .bind(user_id)
    .bind(assessment_type.as_str())
    .fetch_all(pool)
    .await?)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sqlx::postgres::PgPoolOptions;

    use super::*;

    #[tokio::test]
    async fn test_query_failures_surface_as_database_errors() {
        // Nothing listens on port 1, so acquiring a connection fails.
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(1))
            .connect_lazy("postgres://assessor@127.0.0.1:1/assessor")
            .unwrap();
        let err = get_session(&pool, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
