//! Question bank: categories, questions and the option → category mappings.

use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;
use crate::models::assessment::{AssessmentType, CategoryRow, MappingRow, QuestionRow};

/// Answer values 1..=5 each awarding their own number of points.
pub const DEFAULT_LADDER: [(i32, i32); 5] = [(1, 1), (2, 2), (3, 3), (4, 4), (5, 5)];

#[derive(Debug, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewQuestion {
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: AssessmentType,
    #[serde(default = "empty_options")]
    pub options: Value,
    pub correct_answer: Option<String>,
}

fn empty_options() -> Value {
    Value::Array(Vec::new())
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OptionPoints {
    pub answer_value: i32,
    pub points: i32,
}

#[derive(Debug, Deserialize)]
pub struct MappingRequest {
    pub question_id: i32,
    pub category_id: i32,
    /// When absent the default 1..=5 ladder is used.
    pub mappings: Option<Vec<OptionPoints>>,
}

impl MappingRequest {
    pub fn option_points(&self) -> Vec<(i32, i32)> {
        match &self.mappings {
            Some(list) => list.iter().map(|m| (m.answer_value, m.points)).collect(),
            None => DEFAULT_LADDER.to_vec(),
        }
    }
}

pub async fn create_category(pool: &PgPool, req: NewCategory) -> Result<CategoryRow, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("category name cannot be empty".to_string()));
    }

    let category = sqlx::query_as::<_, CategoryRow>(
        r#"
        INSERT INTO self_assessment_categories (name, description)
        VALUES ($1, $2)
        RETURNING id, name, description
        "#,
    )
    .bind(name)
    .bind(req.description.as_deref())
    .fetch_one(pool)
    .await?;

    info!(category_id = category.id, name = %category.name, "Created category");
    Ok(category)
}

pub async fn create_question(pool: &PgPool, req: NewQuestion) -> Result<QuestionRow, AppError> {
    if req.question.trim().is_empty() {
        return Err(AppError::Validation("question cannot be empty".to_string()));
    }
    if !req.options.is_array() {
        return Err(AppError::Validation("options must be a JSON array".to_string()));
    }
    let correct_answer = req
        .correct_answer
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let question = sqlx::query_as::<_, QuestionRow>(
        r#"
        INSERT INTO self_assessment_questions (question, type, options, correct_answer)
        VALUES ($1, $2, $3, $4)
        RETURNING id, question, type, options, correct_answer, created_at
        "#,
    )
    .bind(req.question.trim())
    .bind(req.question_type.as_str())
    .bind(&req.options)
    .bind(correct_answer)
    .fetch_one(pool)
    .await?;

    info!(
        question_id = question.id,
        assessment_type = %req.question_type,
        "Created question"
    );
    Ok(question)
}

pub async fn list_questions(
    pool: &PgPool,
    assessment_type: AssessmentType,
) -> Result<Vec<QuestionRow>, AppError> {
    Ok(sqlx::query_as::<_, QuestionRow>(
        "SELECT * FROM self_assessment_questions WHERE type = $1 ORDER BY id",
    )
    .bind(assessment_type.as_str())
    .fetch_all(pool)
    .await?)
}

/// Inserts the mappings of a question → category pair. Existing
/// `(question, answer value, category)` triples are left untouched.
/// Returns the full mapping set of the pair afterwards.
pub async fn upsert_mappings(
    pool: &PgPool,
    req: &MappingRequest,
) -> Result<Vec<MappingRow>, AppError> {
    let option_points = req.option_points();
    if option_points.is_empty() {
        return Err(AppError::Validation("mappings cannot be empty".to_string()));
    }

    let question_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM self_assessment_questions WHERE id = $1)")
            .bind(req.question_id)
            .fetch_one(pool)
            .await?;
    if !question_exists {
        return Err(AppError::NotFound(format!("Question {} not found", req.question_id)));
    }

    let category_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM self_assessment_categories WHERE id = $1)")
            .bind(req.category_id)
            .fetch_one(pool)
            .await?;
    if !category_exists {
        return Err(AppError::NotFound(format!("Category {} not found", req.category_id)));
    }

    let mut tx = pool.begin().await?;
    let mut inserted = 0_u64;
    for &(answer_value, points) in &option_points {
        let result = sqlx::query(
            r#"
            INSERT INTO self_assessment_mappings (question_id, answer_value, category_id, points)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(req.question_id)
        .bind(answer_value)
        .bind(req.category_id)
        .bind(points)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }
    tx.commit().await?;

    info!(
        question_id = req.question_id,
        category_id = req.category_id,
        inserted,
        "Upserted mappings"
    );

    Ok(sqlx::query_as::<_, MappingRow>(
        r#"
        SELECT * FROM self_assessment_mappings
        WHERE question_id = $1 AND category_id = $2
        ORDER BY answer_value
        "#,
    )
    .bind(req.question_id)
    .bind(req.category_id)
    .fetch_all(pool)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_mappings_use_default_ladder() {
        let req: MappingRequest =
            serde_json::from_str(r#"{"question_id": 1, "category_id": 2}"#).unwrap();
        assert_eq!(req.option_points(), vec![(1, 1), (2, 2), (3, 3), (4, 4), (5, 5)]);
    }

    #[test]
    fn test_explicit_mappings_are_kept() {
        let req: MappingRequest = serde_json::from_str(
            r#"{"question_id": 1, "category_id": 2,
                "mappings": [{"answer_value": 3, "points": 10}]}"#,
        )
        .unwrap();
        assert_eq!(req.option_points(), vec![(3, 10)]);
    }

    #[test]
    fn test_new_question_parses_type_and_defaults_options() {
        let q: NewQuestion =
            serde_json::from_str(r#"{"question": "2 + 2?", "type": "cognitive", "correct_answer": "4"}"#)
                .unwrap();
        assert_eq!(q.question_type, AssessmentType::Cognitive);
        assert_eq!(q.options, serde_json::json!([]));
    }

    #[test]
    fn test_new_question_rejects_unknown_type() {
        let r = serde_json::from_str::<NewQuestion>(r#"{"question": "x", "type": "technical"}"#);
        assert!(r.is_err());
    }
}
