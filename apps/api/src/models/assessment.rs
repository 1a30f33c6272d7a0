use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// The three self-assessment kinds a candidate can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentType {
    Behavioral,
    Personality,
    Cognitive,
}

impl AssessmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentType::Behavioral => "behavioral",
            AssessmentType::Personality => "personality",
            AssessmentType::Cognitive => "cognitive",
        }
    }
}

impl fmt::Display for AssessmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssessmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "behavioral" => Ok(AssessmentType::Behavioral),
            "personality" => Ok(AssessmentType::Personality),
            "cognitive" => Ok(AssessmentType::Cognitive),
            other => Err(format!("Invalid assessment type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CategoryRow {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuestionRow {
    pub id: i32,
    pub question: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub question_type: String,
    pub options: Value,
    pub correct_answer: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MappingRow {
    pub id: i32,
    pub question_id: i32,
    pub answer_value: i32,
    pub category_id: i32,
    pub points: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionRow {
    pub id: i32,
    pub user_id: i32,
    pub assessment_type: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A stored answer; `answer_value` holds the `{selected, points}` payload.
#[derive(Debug, Clone, FromRow)]
pub struct AnswerRow {
    pub question_id: i32,
    pub answer_value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionScoreRow {
    pub id: i32,
    pub user_id: i32,
    pub session_id: i32,
    pub category_id: i32,
    pub score: f64,
    pub category_name: String,
    pub category_description: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CompletedAssessmentRow {
    pub assessment_type: String,
}

/// One line of the recruiter overview: a candidate's highest-scoring category.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateScoreRow {
    pub user_id: i32,
    pub candidate_name: String,
    pub session_id: i32,
    pub assessment_type: String,
    pub top_category: String,
    pub top_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateResultRow {
    pub id: i32,
    pub user_id: i32,
    pub session_id: i32,
    pub category_id: i32,
    pub score: f64,
    pub category_name: String,
    pub category_description: Option<String>,
    pub assessment_date: DateTime<Utc>,
    pub assessment_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_types() {
        for t in [
            AssessmentType::Behavioral,
            AssessmentType::Cognitive,
            AssessmentType::Personality,
        ] {
            assert_eq!(t.as_str().parse::<AssessmentType>(), Ok(t));
        }
    }

    #[test]
    fn test_parse_rejects_unknown_and_case_variants() {
        assert!("Behavioral".parse::<AssessmentType>().is_err());
        assert!("technical".parse::<AssessmentType>().is_err());
        assert!("".parse::<AssessmentType>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&AssessmentType::Cognitive).unwrap();
        assert_eq!(json, "\"cognitive\"");
    }
}
