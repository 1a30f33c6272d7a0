use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::assessment::repository;
use crate::errors::AppError;
use crate::models::assessment::{AssessmentType, CandidateResultRow, CompletedAssessmentRow};

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CompletionFlags {
    pub behavioral: bool,
    pub cognitive: bool,
    pub personality: bool,
}

#[derive(Debug, Serialize)]
pub struct AssessmentStatus {
    pub assessments_completed: CompletionFlags,
}

#[derive(Debug, Deserialize)]
pub struct CandidateDetailsRequest {
    pub user_id: i32,
    pub assessment_type: AssessmentType,
}

#[derive(Debug, Serialize)]
pub struct CandidateDetails {
    pub user_id: i32,
    pub assessment_type: AssessmentType,
    /// Latest session with scores, or 0 when the candidate has none.
    pub session_id: i32,
    pub results: Vec<CandidateResultRow>,
}

/// Folds completed sessions into per-type flags. Unknown type names are ignored.
pub fn completion_flags(completed: &[CompletedAssessmentRow]) -> CompletionFlags {
    let mut flags = CompletionFlags::default();
    for row in completed {
        match row.assessment_type.parse::<AssessmentType>() {
            Ok(AssessmentType::Behavioral) => flags.behavioral = true,
            Ok(AssessmentType::Cognitive) => flags.cognitive = true,
            Ok(AssessmentType::Personality) => flags.personality = true,
            Err(_) => {}
        }
    }
    flags
}

pub async fn assessment_status(pool: &PgPool, user_id: i32) -> Result<AssessmentStatus, AppError> {
    let completed = repository::get_completed_assessments(pool, user_id).await?;
    Ok(AssessmentStatus {
        assessments_completed: completion_flags(&completed),
    })
}

pub async fn candidate_details(
    pool: &PgPool,
    req: CandidateDetailsRequest,
) -> Result<CandidateDetails, AppError> {
    let results = repository::get_candidate_results(pool, req.user_id, req.assessment_type).await?;
    let session_id = results.first().map(|r| r.session_id).unwrap_or(0);
    Ok(CandidateDetails {
        user_id: req.user_id,
        assessment_type: req.assessment_type,
        session_id,
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(t: &str) -> CompletedAssessmentRow {
        CompletedAssessmentRow {
            assessment_type: t.to_string(),
        }
    }

    #[test]
    fn test_no_sessions_means_nothing_completed() {
        assert_eq!(completion_flags(&[]), CompletionFlags::default());
    }

    #[test]
    fn test_flags_follow_completed_types() {
        let flags = completion_flags(&[completed("cognitive"), completed("behavioral"), completed("cognitive")]);
        assert!(flags.behavioral);
        assert!(flags.cognitive);
        assert!(!flags.personality);
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        assert_eq!(completion_flags(&[completed("legacy")]), CompletionFlags::default());
    }

    #[test]
    fn test_status_json_shape() {
        let status = AssessmentStatus {
            assessments_completed: CompletionFlags {
                behavioral: true,
                ..Default::default()
            },
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            serde_json::json!({
                "assessments_completed": {
                    "behavioral": true,
                    "cognitive": false,
                    "personality": false
                }
            })
        );
    }
}
