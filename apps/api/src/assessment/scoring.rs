//! Scoring engine: turns a session's answers into per-category scores.
//!
//! Two models exist, picked by assessment type:
//! - **points carried** (behavioral, personality): the points travel inside the
//!   stored answer payload; the mapping table only decides which category an
//!   answer feeds, by matching the selected option.
//! - **correct answer** (cognitive): every mapping of a question is visited and
//!   awards its points only when the selection equals the mapping's answer value.
//!
//! Everything here is pure; persistence lives in `repository`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::AppError;
use crate::models::assessment::{AssessmentType, MappingRow};

/// Points recorded for a points-carried answer whose value is not numeric.
pub const DEFAULT_POINTS: i32 = 2;

#[derive(Debug, Error, PartialEq)]
pub enum ScoringError {
    #[error("at least one answer is required")]
    EmptySubmission,
    #[error("question {0} was answered more than once")]
    DuplicateQuestion(i32),
    #[error("invalid answer value '{value}' for question {question_id}: expected an option number")]
    InvalidAnswerValue { question_id: i32, value: String },
    #[error("question {0} does not exist")]
    UnknownQuestion(i32),
    #[error("question {question_id} is a {actual} question, not {expected}")]
    QuestionTypeMismatch {
        question_id: i32,
        expected: AssessmentType,
        actual: String,
    },
    #[error("stored answer for question {question_id} is malformed: {reason}")]
    MalformedPayload { question_id: i32, reason: String },
}

impl From<ScoringError> for AppError {
    fn from(e: ScoringError) -> Self {
        match e {
            ScoringError::MalformedPayload { .. } => AppError::Internal(anyhow::anyhow!(e)),
            other => AppError::Validation(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringModel {
    PointsCarried,
    CorrectAnswer,
}

impl From<AssessmentType> for ScoringModel {
    fn from(t: AssessmentType) -> Self {
        match t {
            AssessmentType::Behavioral | AssessmentType::Personality => ScoringModel::PointsCarried,
            AssessmentType::Cognitive => ScoringModel::CorrectAnswer,
        }
    }
}

/// How contributions inside one category are folded into its score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregation {
    #[default]
    Sum,
    /// Mean of contributions, rounded to two decimal places.
    Average,
}

impl Aggregation {
    fn evaluate(&self, total: f64, count: usize) -> f64 {
        match self {
            Aggregation::Sum => total,
            Aggregation::Average => round2(total / count as f64),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Sum => f.write_str("sum"),
            Aggregation::Average => f.write_str("average"),
        }
    }
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Aggregation::Sum),
            "average" | "avg" => Ok(Aggregation::Average),
            other => Err(format!("unknown aggregation '{other}'")),
        }
    }
}

/// Raw answer value as sent by clients: either a string or a bare number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawAnswerValue {
    Number(i64),
    Text(String),
}

impl RawAnswerValue {
    fn into_text(self) -> String {
        match self {
            RawAnswerValue::Number(n) => n.to_string(),
            RawAnswerValue::Text(s) => s,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: i32,
    pub answer_value: RawAnswerValue,
}

/// The selected option, as stored in the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    Option(i64),
    Text(String),
}

impl Selection {
    /// The option number used to join against mappings, if the selection is numeric.
    pub fn option_number(&self) -> Option<i32> {
        match self {
            Selection::Option(n) => i32::try_from(*n).ok(),
            Selection::Text(s) => s.trim().parse::<i32>().ok(),
        }
    }
}

/// Stored per answer row as JSON `{"selected": .., "points": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub selected: Selection,
    pub points: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredAnswer {
    pub question_id: i32,
    pub payload: AnswerPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryScore {
    pub category_id: i32,
    pub score: f64,
}

/// Rejects empty submissions and questions answered twice.
pub fn validate_submission(answers: &[SubmittedAnswer]) -> Result<(), ScoringError> {
    if answers.is_empty() {
        return Err(ScoringError::EmptySubmission);
    }
    let mut seen = HashSet::with_capacity(answers.len());
    for answer in answers {
        if !seen.insert(answer.question_id) {
            return Err(ScoringError::DuplicateQuestion(answer.question_id));
        }
    }
    Ok(())
}

/// Checks every answered question against the bank: it must exist and be of
/// the submitted assessment type. `known` holds `(id, type)` of the answered
/// questions found in storage.
pub fn check_question_types(
    assessment_type: AssessmentType,
    answers: &[SubmittedAnswer],
    known: &[(i32, String)],
) -> Result<(), ScoringError> {
    let types: HashMap<i32, &str> = known.iter().map(|(id, t)| (*id, t.as_str())).collect();
    for answer in answers {
        match types.get(&answer.question_id) {
            None => return Err(ScoringError::UnknownQuestion(answer.question_id)),
            Some(&actual) if actual != assessment_type.as_str() => {
                return Err(ScoringError::QuestionTypeMismatch {
                    question_id: answer.question_id,
                    expected: assessment_type,
                    actual: actual.to_string(),
                })
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Builds the payload stored for one submitted answer.
pub fn build_payload(
    model: ScoringModel,
    answer: &SubmittedAnswer,
) -> Result<AnswerPayload, ScoringError> {
    let raw = answer.answer_value.clone().into_text();
    match model {
        ScoringModel::PointsCarried => {
            let points = raw.parse::<i32>().unwrap_or(DEFAULT_POINTS);
            Ok(AnswerPayload {
                selected: Selection::Text(raw),
                points,
            })
        }
        ScoringModel::CorrectAnswer => {
            let selected = raw
                .parse::<i64>()
                .map_err(|_| ScoringError::InvalidAnswerValue {
                    question_id: answer.question_id,
                    value: raw.clone(),
                })?;
            Ok(AnswerPayload {
                selected: Selection::Option(selected),
                points: 0,
            })
        }
    }
}

/// Builds payloads for a whole submission, in submission order.
pub fn build_payloads(
    model: ScoringModel,
    answers: &[SubmittedAnswer],
) -> Result<Vec<ScoredAnswer>, ScoringError> {
    answers
        .iter()
        .map(|a| {
            Ok(ScoredAnswer {
                question_id: a.question_id,
                payload: build_payload(model, a)?,
            })
        })
        .collect()
}

/// Decodes a payload read back from storage.
pub fn decode_payload(
    question_id: i32,
    value: serde_json::Value,
) -> Result<ScoredAnswer, ScoringError> {
    let payload = serde_json::from_value::<AnswerPayload>(value).map_err(|e| {
        ScoringError::MalformedPayload {
            question_id,
            reason: e.to_string(),
        }
    })?;
    Ok(ScoredAnswer {
        question_id,
        payload,
    })
}

/// Joins answers to mappings and aggregates contributions per category.
/// Output is ordered by category id; categories without contributions are absent.
pub fn compute_category_scores(
    model: ScoringModel,
    answers: &[ScoredAnswer],
    mappings: &[MappingRow],
    aggregation: Aggregation,
) -> Vec<CategoryScore> {
    let mut by_question: HashMap<i32, Vec<&MappingRow>> = HashMap::new();
    for m in mappings {
        by_question.entry(m.question_id).or_default().push(m);
    }

    let mut totals: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    let mut contribute = |category_id: i32, points: i32| {
        let slot = totals.entry(category_id).or_insert((0.0, 0));
        slot.0 += f64::from(points);
        slot.1 += 1;
    };

    for answer in answers {
        let Some(question_mappings) = by_question.get(&answer.question_id) else {
            continue;
        };
        let selected = answer.payload.selected.option_number();
        match model {
            ScoringModel::PointsCarried => {
                let Some(selected) = selected else { continue };
                // Mapping points are not consulted, under either aggregation.
                question_mappings
                    .iter()
                    .filter(|m| m.answer_value == selected)
                    .for_each(|m| contribute(m.category_id, answer.payload.points));
            }
            ScoringModel::CorrectAnswer => {
                for m in question_mappings {
                    let points = if selected == Some(m.answer_value) {
                        m.points
                    } else {
                        0
                    };
                    contribute(m.category_id, points);
                }
            }
        }
    }

    totals
        .into_iter()
        .map(|(category_id, (total, count))| CategoryScore {
            category_id,
            score: aggregation.evaluate(total, count),
        })
        .collect()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(question_id: i32, answer_value: i32, category_id: i32, points: i32) -> MappingRow {
        MappingRow {
            id: 0,
            question_id,
            answer_value,
            category_id,
            points,
        }
    }

    fn submitted(question_id: i32, value: &str) -> SubmittedAnswer {
        SubmittedAnswer {
            question_id,
            answer_value: RawAnswerValue::Text(value.to_string()),
        }
    }

    fn carried(question_id: i32, value: &str) -> ScoredAnswer {
        ScoredAnswer {
            question_id,
            payload: build_payload(ScoringModel::PointsCarried, &submitted(question_id, value))
                .unwrap(),
        }
    }

    fn cognitive(question_id: i32, selected: i64) -> ScoredAnswer {
        ScoredAnswer {
            question_id,
            payload: AnswerPayload {
                selected: Selection::Option(selected),
                points: 0,
            },
        }
    }

    #[test]
    fn test_model_follows_assessment_type() {
        assert_eq!(ScoringModel::from(AssessmentType::Behavioral), ScoringModel::PointsCarried);
        assert_eq!(ScoringModel::from(AssessmentType::Personality), ScoringModel::PointsCarried);
        assert_eq!(ScoringModel::from(AssessmentType::Cognitive), ScoringModel::CorrectAnswer);
    }

    #[test]
    fn test_points_carried_payload_uses_numeric_value() {
        let p = build_payload(ScoringModel::PointsCarried, &submitted(1, "4")).unwrap();
        assert_eq!(p.points, 4);
        assert_eq!(p.selected, Selection::Text("4".into()));
    }

    #[test]
    fn test_points_carried_payload_defaults_non_numeric_to_two() {
        let p = build_payload(ScoringModel::PointsCarried, &submitted(1, "Strongly agree")).unwrap();
        assert_eq!(p.points, DEFAULT_POINTS);
    }

    #[test]
    fn test_cognitive_payload_requires_number() {
        let err = build_payload(ScoringModel::CorrectAnswer, &submitted(7, "B")).unwrap_err();
        assert_eq!(
            err,
            ScoringError::InvalidAnswerValue {
                question_id: 7,
                value: "B".into()
            }
        );
        let ok = build_payload(ScoringModel::CorrectAnswer, &submitted(7, "3")).unwrap();
        assert_eq!(ok.selected, Selection::Option(3));
        assert_eq!(ok.points, 0);
    }

    #[test]
    fn test_numeric_json_answer_value_accepted() {
        let a: SubmittedAnswer =
            serde_json::from_str(r#"{"question_id": 2, "answer_value": 3}"#).unwrap();
        let p = build_payload(ScoringModel::CorrectAnswer, &a).unwrap();
        assert_eq!(p.selected, Selection::Option(3));
    }

    #[test]
    fn test_payload_json_shape() {
        let p = build_payload(ScoringModel::PointsCarried, &submitted(1, "3")).unwrap();
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v, serde_json::json!({"selected": "3", "points": 3}));
        let decoded = decode_payload(1, v).unwrap();
        assert_eq!(decoded.payload, p);
    }

    #[test]
    fn test_decode_rejects_malformed_payload() {
        let err = decode_payload(9, serde_json::json!({"choice": 1})).unwrap_err();
        assert!(matches!(err, ScoringError::MalformedPayload { question_id: 9, .. }));
    }

    #[test]
    fn test_validate_rejects_empty_and_duplicates() {
        assert_eq!(validate_submission(&[]), Err(ScoringError::EmptySubmission));
        let dup = vec![submitted(1, "1"), submitted(2, "2"), submitted(1, "3")];
        assert_eq!(validate_submission(&dup), Err(ScoringError::DuplicateQuestion(1)));
        assert!(validate_submission(&[submitted(1, "1")]).is_ok());
    }

    #[test]
    fn test_points_carried_sums_payload_points_per_category() {
        // Category 10 is fed by q1 and q2; category 20 by q3.
        let mappings = vec![
            mapping(1, 3, 10, 99),
            mapping(1, 4, 10, 99),
            mapping(2, 5, 10, 99),
            mapping(3, 2, 20, 99),
        ];
        let answers = vec![carried(1, "3"), carried(2, "5"), carried(3, "2")];
        let scores = compute_category_scores(
            ScoringModel::PointsCarried,
            &answers,
            &mappings,
            Aggregation::Sum,
        );
        // Mapping points are ignored; payload points (3 + 5, 2) are used.
        assert_eq!(
            scores,
            vec![
                CategoryScore { category_id: 10, score: 8.0 },
                CategoryScore { category_id: 20, score: 2.0 },
            ]
        );
    }

    #[test]
    fn test_points_carried_skips_unmatched_selection() {
        let mappings = vec![mapping(1, 1, 10, 1), mapping(2, 1, 20, 1)];
        // q1 selects option 4 with no mapping, q2 selects non-numeric text.
        let answers = vec![carried(1, "4"), carried(2, "sometimes")];
        let scores = compute_category_scores(
            ScoringModel::PointsCarried,
            &answers,
            &mappings,
            Aggregation::Sum,
        );
        assert!(scores.is_empty());
    }

    #[test]
    fn test_points_carried_one_answer_can_feed_two_categories() {
        let mappings = vec![mapping(1, 2, 10, 1), mapping(1, 2, 30, 1)];
        let scores = compute_category_scores(
            ScoringModel::PointsCarried,
            &[carried(1, "2")],
            &mappings,
            Aggregation::Sum,
        );
        assert_eq!(scores.len(), 2);
        assert!(scores.iter().all(|s| s.score == 2.0));
    }

    #[test]
    fn test_cognitive_awards_points_only_for_correct_option() {
        let mappings = vec![mapping(1, 2, 10, 5), mapping(2, 1, 10, 5), mapping(3, 4, 20, 3)];
        let answers = vec![cognitive(1, 2), cognitive(2, 3), cognitive(3, 1)];
        let scores = compute_category_scores(
            ScoringModel::CorrectAnswer,
            &answers,
            &mappings,
            Aggregation::Sum,
        );
        // Wrong answers still produce a zero-valued row for their category.
        assert_eq!(
            scores,
            vec![
                CategoryScore { category_id: 10, score: 5.0 },
                CategoryScore { category_id: 20, score: 0.0 },
            ]
        );
    }

    #[test]
    fn test_average_rounds_to_two_places() {
        let mappings = vec![mapping(1, 1, 10, 1), mapping(2, 2, 10, 2), mapping(3, 2, 10, 2)];
        let answers = vec![carried(1, "1"), carried(2, "2"), carried(3, "2")];
        let scores = compute_category_scores(
            ScoringModel::PointsCarried,
            &answers,
            &mappings,
            Aggregation::Average,
        );
        // (1 + 2 + 2) / 3 = 1.666..
        assert_eq!(scores, vec![CategoryScore { category_id: 10, score: 1.67 }]);
    }

    #[test]
    fn test_points_carried_average_uses_payload_points() {
        // Mapping points (10 and 1) differ from the selected options (4 and 2).
        let mappings = vec![mapping(1, 4, 10, 10), mapping(2, 2, 10, 1)];
        let answers = vec![carried(1, "4"), carried(2, "2")];
        let average = compute_category_scores(
            ScoringModel::PointsCarried,
            &answers,
            &mappings,
            Aggregation::Average,
        );
        assert_eq!(average, vec![CategoryScore { category_id: 10, score: 3.0 }]);
    }

    #[test]
    fn test_question_check_accepts_matching_types() {
        let known = vec![(1, "cognitive".to_string()), (2, "cognitive".to_string())];
        let answers = vec![submitted(1, "2"), submitted(2, "3")];
        assert_eq!(check_question_types(AssessmentType::Cognitive, &answers, &known), Ok(()));
    }

    #[test]
    fn test_question_check_rejects_unknown_id() {
        let known = vec![(1, "behavioral".to_string())];
        let answers = vec![submitted(1, "2"), submitted(999_999, "3")];
        assert_eq!(
            check_question_types(AssessmentType::Behavioral, &answers, &known),
            Err(ScoringError::UnknownQuestion(999_999))
        );
    }

    #[test]
    fn test_question_check_rejects_other_type() {
        // A cognitive question must not be scored as points-carried.
        let known = vec![(5, "cognitive".to_string())];
        let err = check_question_types(AssessmentType::Behavioral, &[submitted(5, "4")], &known)
            .unwrap_err();
        assert_eq!(
            err,
            ScoringError::QuestionTypeMismatch {
                question_id: 5,
                expected: AssessmentType::Behavioral,
                actual: "cognitive".to_string(),
            }
        );
        assert!(matches!(AppError::from(err), AppError::Validation(_)));
    }

    #[test]
    fn test_answers_without_mappings_contribute_nothing() {
        let scores = compute_category_scores(
            ScoringModel::CorrectAnswer,
            &[cognitive(42, 1)],
            &[mapping(1, 1, 10, 1)],
            Aggregation::Sum,
        );
        assert!(scores.is_empty());
    }

    #[test]
    fn test_aggregation_parse() {
        assert_eq!("sum".parse::<Aggregation>(), Ok(Aggregation::Sum));
        assert_eq!(" Average ".parse::<Aggregation>(), Ok(Aggregation::Average));
        assert!("median".parse::<Aggregation>().is_err());
    }
}
