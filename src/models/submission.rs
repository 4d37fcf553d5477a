// src/models/submission.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::UNANSWERED;

/// One submitted answer. A missing `selectedAnswer` counts as unanswered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub question_id: String,
    #[serde(default = "unanswered")]
    pub selected_answer: i64,
}

fn unanswered() -> i64 {
    UNANSWERED
}

/// DTO for submitting an exam attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubmitRequest {
    pub answers: Vec<AnswerSubmission>,
}

/// Per-question scoring line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDetail {
    pub question_id: String,
    pub question_text: String,
    pub selected_answer: i64,
    pub correct_answer: i64,
    pub is_correct: bool,
}

/// Scored breakdown returned by `POST /submit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub total_questions: usize,
    pub correct_answers: usize,
    /// Percentage, rounded to the nearest integer.
    pub score: u32,
    pub details: Vec<AnswerDetail>,
}
