// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use utoipa::ToSchema;
use validator::Validate;

use crate::{config::OPTION_COUNT, error::AppError};

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: String,

    /// The text content of the question.
    pub question_text: String,

    /// Exactly four answer options, stored as a JSON array.
    #[schema(value_type = Vec<String>)]
    pub options: Json<Vec<String>>,

    /// Index into `options` of the correct answer (0..=3).
    pub correct_answer_index: i64,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for sending a question to a test-taker (excludes the correct answer).
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    #[serde(rename = "_id")]
    pub id: String,
    pub question_text: String,
    #[schema(value_type = Vec<String>)]
    pub options: Json<Vec<String>>,
}

/// Answer key row used by scoring.
#[derive(Debug, Clone, FromRow)]
pub struct AnswerKey {
    pub id: String,
    pub question_text: String,
    pub correct_answer_index: i64,
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000, message = "Question text must be between 1 and 1000 characters."))]
    pub question_text: String,
    #[validate(
        length(equal = 4, message = "Exactly 4 options are required."),
        custom(function = validate_options)
    )]
    pub options: Vec<String>,
    #[validate(range(min = 0, max = 3, message = "Correct answer index must be between 0 and 3."))]
    pub correct_answer_index: i64,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 1000, message = "Question text must be between 1 and 1000 characters."))]
    pub question_text: Option<String>,
    #[validate(
        length(equal = 4, message = "Exactly 4 options are required."),
        custom(function = validate_options)
    )]
    pub options: Option<Vec<String>>,
    #[validate(range(min = 0, max = 3, message = "Correct answer index must be between 0 and 3."))]
    pub correct_answer_index: Option<i64>,
}

impl UpdateQuestionRequest {
    pub fn is_empty(&self) -> bool {
        self.question_text.is_none() && self.options.is_none() && self.correct_answer_index.is_none()
    }
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

/// Shape check applied by the store before every write, independent of
/// request validation.
pub fn check_question_shape(options: &[String], correct_answer_index: i64) -> Result<(), AppError> {
    if options.len() != OPTION_COUNT {
        return Err(AppError::Validation(format!(
            "A question must have exactly {} options, got {}",
            OPTION_COUNT,
            options.len()
        )));
    }
    if !(0..OPTION_COUNT as i64).contains(&correct_answer_index) {
        return Err(AppError::Validation(format!(
            "Correct answer index must be between 0 and {}, got {}",
            OPTION_COUNT - 1,
            correct_answer_index
        )));
    }
    Ok(())
}
