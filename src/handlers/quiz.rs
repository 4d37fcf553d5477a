// src/handlers/quiz.rs

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    config::Config,
    error::AppError,
    models::{
        question::PublicQuestion,
        submission::{SubmissionResult, SubmitRequest},
    },
    scoring::score_submission,
    store::QuestionStore,
};

/// Query parameters for sampling a paper.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SampleParams {
    /// Number of questions; non-numeric or non-positive values fall back to the default.
    pub limit: Option<String>,
}

impl SampleParams {
    /// Resolves the effective limit: default on garbage, clamped to `max`.
    pub fn resolve(&self, default: i64, max: i64) -> i64 {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(default)
            .min(max)
    }
}

/// Returns a random paper of questions without their correct answers.
#[utoipa::path(
    get,
    path = "/questions",
    params(SampleParams),
    responses(
        (status = 200, description = "Random questions, correct answers stripped", body = [PublicQuestion]),
        (status = 503, description = "Question store unavailable")
    ),
    tag = "exam"
)]
pub async fn get_questions(
    State(store): State<QuestionStore>,
    State(config): State<Config>,
    Query(params): Query<SampleParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.resolve(config.default_question_limit, config.max_question_limit);
    let paper = store.sample(limit).await?;

    tracing::debug!("Sampled {} questions (limit {})", paper.len(), limit);
    Ok(Json(paper))
}

/// Scores submitted answers against the question bank.
///
/// * Every submitted pair counts towards `totalQuestions`.
/// * Pairs naming an unknown question produce no detail line.
/// * Nothing is persisted.
#[utoipa::path(
    post,
    path = "/submit",
    request_body = SubmitRequest,
    responses(
        (status = 200, description = "Scored breakdown", body = SubmissionResult),
        (status = 400, description = "`answers` missing or not an array"),
        (status = 503, description = "Question store unavailable")
    ),
    tag = "exam"
)]
pub async fn submit_answers(
    State(store): State<QuestionStore>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload.map_err(|rejection| {
        tracing::debug!("Rejected submission body: {}", rejection.body_text());
        AppError::InvalidRequest("An `answers` array is required".to_string())
    })?;

    if req.answers.is_empty() {
        return Ok(Json(score_submission(&[], &Default::default())));
    }

    let ids: Vec<String> = req.answers.iter().map(|a| a.question_id.clone()).collect();
    let keys = store.answer_keys(&ids).await?;
    let result = score_submission(&req.answers, &keys);

    tracing::info!(
        "Scored submission: {}/{} correct ({}%)",
        result.correct_answers,
        result.total_questions,
        result.score
    );
    Ok(Json(result))
}
