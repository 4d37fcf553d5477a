// src/docs.rs

use axum::Json;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{
    handlers::{admin, quiz},
    models::{
        question::{CreateQuestionRequest, PublicQuestion, Question, UpdateQuestionRequest},
        submission::{AnswerDetail, AnswerSubmission, SubmissionResult, SubmitRequest},
    },
};

#[derive(OpenApi)]
#[openapi(
    info(title = "Mock Exam API", description = "Timed multiple-choice practice exams"),
    paths(
        quiz::get_questions,
        quiz::submit_answers,
        admin::login,
        admin::list_questions,
        admin::get_question,
        admin::create_question,
        admin::update_question,
        admin::delete_question,
    ),
    components(schemas(
        Question,
        PublicQuestion,
        CreateQuestionRequest,
        UpdateQuestionRequest,
        AnswerSubmission,
        SubmitRequest,
        AnswerDetail,
        SubmissionResult,
        admin::LoginRequest,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "exam", description = "Sampling and scoring"),
        (name = "admin", description = "Question bank administration")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Serves the generated OpenAPI document.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
