// src/handlers/admin.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    auth::CredentialVerifier,
    config::Config,
    error::AppError,
    models::question::{CreateQuestionRequest, Question, UpdateQuestionRequest},
    store::QuestionStore,
    utils::jwt::{ADMIN_ROLE, sign_jwt},
};

/// DTO for admin login.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Exchanges admin credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Bearer token issued"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "admin"
)]
pub async fn login(
    State(verifier): State<Arc<dyn CredentialVerifier>>,
    State(config): State<Config>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    if !verifier.verify(&payload.username, &payload.password).await? {
        tracing::warn!("Rejected admin login for: {}", payload.username);
        return Err(AppError::AuthError("Invalid username or password".to_string()));
    }

    let token = sign_jwt(
        &payload.username,
        ADMIN_ROLE,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer"
    })))
}

/// Lists all questions, newest first.
/// Admin only.
#[utoipa::path(
    get,
    path = "/admin/questions",
    responses((status = 200, description = "All questions", body = [Question])),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn list_questions(State(store): State<QuestionStore>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list().await?))
}

/// Retrieves a single question, including its correct answer.
/// Admin only.
#[utoipa::path(
    get,
    path = "/admin/questions/{id}",
    params(("id" = String, Path, description = "Question id")),
    responses(
        (status = 200, description = "The question", body = Question),
        (status = 404, description = "Question not found")
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn get_question(
    State(store): State<QuestionStore>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.get(&id).await?))
}

/// Creates a new quiz question.
/// Admin only.
#[utoipa::path(
    post,
    path = "/admin/questions",
    request_body = CreateQuestionRequest,
    responses(
        (status = 201, description = "Question created", body = Question),
        (status = 400, description = "Wrong option count or index out of range")
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn create_question(
    State(store): State<QuestionStore>,
    payload: Result<Json<CreateQuestionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let question = store.insert(payload).await?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Updates a question by ID. Absent fields are left unchanged.
/// Admin only.
#[utoipa::path(
    put,
    path = "/admin/questions/{id}",
    params(("id" = String, Path, description = "Question id")),
    request_body = UpdateQuestionRequest,
    responses(
        (status = 200, description = "Updated question", body = Question),
        (status = 400, description = "Update would break a question invariant"),
        (status = 404, description = "Question not found")
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn update_question(
    State(store): State<QuestionStore>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateQuestionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    Ok(Json(store.update(&id, payload).await?))
}

/// Deletes a quiz question by ID.
/// Admin only.
#[utoipa::path(
    delete,
    path = "/admin/questions/{id}",
    params(("id" = String, Path, description = "Question id")),
    responses(
        (status = 200, description = "Question deleted"),
        (status = 404, description = "Question not found")
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn delete_question(
    State(store): State<QuestionStore>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    store.delete(&id).await?;

    tracing::info!("Deleted question {}", id);
    Ok(Json(json!({ "message": "Question deleted" })))
}
