// src/client.rs

use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;

use crate::{
    models::{
        question::PublicQuestion,
        submission::{SubmissionResult, SubmitRequest},
    },
    session::{ExamSession, SessionError, clock::Clock, storage::SessionStorage},
};

/// Failure talking to the exam API. Network and 5xx failures are retryable by
/// the test-taker; nothing is retried automatically.
#[derive(Debug)]
pub enum ClientError {
    Network(reqwest::Error),
    Server { status: StatusCode, message: String },
    Session(SessionError),
    /// The submission failed and the deadline passed while it was out. This
    /// is the attempt's expiry signal: submit again as-is.
    TimeRanOut(Box<ClientError>),
}

impl ClientError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) => true,
            ClientError::Server { status, .. } => status.is_server_error(),
            ClientError::Session(_) => false,
            ClientError::TimeRanOut(cause) => cause.is_retryable(),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Network(e) => write!(f, "network error: {}", e),
            ClientError::Server { status, message } => write!(f, "server returned {}: {}", status, message),
            ClientError::Session(e) => write!(f, "{}", e),
            ClientError::TimeRanOut(cause) => write!(f, "time ran out while submitting: {}", cause),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err)
    }
}

impl From<SessionError> for ClientError {
    fn from(err: SessionError) -> Self {
        ClientError::Session(err)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the sampling and scoring endpoints.
#[derive(Debug, Clone)]
pub struct ExamClient {
    http: reqwest::Client,
    base_url: String,
}

impl ExamClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn fetch_questions(&self, limit: usize) -> Result<Vec<PublicQuestion>, ClientError> {
        let response = self
            .http
            .get(format!("{}/questions", self.base_url))
            .query(&[("limit", limit)])
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    pub async fn submit(&self, request: &SubmitRequest) -> Result<SubmissionResult, ClientError> {
        let response = self
            .http
            .post(format!("{}/submit", self.base_url))
            .json(request)
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    /// Submits the session's answers.
    ///
    /// On success the session moves to `Submitted` and its local state is
    /// cleared. On failure it stays in progress with everything intact so the
    /// caller can offer a retry; if time ran out meanwhile the error is
    /// `TimeRanOut`.
    pub async fn submit_session<S, C>(
        &self,
        session: &mut ExamSession<S, C>,
    ) -> Result<SubmissionResult, ClientError>
    where
        S: SessionStorage,
        C: Clock,
    {
        let request = session.begin_submission()?;

        match self.submit(&request).await {
            Ok(result) => {
                if let Err(e) = session.complete_submission() {
                    tracing::warn!("Submission accepted but local session not fully cleared: {}", e);
                }
                Ok(result)
            }
            Err(e) => {
                tracing::warn!("Submission failed: {}", e);
                match session.abort_submission() {
                    Some(_) => Err(ClientError::TimeRanOut(Box::new(e))),
                    None => Err(e),
                }
            }
        }
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);

    Err(ClientError::Server { status, message })
}
