// src/session/mod.rs

//! Client-held state of one exam attempt.
//!
//! `ExamSession` is the `NotStarted -> InProgress -> Submitted` state machine.
//! Every mutation is written through to a [`SessionStorage`] so that a session
//! rebuilt with [`ExamSession::restore`] after a reload resumes where the old
//! one stopped, including the countdown.

pub mod clock;
pub mod scheduler;
pub mod storage;
pub mod timer;

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    config::{EXAM_DURATION_SECS, UNANSWERED},
    models::{
        question::PublicQuestion,
        submission::{AnswerSubmission, SubmitRequest},
    },
};
use clock::{Clock, SystemClock};
use storage::{SessionKey, SessionStorage};
use timer::{Countdown, TimeUp, TimerStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The action is not allowed in the current state.
    InvalidTransition {
        action: &'static str,
        status: SessionStatus,
    },
    EmptyPaper,
    UnknownQuestion(String),
    InvalidOption {
        question_id: String,
        option: usize,
        available: usize,
    },
    PositionOutOfRange {
        position: usize,
        len: usize,
    },
    SubmissionInFlight,
    /// The deadline passed before this call. Carries the attempt's one
    /// expiry signal; later calls see `TimeExpired`.
    DeadlinePassed(TimeUp),
    TimeExpired,
    Storage(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InvalidTransition { action, status } => {
                write!(f, "cannot {} while session is {:?}", action, status)
            }
            SessionError::EmptyPaper => write!(f, "no questions loaded"),
            SessionError::UnknownQuestion(id) => write!(f, "question {} is not on this paper", id),
            SessionError::InvalidOption {
                question_id,
                option,
                available,
            } => write!(
                f,
                "option {} out of range for question {} ({} options)",
                option, question_id, available
            ),
            SessionError::PositionOutOfRange { position, len } => {
                write!(f, "position {} out of range ({} questions)", position, len)
            }
            SessionError::SubmissionInFlight => write!(f, "a submission is already in flight"),
            SessionError::DeadlinePassed(_) => write!(f, "time ran out"),
            SessionError::TimeExpired => write!(f, "time is up"),
            SessionError::Storage(msg) => write!(f, "session storage error: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {}

pub struct ExamSession<S, C> {
    storage: S,
    clock: C,
    status: SessionStatus,
    paper: Vec<PublicQuestion>,
    answers: BTreeMap<String, usize>,
    current: usize,
    countdown: Countdown,
    submitting: bool,
}

impl<S: SessionStorage, C: Clock> ExamSession<S, C> {
    /// A fresh session that ignores anything already in `storage`.
    pub fn new(storage: S, clock: C, duration_secs: u64) -> Self {
        Self {
            storage,
            clock,
            status: SessionStatus::NotStarted,
            paper: Vec::new(),
            answers: BTreeMap::new(),
            current: 0,
            countdown: Countdown::new(duration_secs),
            submitting: false,
        }
    }

    /// Rebuilds a session from `storage`, e.g. after a page reload.
    ///
    /// When the persisted attempt has already run out of time the returned
    /// `TimeUp` must be acted on straight away.
    pub fn restore(storage: S, clock: C, duration_secs: u64) -> Result<(Self, Option<TimeUp>), SessionError> {
        let mut session = Self::new(storage, clock, duration_secs);

        session.paper = read_value(&session.storage, SessionKey::Paper)?.unwrap_or_default();
        session.answers = read_value(&session.storage, SessionKey::Answers)?.unwrap_or_default();
        session.current = read_value::<usize>(&session.storage, SessionKey::CurrentQuestion)?.unwrap_or(0);
        if session.current >= session.paper.len() {
            session.current = 0;
        }

        if read_value::<bool>(&session.storage, SessionKey::Started)? != Some(true) {
            return Ok((session, None));
        }

        session.status = SessionStatus::InProgress;
        let now = session.clock.now();
        let started_at = read_value::<i64>(&session.storage, SessionKey::TimerStart)?
            .and_then(DateTime::<Utc>::from_timestamp_millis);

        let time_up = match started_at {
            Some(started_at) => session.countdown.resume_from(started_at, now),
            None => {
                // Started flag without a start marker: anchor the timer now.
                tracing::warn!("Session marked started without a timer start; restarting countdown");
                session.countdown.start(now);
                write_value(&mut session.storage, SessionKey::TimerStart, &now.timestamp_millis())?;
                None
            }
        };
        session.persist_remaining();

        tracing::info!(
            "Restored exam session: {} questions, {} answered, {}s remaining",
            session.paper.len(),
            session.answers.len(),
            session.countdown.remaining_secs()
        );
        Ok((session, time_up))
    }

    /// Installs the sampled paper. Only allowed before the attempt starts;
    /// a new paper discards answers left over from an abandoned attempt.
    pub fn load_paper(&mut self, questions: Vec<PublicQuestion>) -> Result<(), SessionError> {
        if self.status != SessionStatus::NotStarted {
            return Err(self.invalid("load a paper"));
        }

        self.paper = questions;
        self.answers.clear();
        self.current = 0;
        write_value(&mut self.storage, SessionKey::Paper, &self.paper)?;
        self.storage.remove(SessionKey::Answers)?;
        write_value(&mut self.storage, SessionKey::CurrentQuestion, &self.current)
    }

    /// `NotStarted -> InProgress`: clears stale timer artifacts and anchors
    /// the countdown at the current instant.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.status != SessionStatus::NotStarted {
            return Err(self.invalid("start"));
        }
        if self.paper.is_empty() {
            return Err(SessionError::EmptyPaper);
        }

        let now = self.clock.now();
        self.countdown.start(now);
        if let Err(e) = self.persist_start(now) {
            self.countdown.reset();
            return Err(e);
        }

        self.status = SessionStatus::InProgress;
        tracing::info!("Exam started with {} questions", self.paper.len());
        Ok(())
    }

    /// Records (or replaces) the answer for one question and persists it
    /// immediately.
    pub fn select_answer(&mut self, question_id: &str, option: usize) -> Result<(), SessionError> {
        self.ensure_answering("select an answer")?;

        let question = self
            .paper
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.to_string()))?;

        let available = question.options.len();
        if option >= available {
            return Err(SessionError::InvalidOption {
                question_id: question_id.to_string(),
                option,
                available,
            });
        }

        let previous = self.answers.insert(question_id.to_string(), option);
        if let Err(e) = write_value(&mut self.storage, SessionKey::Answers, &self.answers) {
            match previous {
                Some(option) => self.answers.insert(question_id.to_string(), option),
                None => self.answers.remove(question_id),
            };
            return Err(e);
        }
        Ok(())
    }

    pub fn go_to(&mut self, position: usize) -> Result<usize, SessionError> {
        if self.status != SessionStatus::InProgress {
            return Err(self.invalid("navigate"));
        }
        if position >= self.paper.len() {
            return Err(SessionError::PositionOutOfRange {
                position,
                len: self.paper.len(),
            });
        }

        self.current = position;
        write_value(&mut self.storage, SessionKey::CurrentQuestion, &self.current)?;
        Ok(self.current)
    }

    /// Moves forward one question; stays put on the last one.
    pub fn next(&mut self) -> Result<usize, SessionError> {
        let last = self.paper.len().saturating_sub(1);
        self.go_to((self.current + 1).min(last))
    }

    /// Moves back one question; stays put on the first one.
    pub fn previous(&mut self) -> Result<usize, SessionError> {
        self.go_to(self.current.saturating_sub(1))
    }

    /// One timer tick: recomputes the countdown and records the remaining
    /// time. The expiry signal is returned even when that write fails.
    pub fn tick(&mut self) -> Option<TimeUp> {
        if self.status != SessionStatus::InProgress {
            return None;
        }

        let time_up = self.countdown.tick(self.clock.now());
        self.persist_remaining();
        time_up
    }

    /// Marks a submission in flight, pauses the timer and builds the request.
    /// Every paper question appears once, unanswered ones as `-1`.
    pub fn begin_submission(&mut self) -> Result<SubmitRequest, SessionError> {
        if self.status != SessionStatus::InProgress {
            return Err(self.invalid("submit"));
        }
        if self.submitting {
            return Err(SessionError::SubmissionInFlight);
        }

        self.submitting = true;
        self.countdown.pause();

        let answers = self
            .paper
            .iter()
            .map(|q| AnswerSubmission {
                question_id: q.id.clone(),
                selected_answer: self
                    .answers
                    .get(&q.id)
                    .map(|&option| option as i64)
                    .unwrap_or(UNANSWERED),
            })
            .collect();

        Ok(SubmitRequest { answers })
    }

    /// `InProgress -> Submitted` after the server accepted the submission.
    /// All persisted session keys are cleared.
    ///
    /// The transition happens even if clearing fails; the error only reports
    /// keys left behind.
    pub fn complete_submission(&mut self) -> Result<(), SessionError> {
        if self.status != SessionStatus::InProgress || !self.submitting {
            return Err(self.invalid("complete a submission"));
        }

        self.submitting = false;
        self.status = SessionStatus::Submitted;
        // Without the started flag leftovers restore as a fresh session.
        self.storage.remove(SessionKey::Started)?;
        self.storage.clear()?;
        tracing::info!("Exam submitted; local session cleared");
        Ok(())
    }

    /// A submission failed; the attempt stays in progress for a manual retry.
    /// Returns `TimeUp` if the deadline passed while the request was out.
    pub fn abort_submission(&mut self) -> Option<TimeUp> {
        if !self.submitting {
            return None;
        }

        self.submitting = false;
        let time_up = self.countdown.resume(self.clock.now());
        self.persist_remaining();
        time_up
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn paper(&self) -> &[PublicQuestion] {
        &self.paper
    }

    pub fn answers(&self) -> &BTreeMap<String, usize> {
        &self.answers
    }

    pub fn answer_for(&self, question_id: &str) -> Option<usize> {
        self.answers.get(question_id).copied()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn current_position(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&PublicQuestion> {
        self.paper.get(self.current)
    }

    pub fn remaining_secs(&self) -> u64 {
        self.countdown.remaining_secs()
    }

    pub fn timer_status(&self) -> TimerStatus {
        self.countdown.status()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Checks the deadline against the clock, not just the last tick.
    fn ensure_answering(&mut self, action: &'static str) -> Result<(), SessionError> {
        if self.status != SessionStatus::InProgress {
            return Err(self.invalid(action));
        }
        if self.submitting {
            return Err(SessionError::SubmissionInFlight);
        }
        if let Some(time_up) = self.countdown.tick(self.clock.now()) {
            self.persist_remaining();
            return Err(SessionError::DeadlinePassed(time_up));
        }
        if self.countdown.status() == TimerStatus::Expired {
            return Err(SessionError::TimeExpired);
        }
        Ok(())
    }

    fn persist_start(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.storage.remove(SessionKey::TimerStart)?;
        self.storage.remove(SessionKey::TimerRemaining)?;
        write_value(&mut self.storage, SessionKey::TimerStart, &now.timestamp_millis())?;
        write_value(&mut self.storage, SessionKey::TimerRemaining, &self.countdown.remaining_secs())?;
        write_value(&mut self.storage, SessionKey::Started, &true)?;
        write_value(&mut self.storage, SessionKey::CurrentQuestion, &self.current)
    }

    /// Restore recomputes from the start marker, so a lost write here costs
    /// nothing but a stale display value.
    fn persist_remaining(&mut self) {
        let remaining = self.countdown.remaining_secs();
        if let Err(e) = write_value(&mut self.storage, SessionKey::TimerRemaining, &remaining) {
            tracing::warn!("Failed to persist remaining time: {}", e);
        }
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            action,
            status: self.status,
        }
    }
}

impl<S: SessionStorage> ExamSession<S, SystemClock> {
    /// A standard ten-minute attempt on the wall clock.
    pub fn standard(storage: S) -> Self {
        Self::new(storage, SystemClock, EXAM_DURATION_SECS)
    }

    pub fn restore_standard(storage: S) -> Result<(Self, Option<TimeUp>), SessionError> {
        Self::restore(storage, SystemClock, EXAM_DURATION_SECS)
    }
}

/// Reads a JSON-encoded value; unreadable values count as absent.
fn read_value<T: DeserializeOwned>(
    storage: &impl SessionStorage,
    key: SessionKey,
) -> Result<Option<T>, SessionError> {
    let Some(raw) = storage.get(key)? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!("Ignoring corrupt session value {}: {}", key.name(), e);
            Ok(None)
        }
    }
}

fn write_value<T: Serialize + ?Sized>(
    storage: &mut impl SessionStorage,
    key: SessionKey,
    value: &T,
) -> Result<(), SessionError> {
    let encoded = serde_json::to_string(value).map_err(|e| SessionError::Storage(e.to_string()))?;
    storage.set(key, encoded)
}
