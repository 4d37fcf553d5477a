// src/session/timer.rs

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Expired,
}

/// Signal that the countdown reached zero. Produced at most once per countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "time up must trigger a submission"]
pub struct TimeUp;

/// Countdown anchored to an absolute start instant.
///
/// Remaining time is always recomputed from `started_at`, never decremented,
/// so a countdown rebuilt after a reload agrees with the one that was lost.
#[derive(Debug, Clone)]
pub struct Countdown {
    duration_secs: u64,
    started_at: Option<DateTime<Utc>>,
    remaining_secs: u64,
    status: TimerStatus,
    fired: bool,
}

impl Countdown {
    pub fn new(duration_secs: u64) -> Self {
        Self {
            duration_secs,
            started_at: None,
            remaining_secs: duration_secs,
            status: TimerStatus::Idle,
            fired: false,
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        self.started_at = Some(now);
        self.remaining_secs = self.duration_secs;
        self.status = TimerStatus::Running;
        self.fired = false;
    }

    /// Back to the unstarted state.
    pub fn reset(&mut self) {
        *self = Self::new(self.duration_secs);
    }

    /// Re-anchors to a persisted start instant. Fires immediately when the
    /// deadline already passed.
    pub fn resume_from(&mut self, started_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<TimeUp> {
        self.started_at = Some(started_at);
        self.status = TimerStatus::Running;
        self.fired = false;
        self.recompute(now)
    }

    pub fn recompute(&mut self, now: DateTime<Utc>) -> Option<TimeUp> {
        let started_at = self.started_at?;
        self.remaining_secs = remaining_at(self.duration_secs, started_at, now);
        if self.remaining_secs > 0 {
            return None;
        }

        self.status = TimerStatus::Expired;
        if self.fired {
            return None;
        }
        self.fired = true;
        Some(TimeUp)
    }

    /// Periodic tick. Ignored unless running.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<TimeUp> {
        match self.status {
            TimerStatus::Running => self.recompute(now),
            _ => None,
        }
    }

    /// Stops ticking; `started_at` is left alone.
    pub fn pause(&mut self) {
        if self.status == TimerStatus::Running {
            self.status = TimerStatus::Paused;
        }
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Option<TimeUp> {
        if self.status == TimerStatus::Paused {
            self.status = TimerStatus::Running;
        }
        self.recompute(now)
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

/// Whole seconds left at `now`. A clock that moved backwards counts as no
/// time elapsed; an overrun clamps to zero.
pub fn remaining_at(duration_secs: u64, started_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let elapsed = (now - started_at).num_seconds().max(0) as u64;
    duration_secs.saturating_sub(elapsed)
}
