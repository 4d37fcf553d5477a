// src/session/scheduler.rs

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
    time::MissedTickBehavior,
};

use super::{
    ExamSession, SessionStatus,
    clock::Clock,
    storage::SessionStorage,
    timer::TimerStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick { remaining_secs: u64 },
    TimeUp,
}

/// Owns the background tick task. Dropping the handle stops the task, so a
/// ticker never outlives the screen that started it.
#[derive(Debug)]
pub struct TickerHandle {
    task: JoinHandle<()>,
}

impl TickerHandle {
    pub fn cancel(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Drives `session` once per `period`.
///
/// Emits `Tick` while time remains and a single `TimeUp` at expiry, then
/// stops. Ticks are skipped while a submission is in flight, and the task ends
/// on its own once the session leaves `InProgress` or its countdown has
/// already expired.
pub fn spawn_ticker<S, C>(
    session: Arc<Mutex<ExamSession<S, C>>>,
    period: Duration,
) -> (TickerHandle, mpsc::Receiver<TimerEvent>)
where
    S: SessionStorage + 'static,
    C: Clock + 'static,
{
    let (tx, rx) = mpsc::channel(16);

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            let event = {
                let mut session = session.lock().await;
                if session.status() != SessionStatus::InProgress
                    || session.timer_status() == TimerStatus::Expired
                {
                    break;
                }
                if session.is_submitting() {
                    continue;
                }

                match session.tick() {
                    Some(_) => TimerEvent::TimeUp,
                    None => TimerEvent::Tick {
                        remaining_secs: session.remaining_secs(),
                    },
                }
            };

            let expired = event == TimerEvent::TimeUp;
            if tx.send(event).await.is_err() || expired {
                break;
            }
        }

        tracing::debug!("Exam ticker stopped");
    });

    (TickerHandle { task }, rx)
}
