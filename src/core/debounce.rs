// File: src/core/debounce.rs
use std::time::Duration;

struct Scheduled<T> {
    due_at_ms: i64,
    payload: T,
}

/// A cancellable, fire-once scheduled task driven by an external clock.
///
/// `schedule` replaces whatever is pending and restarts the delay, so within
/// a burst only the last payload ever fires. Nothing runs on its own: the
/// owner calls `poll` with the current time and gets the payload back once
/// the deadline has passed.
pub struct Debouncer<T> {
    delay_ms: i64,
    pending: Option<Scheduled<T>>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay_ms: delay.as_millis() as i64,
            pending: None,
        }
    }

    pub fn schedule(&mut self, payload: T, now_ms: i64) {
        self.pending = Some(Scheduled {
            due_at_ms: now_ms + self.delay_ms,
            payload,
        });
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|s| s.payload)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn due_at(&self) -> Option<i64> {
        self.pending.as_ref().map(|s| s.due_at_ms)
    }

    pub fn poll(&mut self, now_ms: i64) -> Option<T> {
        match &self.pending {
            Some(s) if now_ms >= s.due_at_ms => self.cancel(),
            _ => None,
        }
    }
}
