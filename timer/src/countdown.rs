//! Pure countdown state machine.
//!
//! [`Countdown`] holds no timers of its own. Every transition takes the
//! current wall-clock time and returns the events it produced, which keeps
//! the drift arithmetic testable without a runtime.

use chrono::{DateTime, Utc};

use crate::types::{TimerEvent, TimerMode, TimerSnapshot, TimerState};

#[derive(Debug, Clone)]
pub struct Countdown {
    remaining: u64,
    mode: TimerMode,
    running: bool,
    persisted_at: DateTime<Utc>,
    /// `persisted_at` of the running snapshot whose zero-crossing was
    /// reported by the last restore.
    completed_from: Option<DateTime<Utc>>,
}

impl Countdown {
    /// Creates a stopped countdown.
    #[must_use]
    pub fn new(remaining: u64, mode: TimerMode, now: DateTime<Utc>) -> Self {
        Self {
            remaining,
            mode,
            running: false,
            persisted_at: now,
            completed_from: None,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    #[must_use]
    pub fn state(&self) -> TimerState {
        TimerState {
            remaining_seconds: self.remaining,
            mode: self.mode,
            running: self.running,
            last_persisted_at: self.persisted_at,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            remaining_seconds: self.remaining,
            mode: self.mode,
            running: self.running,
            persisted_at: self.persisted_at,
        }
    }

    fn persist(&mut self, now: DateTime<Utc>, events: &mut Vec<TimerEvent>) {
        self.persisted_at = now;
        events.push(TimerEvent::Snapshot(self.snapshot()));
    }

    /// Starts ticking. Does nothing while running or at zero.
    pub fn start(&mut self, now: DateTime<Utc>) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        if self.running || self.remaining == 0 {
            return events;
        }
        self.running = true;
        self.persist(now, &mut events);
        events
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        self.running = false;
        self.persist(now, &mut events);
        events
    }

    /// Stops the countdown and re-arms it at `seconds`.
    pub fn reset(&mut self, seconds: u64, now: DateTime<Utc>) -> Vec<TimerEvent> {
        self.running = false;
        self.remaining = seconds;
        self.completed_from = None;
        let mut events = vec![TimerEvent::Tick {
            remaining_seconds: seconds,
        }];
        self.persist(now, &mut events);
        events
    }

    /// Records the active mode without touching the remaining time.
    pub fn set_mode(&mut self, mode: TimerMode, now: DateTime<Utc>) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        self.mode = mode;
        self.persist(now, &mut events);
        events
    }

    /// One interval elapsed.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        if !self.running || self.remaining == 0 {
            return events;
        }

        self.remaining -= 1;
        events.push(TimerEvent::Tick {
            remaining_seconds: self.remaining,
        });
        if self.remaining == 0 {
            self.running = false;
            events.push(TimerEvent::Completed { mode: self.mode });
        }
        self.persist(now, &mut events);
        events
    }

    /// Re-attaches to `snapshot`, subtracting the time a running countdown
    /// spent suspended.
    ///
    /// A running snapshot that would have crossed zero in the meantime is
    /// stopped at zero and completes once. Restoring that same snapshot again
    /// while still stopped at zero does not complete a second time; hosts
    /// should nonetheless pass back the newest [`TimerEvent::Snapshot`].
    pub fn restore(&mut self, snapshot: &TimerSnapshot, now: DateTime<Utc>) -> Vec<TimerEvent> {
        let already_completed = !self.running
            && self.remaining == 0
            && self.completed_from == Some(snapshot.persisted_at);
        self.completed_from = None;
        self.mode = snapshot.mode;
        self.remaining = snapshot.remaining_seconds;
        self.running = false;

        let mut events = Vec::new();
        if snapshot.running {
            let elapsed = u64::try_from((now - snapshot.persisted_at).num_seconds()).unwrap_or(0);
            self.remaining = snapshot.remaining_seconds.saturating_sub(elapsed);
            self.running = self.remaining > 0;
            events.push(TimerEvent::Tick {
                remaining_seconds: self.remaining,
            });
            if self.remaining == 0 && snapshot.remaining_seconds > 0 {
                self.completed_from = Some(snapshot.persisted_at);
                if !already_completed {
                    events.push(TimerEvent::Completed { mode: self.mode });
                }
            }
        } else {
            events.push(TimerEvent::Tick {
                remaining_seconds: self.remaining,
            });
        }

        self.persist(now, &mut events);
        events
    }
}
