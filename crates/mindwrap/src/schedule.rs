//! Deterministic timers driven by explicit `Instant` ticks.

use std::time::{Duration, Instant};

/// Delay between an image load and the refresh it triggers.
pub const REFRESH_DEBOUNCE: Duration = Duration::from_millis(200);

/// Trailing-edge debouncer: fires once `delay` has passed since the last call.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(REFRESH_DEBOUNCE)
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn call(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Returns `true` once per expired deadline.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Start recording user pan/zoom for an instance once its first transition has settled.
    EnableTracking { handler: String },
}

impl Task {
    pub fn handler(&self) -> &str {
        match self {
            Self::EnableTracking { handler } => handler,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    next_seq: u64,
    entries: Vec<(Instant, u64, Task)>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: Instant, task: Task) {
        self.entries.push((at, self.next_seq, task));
        self.next_seq += 1;
    }

    /// Removes and returns every task due at `now`, earliest first.
    pub fn due(&mut self, now: Instant) -> Vec<Task> {
        let (mut ready, pending): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|(at, _, _)| *at <= now);
        self.entries = pending;
        ready.sort_by_key(|(at, seq, _)| (*at, *seq));
        ready.into_iter().map(|(_, _, task)| task).collect()
    }

    pub fn cancel_handler(&mut self, handler: &str) {
        self.entries.retain(|(_, _, task)| task.handler() != handler);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
