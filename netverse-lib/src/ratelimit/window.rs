use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A slot was free and has been taken
    Granted,
    /// The window is full; the oldest entry leaves it in `reset_in`
    Throttled {
        /// Time until the oldest admission falls out of the window
        reset_in: Duration,
    },
}

/// A rolling log of admission timestamps for a single key.
///
/// Entries are purged lazily whenever the log is checked, so every timestamp
/// kept is at most `window` old at the moment of the check. An entry that is
/// exactly `window` old still counts.
#[derive(Debug, Clone)]
pub struct RequestLog {
    entries: VecDeque<Instant>,
    capacity: usize,
    window: Duration,
}

impl RequestLog {
    /// Create a log admitting `capacity` requests per `window`
    #[must_use]
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            window,
        }
    }

    /// Purge stale entries and take a slot if one is free
    pub fn check(&mut self, now: Instant) -> Admission {
        self.purge(now);
        if self.entries.len() < self.capacity {
            self.entries.push_back(now);
            return Admission::Granted;
        }

        let reset_in = self
            .entries
            .front()
            .map_or(Duration::ZERO, |oldest| {
                (*oldest + self.window).saturating_duration_since(now)
            });
        Admission::Throttled { reset_in }
    }

    fn purge(&mut self, now: Instant) {
        while let Some(oldest) = self.entries.front() {
            if now.saturating_duration_since(*oldest) > self.window {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Get the number of admissions currently in the log
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get an iterator over the admission timestamps, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Instant> {
        self.entries.iter()
    }
}
