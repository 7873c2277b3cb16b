//! Exponential back-off retry logic.

use std::time::{Duration, Instant};

use crate::config::RetryConfig;

/// Tracks exponential back-off state for a sequence of retries.
///
/// Each call to `next_wait` doubles the wait time (capped at `max_wait`).
/// The schedule ends, returning `None`, once either the total time budget
/// is spent or `max_attempts` tries have been made.
pub struct ExponentialBackoff {
    init_wait: Duration,
    max_wait: Duration,
    total_budget: Duration,
    max_attempts: u32,
    current_wait: Duration,
    start: Instant,
    retries: u32,
}

impl ExponentialBackoff {
    /// Create a new back-off tracker.
    pub fn new(
        init_wait: Duration,
        max_wait: Duration,
        total_budget: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            init_wait,
            max_wait,
            total_budget,
            max_attempts: max_attempts.max(1),
            current_wait: init_wait,
            start: Instant::now(),
            retries: 0,
        }
    }

    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self::new(
            cfg.retry_init_wait,
            cfg.retry_max_wait,
            cfg.retry_total_time,
            cfg.max_attempts,
        )
    }

    /// Return the wait before the next try, or `None` if the budget is
    /// exhausted.
    pub fn next_wait(&mut self) -> Option<Duration> {
        let remaining = self.remaining()?;

        let wait = self.current_wait;
        self.current_wait = (self.current_wait * 2).min(self.max_wait);
        self.retries += 1;

        Some(wait.min(remaining))
    }

    /// Return a short wait (at most `init_wait`, capped at 1s) for transient
    /// refusals such as a busy server.
    pub fn fast_wait(&mut self) -> Option<Duration> {
        let remaining = self.remaining()?;
        self.retries += 1;
        let wait = self.init_wait.min(Duration::from_secs(1));
        Some(wait.min(remaining))
    }

    /// Reset the back-off wait to the initial value (e.g. after a failover).
    pub fn reset_wait(&mut self) {
        self.current_wait = self.init_wait;
    }

    /// Number of tries made so far, assuming one try precedes each wait.
    pub fn attempts(&self) -> u32 {
        self.retries + 1
    }

    /// Return total elapsed time since creation.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Whether no further try is allowed.
    pub fn is_exhausted(&self) -> bool {
        self.retries + 1 >= self.max_attempts || self.start.elapsed() >= self.total_budget
    }

    fn remaining(&self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        Some(self.total_budget.saturating_sub(self.start.elapsed()))
    }
}
