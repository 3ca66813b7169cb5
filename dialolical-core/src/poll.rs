//! Waiting policy for the turn-polling loop.

use std::time::Duration;

/// How long to sleep between dialogue state fetches while it is not our turn,
/// and when to give up.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay before the first re-poll
    pub initial_interval: Duration,
    /// Upper bound for the grown delay
    pub max_interval: Duration,
    /// Growth factor applied per attempt; 1.0 keeps the interval fixed
    pub backoff_multiplier: f64,
    /// Total time allowed to wait for one turn; `None` waits forever
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(10),
            backoff_multiplier: 1.5,
            timeout: Some(Duration::from_secs(600)),
        }
    }
}

impl PollPolicy {
    /// Constant interval with no timeout.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            initial_interval: interval,
            max_interval: interval,
            backoff_multiplier: 1.0,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Delay to sleep after the given number of unsuccessful polls (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay = self.initial_interval.as_millis() as f64
            * self.backoff_multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let capped_delay = base_delay.min(self.max_interval.as_millis() as f64);

        Duration::from_millis(capped_delay as u64)
    }

    /// Clamp `delay` so the total wait never overshoots the timeout.
    ///
    /// Returns `None` once `elapsed` has already reached the timeout.
    pub fn next_sleep(&self, attempt: u32, elapsed: Duration) -> Option<Duration> {
        let delay = self.delay_for_attempt(attempt);
        match self.timeout {
            None => Some(delay),
            Some(limit) if elapsed >= limit => None,
            Some(limit) => Some(delay.min(limit - elapsed)),
        }
    }
}
