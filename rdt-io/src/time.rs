//! Retransmission timing
//!
//! The only timeout in the system is the sender's retransmission timer: a
//! fixed interval measured from the last window progress, not a fixed
//! deadline. Whenever the window base advances the timer is re-anchored to
//! "now"; when the full interval passes without progress the in-flight
//! window is retransmitted.

use std::time::{Duration, Instant};

/// Rolling retransmission timeout
pub struct RetransmitTimer {
    interval: Duration,
    anchored_at: Instant,
}

impl RetransmitTimer {
    /// Create a timer with the given interval, anchored to now
    pub fn new(interval: Duration) -> Self {
        RetransmitTimer {
            interval,
            anchored_at: Instant::now(),
        }
    }

    /// Check if the interval has fully elapsed since the last anchor
    pub fn expired(&self) -> bool {
        self.anchored_at.elapsed() >= self.interval
    }

    /// Re-anchor the timer to now (on window progress or after a resend)
    pub fn reset(&mut self) {
        self.anchored_at = Instant::now();
    }

    /// Time left until expiry; zero if already expired
    ///
    /// Used as the deadline for waiting on incoming acknowledgments, so
    /// the wait wakes exactly when a retransmission is due.
    pub fn remaining(&self) -> Duration {
        self.interval.saturating_sub(self.anchored_at.elapsed())
    }

    /// The configured interval
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Bounded-retry accounting
///
/// Counts consecutive timeouts with no window progress; once the budget is
/// exceeded the transfer is declared dead rather than retried forever.
pub struct RetryBudget {
    max_retries: u32,
    consecutive: u32,
}

impl RetryBudget {
    /// Allow up to `max_retries` consecutive no-progress timeouts
    pub fn new(max_retries: u32) -> Self {
        RetryBudget {
            max_retries,
            consecutive: 0,
        }
    }

    /// Record a timeout; returns false once the budget is exhausted
    pub fn record_timeout(&mut self) -> bool {
        self.consecutive += 1;
        self.consecutive <= self.max_retries
    }

    /// Record window progress, clearing the consecutive count
    pub fn record_progress(&mut self) {
        self.consecutive = 0;
    }

    /// Consecutive timeouts since the last progress
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// The configured budget
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_timer_expires_after_interval() {
        let timer = RetransmitTimer::new(Duration::from_millis(10));
        assert!(!timer.expired());

        thread::sleep(Duration::from_millis(11));
        assert!(timer.expired());
        assert_eq!(timer.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_reset_reanchors() {
        let mut timer = RetransmitTimer::new(Duration::from_millis(10));
        thread::sleep(Duration::from_millis(11));
        assert!(timer.expired());

        timer.reset();
        assert!(!timer.expired());
        assert!(timer.remaining() > Duration::ZERO);
    }

    #[test]
    fn test_remaining_shrinks() {
        let timer = RetransmitTimer::new(Duration::from_millis(50));
        let first = timer.remaining();
        thread::sleep(Duration::from_millis(5));
        assert!(timer.remaining() < first);
    }

    #[test]
    fn test_retry_budget_exhaustion() {
        let mut budget = RetryBudget::new(2);

        assert!(budget.record_timeout());
        assert!(budget.record_timeout());
        assert!(!budget.record_timeout());
        assert_eq!(budget.consecutive(), 3);
    }

    #[test]
    fn test_progress_clears_budget() {
        let mut budget = RetryBudget::new(1);

        assert!(budget.record_timeout());
        budget.record_progress();
        assert!(budget.record_timeout());
    }
}
