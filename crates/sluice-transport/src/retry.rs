//! Exponential backoff for reconnecting client transports.

use std::time::Duration;

/// Reconnection policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any delay.
    pub max_delay: Duration,
    /// Factor applied to the delay after each failed attempt.
    pub multiplier: f64,
    /// Maximum consecutive attempts; `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_retries: None,
        }
    }
}

/// Stateful backoff derived from a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: RetryPolicy,
    attempts: u32,
    current_delay: Duration,
}

impl Backoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            current_delay: policy.initial_delay,
        }
    }

    /// Returns the delay before the next attempt, or `None` once the retry
    /// budget is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if let Some(max) = self.policy.max_retries
            && self.attempts >= max
        {
            return None;
        }

        let delay = self.current_delay;
        self.attempts += 1;
        self.current_delay = std::cmp::min(
            Duration::from_secs_f64(self.current_delay.as_secs_f64() * self.policy.multiplier),
            self.policy.max_delay,
        );
        Some(delay)
    }

    /// Number of attempts made since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Resets after a successful connection.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.current_delay = self.policy.initial_delay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_and_caps() {
        let mut backoff = Backoff::new(RetryPolicy {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            multiplier: 2.0,
            max_retries: None,
        });

        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(350)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(350)));
        assert_eq!(backoff.attempts(), 4);

        backoff.reset();
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_retry_budget() {
        let mut backoff = Backoff::new(RetryPolicy {
            max_retries: Some(2),
            ..Default::default()
        });

        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert_eq!(backoff.next_delay(), None);
    }
}
