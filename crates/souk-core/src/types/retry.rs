//! Retry policy for transient failures.

use std::time::Duration;

/// Delay strategy between attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Wait `retry_delay` before every retry
    Fixed,
    /// Multiply the delay after every retry, capped at `max_delay`
    Exponential {
        /// Multiplier for exponential backoff
        multiplier: f64,
        /// Maximum delay between retries
        max_delay: Duration,
    },
}

/// Configuration for the retry controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first call
    pub max_retries: u32,
    /// Delay before the first retry
    pub retry_delay: Duration,
    /// How the delay evolves across retries
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            backoff: Backoff::Fixed,
        }
    }
}

impl RetryConfig {
    /// Fixed-delay policy
    pub fn fixed(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
            backoff: Backoff::Fixed,
        }
    }

    /// Never retry
    pub fn disabled() -> Self {
        Self::fixed(0, Duration::ZERO)
    }

    /// Switch to exponential backoff
    pub fn with_exponential_backoff(mut self, multiplier: f64, max_delay: Duration) -> Self {
        self.backoff = Backoff::Exponential {
            multiplier,
            max_delay,
        };
        self
    }

    /// Delay to wait before retry number `retry` (zero-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.retry_delay,
            Backoff::Exponential {
                multiplier,
                max_delay,
            } => {
                let factor = multiplier.max(1.0).powi(retry.min(i32::MAX as u32) as i32);
                let millis = self.retry_delay.as_millis() as f64 * factor;
                if !millis.is_finite() || millis >= max_delay.as_millis() as f64 {
                    max_delay
                } else {
                    Duration::from_millis(millis as u64)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_millis(1000));
        assert_eq!(config.backoff, Backoff::Fixed);
    }

    #[test]
    fn test_fixed_delay_is_constant() {
        let config = RetryConfig::fixed(5, Duration::from_millis(250));
        for retry in 0..5 {
            assert_eq!(config.delay_for(retry), Duration::from_millis(250));
        }
    }

    #[test]
    fn test_exponential_delay_grows_and_caps() {
        let config = RetryConfig::fixed(5, Duration::from_millis(100))
            .with_exponential_backoff(2.0, Duration::from_millis(500));
        assert_eq!(config.delay_for(0), Duration::from_millis(100));
        assert_eq!(config.delay_for(1), Duration::from_millis(200));
        assert_eq!(config.delay_for(2), Duration::from_millis(400));
        assert_eq!(config.delay_for(3), Duration::from_millis(500));
        assert_eq!(config.delay_for(30), Duration::from_millis(500));
    }
}
