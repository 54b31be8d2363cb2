use std::time::Duration;

use lingo_core::config::RetryConfig;
use lingo_core::executor::RetryStrategy;

pub struct ExponentialBackoff {
    config: RetryConfig,
}

pub struct LinearBackoff {
    config: RetryConfig,
}

impl ExponentialBackoff {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl LinearBackoff {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl RetryStrategy for ExponentialBackoff {
    fn name(&self) -> &str {
        "exponential-backoff"
    }

    fn next_delay(&self, attempt: u32, _error: &str) -> Option<Duration> {
        if attempt >= self.config.max_attempts {
            return None;
        }
        let exp = 1u64 << attempt.min(30);
        let delay = self.config.initial_delay_ms.saturating_mul(exp);
        let delay = delay.min(self.config.max_delay_ms);
        Some(Duration::from_millis(delay))
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }
}

impl RetryStrategy for LinearBackoff {
    fn name(&self) -> &str {
        "linear"
    }

    fn next_delay(&self, attempt: u32, _error: &str) -> Option<Duration> {
        if attempt >= self.config.max_attempts {
            return None;
        }
        let multiplier = attempt.saturating_add(1) as u64;
        let delay = self.config.initial_delay_ms.saturating_mul(multiplier);
        let delay = delay.min(self.config.max_delay_ms);
        Some(Duration::from_millis(delay))
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }
}
