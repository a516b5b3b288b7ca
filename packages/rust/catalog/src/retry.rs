//! Bounded retry policy for empty catalog searches.

use std::future::Future;
use std::time::Duration;

use reelminer_shared::{BackoffKind, CatalogConfig};

/// Upper bound on any single exponential delay.
const MAX_EXPONENTIAL_DELAY: Duration = Duration::from_secs(30);

/// How the wait grows between retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed(Duration),
    /// `base * 2^(retry - 1)`, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay before the `retry`-th retry (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential { base, max } => {
                let exponent = retry.saturating_sub(1).min(16);
                base.checked_mul(1u32 << exponent).unwrap_or(max).min(max)
            }
        }
    }
}

/// Extra searches allowed after an empty page, and the wait before each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Backoff::Fixed(Duration::ZERO),
        }
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff.delay_for(retry)
    }

    /// Total searches this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl From<&CatalogConfig> for RetryPolicy {
    fn from(config: &CatalogConfig) -> Self {
        let backoff = match config.retry_backoff {
            BackoffKind::Fixed => Backoff::Fixed(config.retry_delay()),
            BackoffKind::Exponential => Backoff::Exponential {
                base: config.retry_delay(),
                max: MAX_EXPONENTIAL_DELAY,
            },
        };
        Self {
            max_retries: config.max_retries,
            backoff,
        }
    }
}

// ---------------------------------------------------------------------------
// Sleeper
// ---------------------------------------------------------------------------

/// Something that can wait. Tests swap in a recorder.
pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

impl<T: Sleeper + ?Sized> Sleeper for &T {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        (**self).sleep(duration)
    }
}

/// Real wall-clock waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_backoff_is_constant() {
        let policy = RetryPolicy {
            max_retries: 3,
            backoff: Backoff::Fixed(Duration::from_secs(2)),
        };
        for retry in 1..=3 {
            assert_eq!(policy.delay_for(retry), Duration::from_secs(2));
        }
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn exponential_backoff_doubles_and_caps() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(500),
            max: Duration::from_secs(3),
        };
        assert_eq!(backoff.delay_for(1), Duration::from_millis(500));
        assert_eq!(backoff.delay_for(2), Duration::from_secs(1));
        assert_eq!(backoff.delay_for(3), Duration::from_secs(2));
        assert_eq!(backoff.delay_for(4), Duration::from_secs(3));
        assert_eq!(backoff.delay_for(u32::MAX), Duration::from_secs(3));
    }

    #[test]
    fn policy_from_default_config() {
        let policy = RetryPolicy::from(&CatalogConfig::default());
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.backoff, Backoff::Fixed(Duration::from_secs(2)));
    }

    #[test]
    fn policy_from_exponential_config() {
        let config = CatalogConfig {
            retry_backoff: BackoffKind::Exponential,
            retry_delay_ms: 100,
            ..CatalogConfig::default()
        };
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn tokio_sleeper_skips_zero() {
        let started = std::time::Instant::now();
        TokioSleeper.sleep(Duration::ZERO).await;
        assert!(started.elapsed() < Duration::from_millis(50));
    }
}
