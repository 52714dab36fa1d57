// Box office configuration
//
// BoxOfficeConfig is a plain struct that can be:
// - Created directly with defaults (unbounded claim retry, no cache expiry)
// - Tuned with the builder-style setters below (tests bound the retry loop)

use std::time::Duration;

/// Retry policy for the seat claim loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of claim attempts; `None` retries until the store answers
    pub max_attempts: Option<usize>,

    /// Delay before the second attempt
    pub base_backoff: Duration,

    /// Upper bound for the doubling backoff
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Retry forever without sleeping between attempts
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Give up after `max_attempts` attempts
    pub fn bounded(max_attempts: usize) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            ..Self::unbounded()
        }
    }

    /// Set the backoff range
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.base_backoff = base;
        self.max_backoff = max.max(base);
        self
    }

    /// Whether another attempt is allowed after `attempts` failed ones
    pub fn allows_retry(&self, attempts: usize) -> bool {
        match self.max_attempts {
            Some(max) => attempts < max,
            None => true,
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn backoff(&self, attempt: usize) -> Duration {
        if self.base_backoff.is_zero() {
            return Duration::ZERO;
        }
        let shift = attempt.saturating_sub(1).min(16) as u32;
        self.base_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Configuration for the per-process view caches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Entries older than this are treated as misses.
    /// Bounds staleness when a peer notification is lost.
    pub max_age: Option<Duration>,
}

impl CacheConfig {
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }
}

/// Configuration for a box office node
#[derive(Debug, Clone, Default)]
pub struct BoxOfficeConfig {
    pub retry: RetryPolicy,
    pub cache: CacheConfig,
}

impl BoxOfficeConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the claim retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the cache configuration
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_always_retries() {
        let policy = RetryPolicy::unbounded();
        assert!(policy.allows_retry(1));
        assert!(policy.allows_retry(10_000));
        assert_eq!(policy.backoff(5), Duration::ZERO);
    }

    #[test]
    fn test_bounded_stops() {
        let policy = RetryPolicy::bounded(3);
        assert!(policy.allows_retry(1));
        assert!(policy.allows_retry(2));
        assert!(!policy.allows_retry(3));
    }

    #[test]
    fn test_bounded_zero_still_attempts_once() {
        let policy = RetryPolicy::bounded(0);
        assert_eq!(policy.max_attempts, Some(1));
        assert!(!policy.allows_retry(1));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::unbounded()
            .with_backoff(Duration::from_millis(10), Duration::from_millis(50));
        assert_eq!(policy.backoff(1), Duration::from_millis(10));
        assert_eq!(policy.backoff(2), Duration::from_millis(20));
        assert_eq!(policy.backoff(3), Duration::from_millis(40));
        assert_eq!(policy.backoff(4), Duration::from_millis(50));
        assert_eq!(policy.backoff(100), Duration::from_millis(50));
    }
}
